// crates/core/src/llm/usage.rs
//! Token usage extraction from Copilot CLI diagnostics.
//!
//! The CLI prints a usage block on stderr once the answer is complete, e.g.
//!
//! ```text
//! claude-sonnet-4.5    7.5k input, 52 output, 3.6k cache read, 3.7k cache write (Est. 1 Premium request)
//! ```
//!
//! Counts may carry a `k` suffix (thousands) and the cache-write clause is
//! optional. Anything we cannot find degrades to zero usage instead of an error.

use std::sync::OnceLock;

use regex_lite::Regex;

use super::types::TokenUsage;

const USAGE_PATTERN: &str = r"(\d+(?:\.\d+)?)([kK]?)\s+input,\s*(\d+(?:\.\d+)?)([kK]?)\s+output,\s*(\d+(?:\.\d+)?)([kK]?)\s+cache read(?:,\s*(\d+(?:\.\d+)?)([kK]?)\s+cache write)?";

static USAGE_REGEX: OnceLock<Regex> = OnceLock::new();

fn usage_regex() -> &'static Regex {
    USAGE_REGEX.get_or_init(|| Regex::new(USAGE_PATTERN).expect("usage pattern is a valid regex"))
}

/// Find the usage line in `metadata` and return the parsed counts.
///
/// Returns `None` when no usage line is present, so callers can tell
/// "no usage reported" apart from a genuine zero.
pub fn extract_usage(metadata: &str) -> Option<TokenUsage> {
    let caps = usage_regex().captures(metadata)?;
    let count = |value: usize, suffix: usize| -> u64 {
        match caps.get(value) {
            Some(m) => parse_token_value(m.as_str(), caps.get(suffix).map_or("", |s| s.as_str())),
            None => 0,
        }
    };

    let mut usage = TokenUsage {
        input_tokens: count(1, 2),
        output_tokens: count(3, 4),
        cached_token_reads: count(5, 6),
        cached_token_writes: count(7, 8),
        total_tokens: 0,
    };
    usage.total_tokens = usage.input_tokens.saturating_add(usage.output_tokens);
    Some(usage)
}

/// Like [`extract_usage`] but falls back to all-zero usage.
pub fn parse_usage_metadata(metadata: &str) -> TokenUsage {
    extract_usage(metadata).unwrap_or_default()
}

/// Convert `"3.5"` + `"k"` into `3500`. Fractions are truncated, and an
/// unparsable number counts as zero.
pub fn parse_token_value(value: &str, multiplier: &str) -> u64 {
    let Ok(mut parsed) = value.parse::<f64>() else {
        return 0;
    };
    if multiplier.eq_ignore_ascii_case("k") {
        parsed *= 1000.0;
    }
    // `as` saturates: NaN and negatives become 0.
    parsed as u64
}
