// crates/core/src/telemetry.rs
//! Per-call trace and usage telemetry.
//!
//! Handles are passed explicitly through [`TelemetryContext`] instead of being
//! looked up from ambient state. When the context carries a recorder, gauges go
//! to it; otherwise they go to whatever global `metrics` recorder is installed
//! (a no-op if none is).

use std::fmt;
use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, gauge, Recorder};

use crate::llm::types::TokenUsage;

/// Media type of the answer text produced by the Copilot CLI.
pub const CONTENT_TYPE_MARKDOWN: &str = "text/markdown";

pub const LLM_INPUT_TOKENS: &str = "llm_input_tokens";
pub const LLM_OUTPUT_TOKENS: &str = "llm_output_tokens";
pub const LLM_INPUT_TOKENS_CACHE_READS: &str = "llm_input_tokens_cache_reads";
pub const LLM_USAGE_UNPARSED: &str = "llm_usage_unparsed_total";

/// Trace identity and metric sink for one call.
#[derive(Clone)]
pub struct TelemetryContext {
    pub trace_id: String,
    pub span_id: String,
    recorder: Option<Arc<dyn Recorder + Send + Sync>>,
}

impl TelemetryContext {
    /// Fresh random trace/span ids, global recorder.
    pub fn new() -> Self {
        let trace_id = uuid::Uuid::new_v4().simple().to_string();
        let mut span_id = uuid::Uuid::new_v4().simple().to_string();
        span_id.truncate(16);
        Self::with_ids(trace_id, span_id)
    }

    /// Use ids from an enclosing trace (e.g. propagated by the caller).
    pub fn with_ids(trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            recorder: None,
        }
    }

    /// Send gauges to `recorder` instead of the global one.
    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder + Send + Sync>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    fn scoped<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.recorder {
            Some(recorder) => metrics::with_local_recorder(recorder.as_ref(), f),
            None => f(),
        }
    }
}

impl Default for TelemetryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TelemetryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryContext")
            .field("trace_id", &self.trace_id)
            .field("span_id", &self.span_id)
            .field("local_recorder", &self.recorder.is_some())
            .finish()
    }
}

/// Register descriptions for the usage metrics with the active recorder.
pub fn describe_metrics() {
    describe_gauge!(LLM_INPUT_TOKENS, "Input tokens consumed by the last LLM call");
    describe_gauge!(LLM_OUTPUT_TOKENS, "Output tokens produced by the last LLM call");
    describe_gauge!(
        LLM_INPUT_TOKENS_CACHE_READS,
        "Input tokens served from the provider prompt cache in the last LLM call"
    );
    describe_counter!(
        LLM_USAGE_UNPARSED,
        "LLM calls whose diagnostics carried no recognizable usage line"
    );
}

/// Record the three usage gauges, labelled with model and provider.
pub fn record_usage(ctx: &TelemetryContext, model: &str, provider: &str, usage: &TokenUsage) {
    ctx.scoped(|| {
        let labels = [
            ("model", model.to_string()),
            ("provider", provider.to_string()),
        ];
        gauge!(LLM_INPUT_TOKENS, &labels).set(usage.input_tokens as f64);
        gauge!(LLM_OUTPUT_TOKENS, &labels).set(usage.output_tokens as f64);
        gauge!(LLM_INPUT_TOKENS_CACHE_READS, &labels).set(usage.cached_token_reads as f64);
    });
}

/// Count a call whose usage could not be extracted.
pub fn record_usage_unparsed(ctx: &TelemetryContext, model: &str, provider: &str) {
    ctx.scoped(|| {
        counter!(LLM_USAGE_UNPARSED, "model" => model.to_string(), "provider" => provider.to_string())
            .increment(1);
    });
}
