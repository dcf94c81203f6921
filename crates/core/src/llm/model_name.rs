// crates/core/src/llm/model_name.rs
//! Model id normalization for providers that share a naming namespace.

/// Prefixes callers may put in front of a GitHub-served model id so it does
/// not collide with the same model name on another provider. Checked in order.
pub const GITHUB_MODEL_PREFIXES: &[&str] = &["github-", "github/", "gh-", "gh/", "ghcp-", "ghcp/"];

/// Strip the first matching alias prefix from `model`.
///
/// Matching is case-sensitive and only one prefix is ever removed, so
/// `"gh-github-gpt-5"` becomes `"github-gpt-5"`.
pub fn strip_model_prefix<'a>(model: &'a str, prefixes: &[&str]) -> &'a str {
    prefixes
        .iter()
        .find_map(|prefix| model.strip_prefix(prefix))
        .unwrap_or(model)
}

/// [`strip_model_prefix`] with the GitHub alias list.
pub fn strip_github_model_prefix(model: &str) -> &str {
    strip_model_prefix(model, GITHUB_MODEL_PREFIXES)
}
