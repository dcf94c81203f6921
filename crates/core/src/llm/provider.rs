// crates/core/src/llm/provider.rs
//! LlmClient trait defining the interface every provider adapter satisfies.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::types::{LlmResponse, PromptRequest};
use crate::error::LlmError;
use crate::telemetry::TelemetryContext;

/// Per-call handles passed explicitly into [`LlmClient::submit_query`].
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub telemetry: TelemetryContext,
    /// Cancelling aborts the in-flight provider call.
    pub cancel: CancellationToken,
}

impl CallContext {
    pub fn new(telemetry: TelemetryContext, cancel: CancellationToken) -> Self {
        Self { telemetry, cancel }
    }
}

/// Uniform contract for LLM providers.
///
/// Implementations include:
/// - `CopilotCliClient`: runs the GitHub Copilot CLI inside a sandbox
/// - Future: direct API clients for Anthropic, OpenAI, etc.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the conversation and return the normalized answer.
    async fn submit_query(&self, request: &PromptRequest, ctx: &CallContext) -> Result<LlmResponse, LlmError>;

    /// Whether the caller may retry after `err`.
    fn is_retryable(&self, err: &LlmError) -> bool;

    /// Check if the provider is usable (tool installed, credential accepted, etc.)
    async fn health_check(&self, ctx: &CallContext) -> Result<(), LlmError>;

    /// Provider name for logging/display (e.g. "github-copilot-cli").
    fn name(&self) -> &str;

    /// Model identifier sent upstream.
    fn model(&self) -> &str;
}
