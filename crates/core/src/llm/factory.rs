// crates/core/src/llm/factory.rs
//! Client factory: creates an LlmClient from configuration.

use std::sync::Arc;

use super::config::LlmConfig;
use super::copilot::CopilotCliClient;
use super::provider::LlmClient;
use super::types::{Endpoint, Provider};
use crate::error::LlmError;
use crate::sandbox::SandboxRunner;

/// Create an LLM client for `endpoint`, running its tool in `sandbox`.
///
/// Only the GitHub provider is implemented here; other providers return
/// [`LlmError::NotAvailable`] so callers can route them to their own adapters.
pub fn create_client(
    config: &LlmConfig,
    endpoint: Endpoint,
    sandbox: Arc<dyn SandboxRunner>,
) -> Result<Arc<dyn LlmClient>, LlmError> {
    match endpoint.provider {
        Provider::Github => Ok(Arc::new(
            CopilotCliClient::new(endpoint, sandbox)
                .with_command(config.command.as_str())
                .with_token_env_var(config.token_env_var.as_str())
                .with_workdir(config.workdir.as_str()),
        )),
        other => Err(LlmError::NotAvailable(format!(
            "Provider {other} has no CLI adapter in this crate"
        ))),
    }
}
