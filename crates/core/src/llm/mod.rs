// crates/core/src/llm/mod.rs
//! LLM client adapters.
//!
//! Provides the `LlmClient` trait and the GitHub Copilot CLI adapter, plus the
//! prompt selection, model-name and usage helpers it is built from.

pub mod config;
pub mod copilot;
pub mod factory;
pub mod model_name;
pub mod prompt;
pub mod provider;
pub mod types;
pub mod usage;

pub use config::LlmConfig;
pub use copilot::CopilotCliClient;
pub use factory::create_client;
pub use model_name::{strip_github_model_prefix, strip_model_prefix, GITHUB_MODEL_PREFIXES};
pub use prompt::select_prompt;
pub use provider::{CallContext, LlmClient};
pub use types::{
    ConversationMessage, Endpoint, LlmResponse, PromptRequest, Provider, Role, TokenUsage, ToolCall,
    ToolDefinition,
};
pub use usage::{extract_usage, parse_token_value, parse_usage_metadata};
