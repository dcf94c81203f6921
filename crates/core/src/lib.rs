// crates/core/src/lib.rs
pub mod error;
pub mod llm;
pub mod sandbox;
pub mod telemetry;

pub use error::*;
pub use llm::{
    create_client, CallContext, ConversationMessage, CopilotCliClient, Endpoint, LlmClient, LlmConfig,
    LlmResponse, PromptRequest, Provider, Role, TokenUsage,
};
pub use sandbox::{ContainerSandbox, LocalSandbox, SandboxCommand, SandboxOutput, SandboxRunner, SandboxSpec};
pub use telemetry::TelemetryContext;
