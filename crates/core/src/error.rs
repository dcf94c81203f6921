// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::llm::types::Role;

/// Errors raised while checking a conversation before anything is dispatched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("prompt/chat history cannot be empty - add a user message before querying")]
    EmptyHistory,

    #[error("the last message in history must be from the user, found {role}")]
    LastMessageNotUser { role: Role },
}

/// Errors that can occur while provisioning a sandbox or running the tool inside it.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Failed to provision sandbox: {0}")]
    Provision(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with status {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to read {stream}: {source}")]
    ReadStream {
        stream: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Execution cancelled")]
    Cancelled,
}

/// Errors that can occur when loading adapter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No credential configured (set api_key or {env_var})")]
    MissingCredential { env_var: String },
}

/// Top-level error returned by every [`crate::llm::LlmClient`] operation.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Provider not available: {0}")]
    NotAvailable(String),
}

impl ExecutionError {
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn wait(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Wait {
            program: program.into(),
            source,
        }
    }
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
