// crates/core/src/llm/config.rs
//! LLM adapter configuration.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use super::types::{Endpoint, Provider};
use crate::error::ConfigError;
use crate::sandbox::SandboxSpec;

/// Configuration for one LLM adapter instance.
///
/// Loaded from TOML, then optionally overridden from the environment:
///
/// ```toml
/// provider = "github"
/// model = "github-claude-sonnet-4.5"
/// cli_version = "0.0.339"
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: Option<String>,
    /// Copilot CLI npm version to install in the sandbox.
    pub cli_version: String,
    pub base_image: String,
    pub workdir: String,
    /// Variable the credential is exposed as inside the sandbox.
    pub token_env_var: String,
    /// Tool binary invoked inside the sandbox.
    pub command: String,
    /// Container CLI used by `ContainerSandbox`.
    pub docker_bin: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Github,
            model: "github-gpt-5".into(),
            api_key: None,
            cli_version: "latest".into(),
            base_image: "node:24-bookworm-slim".into(),
            workdir: "/workspace".into(),
            token_env_var: "GITHUB_TOKEN".into(),
            command: "copilot".into(),
            docker_bin: "docker".into(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("cli_version", &self.cli_version)
            .field("base_image", &self.base_image)
            .field("workdir", &self.workdir)
            .field("token_env_var", &self.token_env_var)
            .field("command", &self.command)
            .field("docker_bin", &self.docker_bin)
            .finish()
    }
}

impl LlmConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Apply `GITHUB_TOKEN`, `GHCP_MODEL`, `GHCP_CLI_VERSION` and
    /// `GHCP_BASE_IMAGE` overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty(&self.token_env_var) {
            self.api_key = Some(token);
        }
        if let Some(model) = non_empty("GHCP_MODEL") {
            self.model = model;
        }
        if let Some(version) = non_empty("GHCP_CLI_VERSION") {
            self.cli_version = version;
        }
        if let Some(image) = non_empty("GHCP_BASE_IMAGE") {
            self.base_image = image;
        }
        self
    }

    /// The endpoint an adapter is constructed with. Requires a credential.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        let key = self
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                env_var: self.token_env_var.clone(),
            })?;
        Ok(Endpoint::new(key, self.model.clone(), self.provider))
    }

    /// Provisioning recipe for the tool's sandbox.
    pub fn sandbox_spec(&self) -> SandboxSpec {
        SandboxSpec::copilot(self.base_image.clone(), &self.cli_version, self.workdir.clone())
    }
}
