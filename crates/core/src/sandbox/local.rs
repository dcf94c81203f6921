// crates/core/src/sandbox/local.rs
//! Host-process runner: no isolation, same contract.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;
use tokio_util::sync::CancellationToken;

use super::{run_process, SandboxCommand, SandboxOutput, SandboxRunner};
use crate::error::ExecutionError;

/// Runs commands directly on the host.
///
/// Only the variables named in the command (plus `PATH`/`HOME`, unless
/// `inherit_env` is set) reach the child.
#[derive(Debug, Clone, Default)]
pub struct LocalSandbox {
    default_workdir: Option<PathBuf>,
    inherit_env: bool,
}

impl LocalSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Working directory used when a command doesn't set one.
    pub fn with_workdir(mut self, dir: impl AsRef<Path>) -> Self {
        self.default_workdir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Pass the full host environment through to the child.
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    fn build(&self, command: &SandboxCommand) -> TokioCommand {
        let mut cmd = TokioCommand::new(&command.program);
        cmd.args(&command.args);
        if !self.inherit_env {
            cmd.env_clear();
            for var in ["PATH", "HOME"] {
                if let Ok(value) = std::env::var(var) {
                    cmd.env(var, value);
                }
            }
        }
        cmd.envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        match (&command.workdir, &self.default_workdir) {
            (Some(dir), _) => {
                cmd.current_dir(dir);
            }
            (None, Some(dir)) => {
                cmd.current_dir(dir);
            }
            (None, None) => {}
        }
        cmd
    }
}

#[async_trait]
impl SandboxRunner for LocalSandbox {
    async fn run(
        &self,
        command: &SandboxCommand,
        cancel: &CancellationToken,
    ) -> Result<SandboxOutput, ExecutionError> {
        tracing::debug!(program = %command.program, workdir = ?command.workdir, "local sandbox: running");
        run_process(self.build(command), &command.program, cancel).await
    }
}
