// crates/core/src/sandbox/mod.rs
//! Isolated execution of the wrapped CLI tool.
//!
//! Adapters only see [`SandboxRunner`]: run one command with an environment
//! and a working directory, get stdout/stderr back. How the environment is
//! provisioned is up to the runner.

pub mod container;
pub mod local;

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutionError;

pub use container::ContainerSandbox;
pub use local::LocalSandbox;

/// A command to execute inside a sandbox.
#[derive(Clone, PartialEq, Eq)]
pub struct SandboxCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub workdir: Option<String>,
}

impl SandboxCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            workdir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn workdir(mut self, dir: impl Into<String>) -> Self {
        self.workdir = Some(dir.into());
        self
    }
}

// Env values are credentials; only their names are printed.
impl std::fmt::Debug for SandboxCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("SandboxCommand")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env_keys)
            .field("workdir", &self.workdir)
            .finish()
    }
}

/// Raw output of a completed command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl SandboxOutput {
    pub fn new(stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn stdout_text(&self) -> Result<&str, ExecutionError> {
        std::str::from_utf8(&self.stdout).map_err(|source| ExecutionError::ReadStream {
            stream: "stdout",
            source,
        })
    }

    pub fn stderr_text(&self) -> Result<&str, ExecutionError> {
        std::str::from_utf8(&self.stderr).map_err(|source| ExecutionError::ReadStream {
            stream: "stderr",
            source,
        })
    }
}

/// Runs commands in an isolated environment.
#[async_trait]
pub trait SandboxRunner: Send + Sync {
    /// Execute `command` to completion and capture both output streams.
    ///
    /// Cancelling `cancel` aborts the in-flight process and yields
    /// [`ExecutionError::Cancelled`]. No timeout is applied here.
    async fn run(
        &self,
        command: &SandboxCommand,
        cancel: &CancellationToken,
    ) -> Result<SandboxOutput, ExecutionError>;
}

/// How to build the environment the tool runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSpec {
    pub base_image: String,
    /// Commands run once after the environment starts (tool installation).
    pub setup: Vec<Vec<String>>,
    pub workdir: String,
}

impl SandboxSpec {
    /// Node image with the Copilot CLI installed at a pinned version.
    pub fn copilot(base_image: impl Into<String>, cli_version: &str, workdir: impl Into<String>) -> Self {
        Self {
            base_image: base_image.into(),
            setup: vec![vec![
                "npm".to_string(),
                "install".to_string(),
                "-g".to_string(),
                format!("@github/copilot@{cli_version}"),
            ]],
            workdir: workdir.into(),
        }
    }
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a char.
pub(crate) fn preview(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Spawn `cmd`, wait for it, and return its output.
///
/// The child is killed if `cancel` fires first. A non-zero exit status is
/// reported as [`ExecutionError::NonZeroExit`] carrying stderr.
pub(crate) async fn run_process(
    mut cmd: TokioCommand,
    program: &str,
    cancel: &CancellationToken,
) -> Result<SandboxOutput, ExecutionError> {
    let t0 = Instant::now();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
        tracing::error!(program, error = %e, "sandbox: failed to spawn process");
        ExecutionError::spawn(program, e)
    })?;

    // Dropping the wait future drops the child, which kills it.
    let output = tokio::select! {
        res = child.wait_with_output() => res.map_err(|e| ExecutionError::wait(program, e))?,
        _ = cancel.cancelled() => {
            tracing::warn!(program, elapsed_ms = t0.elapsed().as_millis() as u64, "sandbox: cancelled");
            return Err(ExecutionError::Cancelled);
        }
    };

    let elapsed_ms = t0.elapsed().as_millis() as u64;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(
            program,
            elapsed_ms,
            exit_code = ?output.status.code(),
            stderr = %preview(&stderr, 500),
            "sandbox: non-zero exit"
        );
        return Err(ExecutionError::NonZeroExit {
            program: program.to_string(),
            code: output.status.code(),
            stderr: stderr.into_owned(),
        });
    }

    tracing::debug!(
        program,
        elapsed_ms,
        stdout_len = output.stdout.len(),
        stderr_len = output.stderr.len(),
        "sandbox: process finished"
    );
    Ok(SandboxOutput {
        stdout: output.stdout,
        stderr: output.stderr,
    })
}
