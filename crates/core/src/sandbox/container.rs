// crates/core/src/sandbox/container.rs
//! Container-backed sandbox driven through the `docker` (or `podman`) CLI.
//!
//! `provision` starts one long-lived container from the base image and runs
//! the setup commands in it once. Every `run` is an `exec` into that
//! container with the command's env and workdir applied, so credentials are
//! injected per call and never baked into the image.

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;
use tokio_util::sync::CancellationToken;

use super::{run_process, SandboxCommand, SandboxOutput, SandboxRunner, SandboxSpec};
use crate::error::ExecutionError;

/// A provisioned container the tool runs in.
#[derive(Debug)]
pub struct ContainerSandbox {
    docker_bin: String,
    container_id: String,
    workdir: String,
}

impl ContainerSandbox {
    /// Start a container for `spec` and run its setup commands.
    ///
    /// If the container id can't be read or setup fails, the container is
    /// removed before the error is returned.
    pub async fn provision(
        docker_bin: impl Into<String>,
        spec: &SandboxSpec,
        cancel: &CancellationToken,
    ) -> Result<Self, ExecutionError> {
        let docker_bin = docker_bin.into();
        tracing::info!(image = %spec.base_image, docker = %docker_bin, "container sandbox: provisioning");

        let mut cmd = TokioCommand::new(&docker_bin);
        cmd.args(run_args(spec));
        let out = run_process(cmd, &docker_bin, cancel)
            .await
            .map_err(|e| ExecutionError::Provision(format!("starting {}: {e}", spec.base_image)))?;
        // `docker run` succeeded, so a container exists even if its id isn't
        // valid UTF-8. Decode lossily first so it can still be removed.
        let container_id = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if container_id.is_empty() {
            return Err(ExecutionError::Provision(format!(
                "{docker_bin} run returned no container id"
            )));
        }

        let sandbox = Self {
            docker_bin,
            container_id,
            workdir: spec.workdir.clone(),
        };
        if let Err(e) = out.stdout_text() {
            tracing::error!(container = %sandbox.container_id, error = %e, "container sandbox: unreadable container id");
            sandbox.teardown().await;
            return Err(e);
        }

        for step in &spec.setup {
            let Some((program, args)) = step.split_first() else {
                continue;
            };
            let command = SandboxCommand::new(program.as_str()).args(args.iter().cloned());
            if let Err(e) = sandbox.run(&command, cancel).await {
                tracing::error!(step = ?step, error = %e, "container sandbox: setup failed");
                sandbox.teardown().await;
                return Err(ExecutionError::Provision(format!("setup `{}`: {e}", step.join(" "))));
            }
        }

        tracing::info!(container = %sandbox.container_id, "container sandbox: ready");
        Ok(sandbox)
    }

    /// Reuse an already running container.
    pub fn attach(
        docker_bin: impl Into<String>,
        container_id: impl Into<String>,
        workdir: impl Into<String>,
    ) -> Self {
        Self {
            docker_bin: docker_bin.into(),
            container_id: container_id.into(),
            workdir: workdir.into(),
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Remove the container. Failures are logged, not returned.
    pub async fn teardown(&self) {
        let result = TokioCommand::new(&self.docker_bin)
            .args(["rm", "-f", self.container_id.as_str()])
            .stdin(std::process::Stdio::null())
            .output()
            .await;
        match result {
            Ok(out) if out.status.success() => {
                tracing::debug!(container = %self.container_id, "container sandbox: removed");
            }
            Ok(out) => tracing::warn!(
                container = %self.container_id,
                exit_code = ?out.status.code(),
                "container sandbox: rm failed"
            ),
            Err(e) => tracing::warn!(container = %self.container_id, error = %e, "container sandbox: rm failed"),
        }
    }
}

#[async_trait]
impl SandboxRunner for ContainerSandbox {
    async fn run(
        &self,
        command: &SandboxCommand,
        cancel: &CancellationToken,
    ) -> Result<SandboxOutput, ExecutionError> {
        let mut cmd = TokioCommand::new(&self.docker_bin);
        cmd.args(exec_args(&self.container_id, &self.workdir, command));
        // Values are passed by name (`-e KEY`) so they never show up in argv.
        cmd.envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        tracing::debug!(
            container = %self.container_id,
            program = %command.program,
            "container sandbox: exec"
        );
        run_process(cmd, &command.program, cancel).await
    }
}

/// `docker run` arguments for a detached, idle container.
fn run_args(spec: &SandboxSpec) -> Vec<String> {
    vec![
        "run".to_string(),
        "-d".to_string(),
        "--rm".to_string(),
        "-w".to_string(),
        spec.workdir.clone(),
        spec.base_image.clone(),
        "sleep".to_string(),
        "infinity".to_string(),
    ]
}

/// `docker exec` arguments for one command.
fn exec_args(container_id: &str, default_workdir: &str, command: &SandboxCommand) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    for (key, _) in &command.env {
        args.push("-e".to_string());
        args.push(key.clone());
    }
    args.push("-w".to_string());
    args.push(command.workdir.as_deref().unwrap_or(default_workdir).to_string());
    args.push(container_id.to_string());
    args.push(command.program.clone());
    args.extend(command.args.iter().cloned());
    args
}
