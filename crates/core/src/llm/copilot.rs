// crates/core/src/llm/copilot.rs
//! GitHub Copilot CLI client: runs `copilot` in a sandbox and normalizes its output.
//!
//! There is no Rust SDK for Copilot, so the CLI is invoked once per call with a
//! single `--prompt`. Stdout is the markdown answer; stderr carries a usage
//! summary that is parsed into [`TokenUsage`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use super::model_name::strip_github_model_prefix;
use super::prompt::select_prompt;
use super::provider::{CallContext, LlmClient};
use super::types::{Endpoint, LlmResponse, PromptRequest};
use super::usage::extract_usage;
use crate::error::LlmError;
use crate::sandbox::{preview, SandboxCommand, SandboxRunner};
use crate::telemetry::{self, CONTENT_TYPE_MARKDOWN};

/// LLM client backed by the Copilot CLI.
pub struct CopilotCliClient {
    sandbox: Arc<dyn SandboxRunner>,
    endpoint: Endpoint,
    /// Model id with any alias prefix removed.
    model: String,
    command: String,
    token_env_var: String,
    workdir: Option<String>,
}

impl CopilotCliClient {
    pub fn new(endpoint: Endpoint, sandbox: Arc<dyn SandboxRunner>) -> Self {
        let model = strip_github_model_prefix(&endpoint.model).to_string();
        Self {
            sandbox,
            endpoint,
            model,
            command: "copilot".to_string(),
            token_env_var: "GITHUB_TOKEN".to_string(),
            workdir: None,
        }
    }

    /// Tool binary to invoke (default `copilot`).
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Variable the credential is injected as (default `GITHUB_TOKEN`).
    pub fn with_token_env_var(mut self, var: impl Into<String>) -> Self {
        self.token_env_var = var.into();
        self
    }

    /// Working directory inside the sandbox; the runner's default otherwise.
    pub fn with_workdir(mut self, dir: impl Into<String>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn base_command(&self) -> SandboxCommand {
        let cmd = SandboxCommand::new(self.command.as_str()).env(self.token_env_var.as_str(), self.endpoint.key.as_str());
        match &self.workdir {
            Some(dir) => cmd.workdir(dir.as_str()),
            None => cmd,
        }
    }

    /// `copilot --model <model> --prompt <prompt> --stream off`
    fn query_command(&self, prompt: &str) -> SandboxCommand {
        self.base_command()
            .args(["--model", self.model.as_str(), "--prompt", prompt, "--stream", "off"])
    }
}

#[async_trait]
impl LlmClient for CopilotCliClient {
    async fn submit_query(&self, request: &PromptRequest, ctx: &CallContext) -> Result<LlmResponse, LlmError> {
        let prompt = select_prompt(&request.history)?;

        let provider = self.endpoint.provider.as_str();
        let span = tracing::info_span!(
            "llm.query",
            content_type = CONTENT_TYPE_MARKDOWN,
            trace_id = %ctx.telemetry.trace_id,
            span_id = %ctx.telemetry.span_id,
            model = %self.model,
            provider,
        );

        async move {
            if !request.tools.is_empty() {
                tracing::debug!(tools = request.tools.len(), "copilot CLI: tool definitions are not forwarded");
            }
            if request.history.len() > 1 {
                tracing::debug!(
                    dropped_turns = request.history.len() - 1,
                    "copilot CLI: only the last user turn is sent"
                );
            }

            let start = Instant::now();
            tracing::info!(prompt_len = prompt.len(), "copilot CLI: dispatching");
            let output = self.sandbox.run(&self.query_command(prompt), &ctx.cancel).await?;

            let content = output.stdout_text()?.to_string();
            let metadata = output.stderr_text()?;

            let token_usage = match extract_usage(metadata) {
                Some(usage) => usage,
                None => {
                    tracing::warn!(
                        stderr = %preview(metadata, 500),
                        "copilot CLI: no usage line in diagnostics, reporting zero usage"
                    );
                    telemetry::record_usage_unparsed(&ctx.telemetry, &self.model, provider);
                    Default::default()
                }
            };
            telemetry::record_usage(&ctx.telemetry, &self.model, provider, &token_usage);

            let latency_ms = start.elapsed().as_millis() as u64;
            tracing::info!(
                latency_ms,
                content_len = content.len(),
                input_tokens = token_usage.input_tokens,
                output_tokens = token_usage.output_tokens,
                "copilot CLI: response received"
            );

            Ok::<_, LlmError>(LlmResponse {
                content,
                tool_calls: Vec::new(),
                token_usage,
                model: self.model.clone(),
                latency_ms,
            })
        }
        .instrument(span)
        .await
    }

    /// The CLI exposes no transient-failure signal, so nothing is retried.
    fn is_retryable(&self, _err: &LlmError) -> bool {
        false
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<(), LlmError> {
        let output = self
            .sandbox
            .run(&self.base_command().arg("--version"), &ctx.cancel)
            .await?;
        tracing::debug!(version = %output.stdout_text()?.trim(), "copilot CLI: available");
        Ok(())
    }

    fn name(&self) -> &str {
        "github-copilot-cli"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecutionError, ValidationError};
    use crate::llm::types::{ConversationMessage, Provider, TokenUsage, ToolDefinition};
    use crate::sandbox::SandboxOutput;
    use crate::telemetry::testing::CapturingRecorder;
    use crate::telemetry::TelemetryContext;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    const USAGE: &str =
        "claude-sonnet-4.5    7.5k input, 52 output, 3.6k cache read, 3.7k cache write (Est. 1 Premium request)";

    /// Records every command and replays a canned result.
    struct FakeSandbox {
        calls: Mutex<Vec<SandboxCommand>>,
        result: fn() -> Result<SandboxOutput, ExecutionError>,
    }

    impl FakeSandbox {
        fn new(result: fn() -> Result<SandboxOutput, ExecutionError>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                result,
            })
        }

        fn calls(&self) -> Vec<SandboxCommand> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SandboxRunner for FakeSandbox {
        async fn run(
            &self,
            command: &SandboxCommand,
            _cancel: &CancellationToken,
        ) -> Result<SandboxOutput, ExecutionError> {
            self.calls.lock().unwrap().push(command.clone());
            (self.result)()
        }
    }

    fn ok_output() -> Result<SandboxOutput, ExecutionError> {
        Ok(SandboxOutput::new("# Answer\n\nUse `Arc`.\n", format!("Usage by model:\n    {USAGE}\n")))
    }

    fn endpoint(model: &str) -> Endpoint {
        Endpoint::new("ghp_test", model, Provider::Github)
    }

    fn user_request(prompt: &str) -> PromptRequest {
        PromptRequest::new(vec![ConversationMessage::user(prompt)])
    }

    #[tokio::test]
    async fn test_submit_query_returns_stdout_and_usage() {
        let sandbox = FakeSandbox::new(ok_output);
        let client = CopilotCliClient::new(endpoint("github-claude-sonnet-4.5"), sandbox.clone());

        let resp = client
            .submit_query(&user_request("How do I share state?"), &CallContext::default())
            .await
            .unwrap();

        assert_eq!(resp.content, "# Answer\n\nUse `Arc`.\n");
        assert!(resp.tool_calls.is_empty());
        assert_eq!(resp.model, "claude-sonnet-4.5");
        assert_eq!(
            resp.token_usage,
            TokenUsage {
                input_tokens: 7500,
                output_tokens: 52,
                cached_token_reads: 3600,
                cached_token_writes: 3700,
                total_tokens: 7552,
            }
        );
    }

    #[tokio::test]
    async fn test_submit_query_dispatches_normalized_command() {
        let sandbox = FakeSandbox::new(ok_output);
        let client = CopilotCliClient::new(endpoint("gh-gpt-5"), sandbox.clone()).with_workdir("/workspace");

        client
            .submit_query(&user_request("hello"), &CallContext::default())
            .await
            .unwrap();

        let calls = sandbox.calls();
        assert_eq!(calls.len(), 1);
        let cmd = &calls[0];
        assert_eq!(cmd.program, "copilot");
        assert_eq!(cmd.args, vec!["--model", "gpt-5", "--prompt", "hello", "--stream", "off"]);
        assert_eq!(cmd.env, vec![("GITHUB_TOKEN".to_string(), "ghp_test".to_string())]);
        assert_eq!(cmd.workdir.as_deref(), Some("/workspace"));
    }

    #[tokio::test]
    async fn test_only_last_user_turn_is_sent() {
        let sandbox = FakeSandbox::new(ok_output);
        let client = CopilotCliClient::new(endpoint("gpt-5"), sandbox.clone());
        let request = PromptRequest::new(vec![
            ConversationMessage::system("be brief"),
            ConversationMessage::user("first question"),
            ConversationMessage::assistant("first answer"),
            ConversationMessage::user("follow-up"),
        ])
        .with_tools(vec![ToolDefinition {
            name: "read_file".to_string(),
            description: "Read a file".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }]);

        let resp = client.submit_query(&request, &CallContext::default()).await.unwrap();
        assert!(resp.tool_calls.is_empty());
        assert_eq!(sandbox.calls()[0].args[3], "follow-up");
    }

    #[tokio::test]
    async fn test_validation_failure_never_touches_sandbox() {
        let sandbox = FakeSandbox::new(ok_output);
        let client = CopilotCliClient::new(endpoint("gpt-5"), sandbox.clone());

        let err = client
            .submit_query(&PromptRequest::default(), &CallContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Validation(ValidationError::EmptyHistory)));

        let request = PromptRequest::new(vec![
            ConversationMessage::user("q"),
            ConversationMessage::assistant("a"),
        ]);
        let err = client.submit_query(&request, &CallContext::default()).await.unwrap_err();
        assert!(matches!(err, LlmError::Validation(ValidationError::LastMessageNotUser { .. })));

        assert!(sandbox.calls().is_empty());
    }

    #[tokio::test]
    async fn test_execution_error_propagates_unchanged() {
        let sandbox = FakeSandbox::new(|| {
            Err(ExecutionError::NonZeroExit {
                program: "copilot".to_string(),
                code: Some(1),
                stderr: "Error: not authenticated".to_string(),
            })
        });
        let client = CopilotCliClient::new(endpoint("gpt-5"), sandbox.clone());

        let err = client
            .submit_query(&user_request("q"), &CallContext::default())
            .await
            .unwrap_err();
        match err {
            LlmError::Execution(ExecutionError::NonZeroExit { stderr, .. }) => {
                assert_eq!(stderr, "Error: not authenticated");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
        assert_eq!(sandbox.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_stdout_is_execution_error() {
        let sandbox = FakeSandbox::new(|| Ok(SandboxOutput::new(vec![0xc3u8, 0x28], USAGE)));
        let client = CopilotCliClient::new(endpoint("gpt-5"), sandbox);

        let err = client
            .submit_query(&user_request("q"), &CallContext::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::Execution(ExecutionError::ReadStream { stream: "stdout", .. })
        ));
    }

    #[tokio::test]
    async fn test_unparsable_usage_degrades_to_zero() {
        let sandbox = FakeSandbox::new(|| Ok(SandboxOutput::new("answer", "Total duration (API): 3s\n")));
        let client = CopilotCliClient::new(endpoint("github-gpt-5"), sandbox);
        let recorder = Arc::new(CapturingRecorder::default());
        let ctx = CallContext::new(
            TelemetryContext::new().with_recorder(recorder.clone()),
            CancellationToken::new(),
        );

        let resp = client.submit_query(&user_request("q"), &ctx).await.unwrap();
        assert_eq!(resp.content, "answer");
        assert_eq!(resp.token_usage, TokenUsage::default());
        assert_eq!(
            recorder.counter("llm_usage_unparsed_total{model=gpt-5,provider=github}"),
            Some(1)
        );
        assert_eq!(recorder.gauge("llm_input_tokens{model=gpt-5,provider=github}"), Some(0.0));
    }

    #[tokio::test]
    async fn test_usage_gauges_recorded_with_model_and_provider() {
        let sandbox = FakeSandbox::new(ok_output);
        let client = CopilotCliClient::new(endpoint("ghcp/claude-sonnet-4.5"), sandbox);
        let recorder = Arc::new(CapturingRecorder::default());
        let ctx = CallContext::new(
            TelemetryContext::with_ids("0af7651916cd43dd8448eb211c80319c", "b7ad6b7169203331")
                .with_recorder(recorder.clone()),
            CancellationToken::new(),
        );

        client.submit_query(&user_request("q"), &ctx).await.unwrap();

        let key = |name: &str| format!("{name}{{model=claude-sonnet-4.5,provider=github}}");
        assert_eq!(recorder.gauge(&key("llm_input_tokens")), Some(7500.0));
        assert_eq!(recorder.gauge(&key("llm_output_tokens")), Some(52.0));
        assert_eq!(recorder.gauge(&key("llm_input_tokens_cache_reads")), Some(3600.0));
        assert_eq!(recorder.counter(&key("llm_usage_unparsed_total")), None);
    }

    /// Records the fields of every `llm.query` span as it is created.
    #[derive(Clone, Default)]
    struct QuerySpanFields(Arc<Mutex<BTreeMap<String, String>>>);

    impl tracing::field::Visit for QuerySpanFields {
        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.0.lock().unwrap().insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.0.lock().unwrap().insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for QuerySpanFields {
        fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, _id: &tracing::span::Id, _ctx: Context<'_, S>) {
            if attrs.metadata().name() == "llm.query" {
                attrs.record(&mut self.clone());
            }
        }
    }

    #[tokio::test]
    async fn test_query_span_carries_content_type_and_ids() {
        let fields = QuerySpanFields::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(fields.clone()));

        let client = CopilotCliClient::new(endpoint("github-gpt-5"), FakeSandbox::new(ok_output));
        let ctx = CallContext::new(
            TelemetryContext::with_ids("0af7651916cd43dd8448eb211c80319c", "b7ad6b7169203331"),
            CancellationToken::new(),
        );
        client.submit_query(&user_request("q"), &ctx).await.unwrap();

        let fields = fields.0.lock().unwrap().clone();
        assert_eq!(fields.get("content_type").map(String::as_str), Some("text/markdown"));
        assert_eq!(
            fields.get("trace_id").map(String::as_str),
            Some("0af7651916cd43dd8448eb211c80319c")
        );
        assert_eq!(fields.get("span_id").map(String::as_str), Some("b7ad6b7169203331"));
        assert_eq!(fields.get("model").map(String::as_str), Some("gpt-5"));
        assert_eq!(fields.get("provider").map(String::as_str), Some("github"));
    }

    #[test]
    fn test_is_retryable_always_false() {
        let client = CopilotCliClient::new(endpoint("gpt-5"), FakeSandbox::new(ok_output));
        let errors = [
            LlmError::Validation(ValidationError::EmptyHistory),
            LlmError::Execution(ExecutionError::Cancelled),
            LlmError::Execution(ExecutionError::Provision("image pull failed".to_string())),
            LlmError::Execution(ExecutionError::NonZeroExit {
                program: "copilot".to_string(),
                code: Some(429),
                stderr: "rate limited".to_string(),
            }),
            LlmError::NotAvailable("x".to_string()),
        ];
        for err in &errors {
            assert!(!client.is_retryable(err), "{err:?} should not be retryable");
        }
    }

    #[tokio::test]
    async fn test_health_check_runs_version() {
        let sandbox = FakeSandbox::new(|| Ok(SandboxOutput::new("0.0.339\n", "")));
        let client = CopilotCliClient::new(endpoint("gpt-5"), sandbox.clone()).with_command("/usr/local/bin/copilot");

        client.health_check(&CallContext::default()).await.unwrap();
        let calls = sandbox.calls();
        assert_eq!(calls[0].program, "/usr/local/bin/copilot");
        assert_eq!(calls[0].args, vec!["--version"]);
    }

    #[test]
    fn test_client_identity() {
        let client = CopilotCliClient::new(endpoint("github/gpt-5"), FakeSandbox::new(ok_output));
        assert_eq!(client.name(), "github-copilot-cli");
        assert_eq!(client.model(), "gpt-5");
        assert_eq!(client.endpoint().model, "github/gpt-5");
    }
}
