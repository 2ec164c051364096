//! Claude CLI backend: `claude -p --output-format json`, prompt on stdin.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
use exemplar_config::Config;
use exemplar_runner::{CommandSpec, RunnerError, run_command};
use exemplar_utils::error::LlmError;

const STDERR_TAIL_BYTES: usize = 2048;

#[derive(Debug, Clone)]
pub(crate) struct ClaudeCliBackend {
    binary: String,
    default_model: Option<String>,
}

impl ClaudeCliBackend {
    /// The binary is resolved at invocation time, so constructing the
    /// backend never fails on a machine without the CLI installed.
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        if config.llm.claude.binary.trim().is_empty() {
            return Err(LlmError::Misconfiguration(
                "[llm.claude] binary must not be empty".to_string(),
            ));
        }
        Ok(Self {
            binary: config.llm.claude.binary.clone(),
            default_model: config.model().map(ToString::to_string),
        })
    }

    fn messages_to_prompt(messages: &[Message]) -> String {
        let mut prompt = String::new();
        for msg in messages {
            let label = match msg.role {
                Role::System => "System: ",
                Role::User => "User: ",
                Role::Assistant => "Assistant: ",
            };
            prompt.push_str(label);
            prompt.push_str(&msg.content);
            prompt.push_str("\n\n");
        }
        prompt
    }

    fn build_cli_args(&self, model: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            "json".to_string(),
        ];
        if let Some(model) = model {
            args.push("--model".to_string());
            args.push(model.to_string());
        }
        args
    }

    /// Pull the answer out of the CLI's JSON envelope.
    ///
    /// Output that is not an envelope is taken as the answer itself.
    fn parse_output(stdout: &str) -> Result<(String, Option<Usage>), LlmError> {
        match serde_json::from_str::<CliEnvelope>(stdout.trim()) {
            Ok(envelope) if envelope.is_error => Err(LlmError::Transport(format!(
                "Claude CLI reported an error: {}",
                envelope.result.unwrap_or_default()
            ))),
            Ok(envelope) => {
                let result = envelope.result.unwrap_or_default();
                if result.trim().is_empty() {
                    return Err(LlmError::InvalidResponse(
                        "Claude CLI returned an empty result".to_string(),
                    ));
                }
                Ok((result, envelope.usage))
            }
            Err(_) if stdout.trim().is_empty() => Err(LlmError::InvalidResponse(
                "Claude CLI produced no output".to_string(),
            )),
            Err(_) => Ok((stdout.to_string(), None)),
        }
    }

    fn stderr_tail(stderr: &str) -> &str {
        if stderr.len() <= STDERR_TAIL_BYTES {
            return stderr;
        }
        let mut start = stderr.len() - STDERR_TAIL_BYTES;
        while !stderr.is_char_boundary(start) {
            start += 1;
        }
        &stderr[start..]
    }
}

#[async_trait]
impl LlmBackend for ClaudeCliBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            Some(inv.model.clone())
        };

        let binary = which::which(&self.binary).map_err(|e| {
            LlmError::Transport(format!(
                "Claude CLI binary '{}' not found in PATH ({e}). Install it or set [llm.claude] binary.",
                self.binary
            ))
        })?;

        let prompt = Self::messages_to_prompt(&inv.messages);
        let spec = CommandSpec::new(binary)
            .args(self.build_cli_args(model.as_deref()))
            .stdin(prompt);

        debug!(
            provider = "claude-cli",
            phase = %inv.phase_id,
            model = model.as_deref().unwrap_or("default"),
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Claude CLI"
        );

        let output = run_command(&spec, inv.timeout).await.map_err(|e| match e {
            RunnerError::Timeout { .. } => LlmError::Timeout {
                duration: inv.timeout,
            },
            other => LlmError::Transport(format!("Failed to execute Claude CLI: {other}")),
        })?;

        if output.timed_out {
            return Err(LlmError::Timeout {
                duration: inv.timeout,
            });
        }
        if !output.success() {
            let stderr = output.stderr_string();
            return Err(LlmError::Transport(format!(
                "Claude CLI exited with {:?}: {}",
                output.exit_code,
                Self::stderr_tail(stderr.trim())
            )));
        }

        let (content, usage) = Self::parse_output(&output.stdout_string())?;
        let mut result = LlmResult::new(
            content,
            "claude-cli",
            model.unwrap_or_else(|| "default".to_string()),
        );
        if let Some(usage) = usage {
            result = result.with_tokens(usage.input_tokens, usage.output_tokens);
        }
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct CliEnvelope {
    #[serde(default)]
    is_error: bool,
    result: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}
