//! Anthropic Messages API backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
use exemplar_config::Config;
use exemplar_utils::error::LlmError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub(crate) struct AnthropicBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    default_model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicBackend {
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let anthropic = &config.llm.anthropic;

        let api_key = std::env::var(&anthropic.api_key_env).map_err(|_| {
            LlmError::Misconfiguration(format!(
                "Anthropic API key not found in environment variable '{}'. \
                 Set it, or configure a different api_key_env in [llm.anthropic].",
                anthropic.api_key_env
            ))
        })?;

        Ok(Self {
            client: Arc::new(HttpClient::new(config.llm.max_retries)?),
            base_url: anthropic.base_url.clone(),
            api_key,
            default_model: config
                .model()
                .map_or_else(|| anthropic.model.clone(), ToString::to_string),
            max_tokens: anthropic.max_tokens,
            temperature: anthropic.temperature,
        })
    }

    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_prompt: Option<String> = None;
        let mut converted = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => match system_prompt.as_mut() {
                    Some(existing) => {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    }
                    None => system_prompt = Some(msg.content.clone()),
                },
                Role::User | Role::Assistant => converted.push(AnthropicMessage {
                    role: if msg.role == Role::User {
                        "user"
                    } else {
                        "assistant"
                    }
                    .to_string(),
                    content: msg.content.clone(),
                }),
            }
        }

        (system_prompt, converted)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        };
        let max_tokens = inv
            .metadata
            .get("max_tokens")
            .and_then(serde_json::Value::as_u64)
            .map_or(self.max_tokens, |v| v as u32);

        debug!(
            provider = "anthropic",
            phase = %inv.phase_id,
            model = %model,
            max_tokens,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Anthropic backend"
        );

        let (system, messages) = Self::convert_messages(&inv.messages);
        let body = AnthropicRequest {
            model: model.clone(),
            messages,
            max_tokens,
            temperature: self.temperature,
            system,
        };

        let request = self
            .client
            .client()
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "anthropic")
            .await?;

        let parsed: AnthropicResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse Anthropic response: {e}"))
        })?;

        let content: String = parsed
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if content.is_empty() {
            return Err(LlmError::InvalidResponse(
                "Anthropic response missing text content".to_string(),
            ));
        }

        let mut result = LlmResult::new(content, "anthropic", model);
        if let Some(usage) = parsed.usage {
            result = result.with_tokens(usage.input_tokens, usage.output_tokens);
        }
        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
