//! LLM backend abstraction.
//!
//! Every provider implements [`LlmBackend`], so phases never know which
//! model or transport answers them. Responses cross into typed code only
//! through [`invoke_structured`].

mod anthropic_backend;
mod claude_cli;
pub(crate) mod http_client;
mod structured;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use structured::{StructuredOutput, extract_json, invoke_structured, parse_structured};
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
pub use exemplar_utils::error::LlmError;

pub(crate) use anthropic_backend::AnthropicBackend;
pub(crate) use claude_cli::ClaudeCliBackend;

use exemplar_config::Config;
use tracing::info;

/// Provider names accepted in `[llm] provider` and `--provider`.
pub const SUPPORTED_PROVIDERS: &[&str] = &["claude-cli", "anthropic"];

/// Construct the backend selected by `config.llm.provider`.
///
/// # Errors
///
/// `LlmError::Unsupported` for an unknown provider, and
/// `LlmError::Misconfiguration` when the provider's settings are unusable
/// (for example a missing API key).
pub fn from_config(config: &Config) -> Result<Box<dyn LlmBackend>, LlmError> {
    let provider = config.llm.provider.as_str();
    let backend: Box<dyn LlmBackend> = match provider {
        "claude-cli" => Box::new(ClaudeCliBackend::new_from_config(config)?),
        "anthropic" => Box::new(AnthropicBackend::new_from_config(config)?),
        other => return Err(LlmError::Unsupported(other.to_string())),
    };
    info!(provider, model = config.model().unwrap_or("default"), "LLM backend ready");
    Ok(backend)
}
