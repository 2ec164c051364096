//! Structured output at the capability boundary.
//!
//! Every capability response is parsed into a contract type and validated
//! on receipt. Anything that fails either step is an
//! [`LlmError::InvalidResponse`], the same taxonomy as a provider failure.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{LlmBackend, LlmInvocation};
use exemplar_utils::error::LlmError;

/// A response contract.
pub trait StructuredOutput: DeserializeOwned {
    /// Semantic checks serde cannot express.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Locate the JSON payload in a model answer.
///
/// Accepts a bare document, a fenced ```json block, or a document preceded
/// by prose. Returns `None` when nothing resembling JSON is present.
#[must_use]
pub fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }

    if let Some(fence) = trimmed.find("```") {
        let after = &trimmed[fence + 3..];
        let body_start = after.find('\n').map_or(0, |i| i + 1);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if !inner.is_empty() {
                return Some(inner);
            }
        }
    }

    let start = trimmed.find(['{', '['])?;
    let open = trimmed[start..].chars().next()?;
    let close = if open == '{' { '}' } else { ']' };
    let end = trimmed.rfind(close)?;
    (end > start).then(|| &trimmed[start..=end])
}

/// Parse and validate a raw answer as `T`.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T, LlmError> {
    let payload = extract_json(raw).ok_or_else(|| {
        LlmError::InvalidResponse("response did not contain a JSON document".to_string())
    })?;
    let value: T = serde_json::from_str(payload)
        .map_err(|e| LlmError::InvalidResponse(format!("response did not match schema: {e}")))?;
    value
        .validate()
        .map_err(|reason| LlmError::InvalidResponse(format!("response failed validation: {reason}")))?;
    Ok(value)
}

/// Invoke `backend` and parse the answer as `T`.
pub async fn invoke_structured<T: StructuredOutput>(
    backend: &dyn LlmBackend,
    inv: LlmInvocation,
) -> Result<T, LlmError> {
    let phase = inv.phase_id.clone();
    let result = backend.invoke(inv).await?;
    debug!(
        phase = %phase,
        provider = %result.provider,
        model = %result.model_used,
        tokens_in = ?result.tokens_input,
        tokens_out = ?result.tokens_output,
        "Received structured response"
    );
    parse_structured(&result.raw_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Answer {
        items: Vec<String>,
    }

    impl StructuredOutput for Answer {
        fn validate(&self) -> Result<(), String> {
            if self.items.iter().any(String::is_empty) {
                return Err("empty item".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn bare_document() {
        assert_eq!(extract_json("  {\"a\":1}  "), Some("{\"a\":1}"));
    }

    #[test]
    fn fenced_document() {
        let raw = "Here you go:\n```json\n{\"items\": [\"x\"]}\n```\nDone.";
        assert_eq!(extract_json(raw), Some("{\"items\": [\"x\"]}"));
    }

    #[test]
    fn document_after_prose() {
        let raw = "Sure! The answer is {\"items\": []} as requested.";
        assert_eq!(extract_json(raw), Some("{\"items\": []}"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn schema_mismatch_is_invalid_response() {
        let err = parse_structured::<Answer>("{\"things\": 1}").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn validation_failure_is_invalid_response() {
        let err = parse_structured::<Answer>("{\"items\": [\"\"]}").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(msg) if msg.contains("empty item")));
    }

    #[test]
    fn valid_answer_parses() {
        let answer = parse_structured::<Answer>("```\n{\"items\": [\"a\", \"b\"]}\n```").unwrap();
        assert_eq!(answer.items, vec!["a", "b"]);
    }
}
