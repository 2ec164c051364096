//! Shared reqwest client with bounded retry.
//!
//! 5xx responses and connection failures are retried with linear backoff.
//! 4xx responses and timeouts are returned immediately.

use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

use exemplar_utils::error::LlmError;

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(max_retries: u32) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("exemplar/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            max_retries,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn execute_with_retry(
        &self,
        request: RequestBuilder,
        timeout: Duration,
        provider: &str,
    ) -> Result<Response, LlmError> {
        let mut attempt: u32 = 0;

        loop {
            let req = request.try_clone().ok_or_else(|| {
                LlmError::Transport("request body cannot be cloned for retry".to_string())
            })?;

            let err = match tokio::time::timeout(timeout, req.send()).await {
                Err(_) => return Err(LlmError::Timeout { duration: timeout }),
                Ok(Err(e)) if e.is_timeout() => return Err(LlmError::Timeout { duration: timeout }),
                Ok(Err(e)) => LlmError::Transport(format!("{provider} request failed: {e}")),
                Ok(Ok(response)) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let body = response.text().await.unwrap_or_default();
                    let err = classify_status(status, provider, truncate(&body));
                    if !status.is_server_error() {
                        return Err(err);
                    }
                    err
                }
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            attempt += 1;
            let backoff = INITIAL_BACKOFF * attempt;
            warn!(
                provider = %provider,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "Retrying LLM request"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

fn classify_status(status: StatusCode, provider: &str, body: &str) -> LlmError {
    let message = format!("{provider} returned HTTP {}: {body}", status.as_u16());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(message),
        StatusCode::TOO_MANY_REQUESTS => LlmError::ProviderQuota(message),
        s if s.is_server_error() => LlmError::ProviderOutage(message),
        _ => LlmError::Transport(message),
    }
}

fn truncate(body: &str) -> &str {
    if body.len() <= ERROR_BODY_LIMIT {
        return body;
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "anthropic", ""),
            LlmError::ProviderAuth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "anthropic", ""),
            LlmError::ProviderQuota(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, "anthropic", ""),
            LlmError::ProviderOutage(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "anthropic", "bad"),
            LlmError::Transport(_)
        ));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(ERROR_BODY_LIMIT);
        let cut = truncate(&body);
        assert!(cut.len() <= ERROR_BODY_LIMIT);
        assert!(body.starts_with(cut));
    }
}
