//! Scripted backend for tests that must not reach a provider.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::types::{LlmBackend, LlmInvocation, LlmResult};
use exemplar_utils::error::LlmError;

/// Replays queued answers in order and records every invocation.
///
/// When the queue is empty the call fails with `InvalidResponse`.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, String>>>,
    invocations: Mutex<Vec<LlmInvocation>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reply(self, raw: impl Into<String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Ok(raw.into()));
        }
        self
    }

    /// Queue a transport failure.
    #[must_use]
    pub fn fail(self, reason: impl Into<String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(reason.into()));
        }
        self
    }

    pub fn invocations(&self) -> Vec<LlmInvocation> {
        self.invocations.lock().map(|i| i.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.invocations.lock().map(|i| i.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = inv.model.clone();
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(inv);
        }
        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(Ok(raw)) => Ok(LlmResult::new(raw, "scripted", model)),
            Some(Err(reason)) => Err(LlmError::Transport(reason)),
            None => Err(LlmError::InvalidResponse(
                "scripted backend has no reply queued".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structured::invoke_structured;
    use crate::types::Message;
    use std::time::Duration;

    #[derive(Debug, serde::Deserialize)]
    struct Pong {
        pong: bool,
    }
    impl crate::StructuredOutput for Pong {}

    fn inv() -> LlmInvocation {
        LlmInvocation::new("test", "", Duration::from_secs(1), vec![Message::user("ping")])
    }

    #[tokio::test]
    async fn replays_in_order_and_records() {
        let backend = ScriptedBackend::new().reply("{\"pong\": true}").fail("down");

        let first: Pong = invoke_structured(&backend, inv()).await.unwrap();
        assert!(first.pong);

        let second = invoke_structured::<Pong>(&backend, inv()).await.unwrap_err();
        assert!(matches!(second, LlmError::Transport(_)));

        let third = invoke_structured::<Pong>(&backend, inv()).await.unwrap_err();
        assert!(matches!(third, LlmError::InvalidResponse(_)));

        assert_eq!(backend.call_count(), 3);
        assert_eq!(backend.invocations()[0].messages[0].content, "ping");
    }
}
