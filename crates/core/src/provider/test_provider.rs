use crate::completion::{
    ChatMessage, ChatModel, Completion, CompletionMetrics, CompletionResponse, CompletionSettings,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Deterministic in-process model for tests and offline development. The
/// default mode streams a fixed two-chunk reply; an "error" model id makes
/// every completion fail.
pub struct TestProviderModel {
    response_mode: String,
}

impl TestProviderModel {
    pub fn new(model: &str) -> Self {
        let response_mode = if model.contains("error") {
            "error".to_string()
        } else {
            "default".to_string()
        };
        Self { response_mode }
    }
}

#[async_trait]
impl ChatModel for TestProviderModel {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _settings: &CompletionSettings,
    ) -> BoxStream<'_, Result<Completion>> {
        let response_mode = self.response_mode.clone();

        let stream = async_stream::stream! {
            if response_mode == "error" {
                yield Err(anyhow!("Test provider error"));
                return;
            }

            yield Ok(Completion::Response(CompletionResponse {
                text: "Hello".to_string(),
                finish_reason: None,
            }));
            yield Ok(Completion::Response(CompletionResponse {
                text: " world".to_string(),
                finish_reason: Some("Stop".to_string()),
            }));
            yield Ok(Completion::Metrics(CompletionMetrics {
                prompt_tokens: 2,
                prompt_eval_latency_ms: 1.0,
                completion_tokens: 2,
                completion_latency_ms: 1.0,
            }));
        };

        Box::pin(stream)
    }
}
