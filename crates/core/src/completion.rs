use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderType {
    System,
    User,
    Assistant,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::System => "system",
            SenderType::User => "user",
            SenderType::Assistant => "assistant",
        }
    }
}

impl From<SenderType> for String {
    fn from(val: SenderType) -> Self {
        val.as_str().into()
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub text: String,
    pub sender: SenderType,
}

impl ChatMessage {
    pub fn new(sender: SenderType, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender,
        }
    }
}

/// Sampling parameters forwarded with every completion request.
#[derive(Debug, Clone, Copy)]
pub struct CompletionSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 4096,
        }
    }
}

#[derive(Debug)]
pub enum Completion {
    Response(CompletionResponse),
    Metrics(CompletionMetrics),
}

#[derive(Debug)]
pub struct CompletionResponse {
    pub text: String,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionMetrics {
    pub prompt_tokens: u32,
    pub prompt_eval_latency_ms: f32,
    pub completion_tokens: u32,
    pub completion_latency_ms: f32,
}

/// Uniform adapter contract for a hosted chat model: send the ordered
/// message history plus sampling parameters, receive a stream of text
/// chunks followed by a metrics record.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        settings: &CompletionSettings,
    ) -> BoxStream<'_, Result<Completion>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_type_as_str() {
        assert_eq!(SenderType::System.as_str(), "system");
        assert_eq!(SenderType::User.as_str(), "user");
        assert_eq!(SenderType::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_default_settings() {
        let settings = CompletionSettings::default();
        assert_eq!(settings.max_tokens, 4096);
        assert!((settings.temperature - 0.3).abs() < f32::EPSILON);
    }
}
