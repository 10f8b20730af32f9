use crate::completion::{
    ChatMessage, ChatModel, Completion, CompletionMetrics, CompletionResponse,
    CompletionSettings, SenderType,
};
use crate::model::Provider;
use anyhow::{Result, anyhow};
use async_openai::config::OpenAIConfig;
use async_openai::{
    Client as OpenAIClient,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionStreamOptions, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::time::Instant;

/// Adapter for every OpenAI-compatible chat completion endpoint: OpenAI
/// itself plus OpenRouter, Gemini, Mistral and Groq via their compatible
/// base URLs.
#[derive(Debug)]
pub struct OpenAiCompatModel {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
}

impl OpenAiCompatModel {
    pub fn new(
        provider: Provider,
        api_key: &str,
        model: &str,
        base_url_override: Option<&str>,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!(
                "No API key configured for {}. Set {}.",
                provider.display_name(),
                provider.env_var()
            ));
        }

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = base_url_override.or(provider.base_url()) {
            config = config.with_api_base(base_url);
        }

        Ok(Self {
            client: OpenAIClient::with_config(config),
            model: model.to_string(),
        })
    }

    fn to_openai_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.sender {
            SenderType::System => ChatCompletionRequestMessage::System(
                async_openai::types::chat::ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.text.as_str())
                    .build()
                    .unwrap(),
            ),
            SenderType::Assistant => ChatCompletionRequestMessage::Assistant(
                async_openai::types::chat::ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.text.as_str())
                    .build()
                    .unwrap(),
            ),
            SenderType::User => ChatCompletionRequestMessage::User(
                async_openai::types::chat::ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.text.as_str())
                    .build()
                    .unwrap(),
            ),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        settings: &CompletionSettings,
    ) -> BoxStream<'_, Result<Completion>> {
        let openai_messages: Vec<ChatCompletionRequestMessage> = messages
            .iter()
            .map(OpenAiCompatModel::to_openai_message)
            .collect();

        let stream_options = ChatCompletionStreamOptions {
            include_usage: Some(true),
            include_obfuscation: None,
        };
        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(openai_messages)
            .max_tokens(settings.max_tokens)
            .temperature(settings.temperature)
            .stream(true)
            .stream_options(stream_options)
            .build();

        let request = match request {
            Ok(req) => req,
            Err(err) => {
                return Box::pin(futures::stream::once(async move {
                    Err(anyhow!("Invalid request: {:?}", err))
                }));
            }
        };

        let start_time = Instant::now();
        let mut first_chunk = true;

        let outer_stream = async_stream::stream! {
            let mut prev_time = start_time;
            let mut prompt_eval_latency = 0.0;
            let mut completion_latency = 0.0;

            match self.client.chat().create_stream(request).await {
                Ok(mut stream) => {
                    while let Some(next) = stream.next().await {
                        let now = Instant::now();
                        let elapsed = now.duration_since(prev_time).as_millis() as f32;
                        prev_time = now;

                        match next {
                            Ok(chunk) => {
                                if let Some(choice) = chunk.choices.first() {
                                    let text = choice.delta.content.clone().unwrap_or_default();
                                    if first_chunk {
                                        prompt_eval_latency = elapsed;
                                        first_chunk = false;
                                    }
                                    completion_latency += elapsed;

                                    yield Ok(Completion::Response(CompletionResponse {
                                        text,
                                        finish_reason: choice
                                            .finish_reason
                                            .as_ref()
                                            .map(|x| format!("{x:?}")),
                                    }));
                                }

                                // Some compatible servers (Gemini) club usage with
                                // the final response, others send a separate chunk.
                                if let Some(usage) = chunk.usage {
                                    yield Ok(Completion::Metrics(CompletionMetrics {
                                        prompt_tokens: usage.prompt_tokens,
                                        prompt_eval_latency_ms: prompt_eval_latency,
                                        completion_tokens: usage.completion_tokens,
                                        completion_latency_ms: completion_latency,
                                    }));
                                }
                            }
                            Err(err) => {
                                yield Err(anyhow!("Provider stream error: {}", err));
                            }
                        }
                    }
                }
                Err(err) => {
                    yield Err(anyhow!("Provider request failed: {:?}", err));
                }
            }
        };

        Box::pin(outer_stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn mock_event_stream_body() -> String {
        let events = vec![
            json!({
                "id": "chatcmpl-1",
                "object": "chat.completion.chunk",
                "created": 1684,
                "model": "llama-3.3-70b-versatile",
                "choices": [{
                    "delta": {"content": "Hello"},
                    "index": 0,
                    "finish_reason": serde_json::Value::Null
                }]
            }),
            json!({
                "id": "chatcmpl-1",
                "object": "chat.completion.chunk",
                "created": 1684,
                "model": "llama-3.3-70b-versatile",
                "choices": [{
                    "delta": {"content": " world"},
                    "index": 0,
                    "finish_reason": serde_json::Value::Null
                }]
            }),
            json!({
                "id": "chatcmpl-1",
                "object": "chat.completion.chunk",
                "created": 1684,
                "model": "llama-3.3-70b-versatile",
                "choices": [{
                    "delta": {},
                    "index": 0,
                    "finish_reason": "stop"
                }],
            }),
            json!({
                "id": "chatcmpl-1",
                "object": "chat.completion.chunk",
                "created": 1684,
                "model": "llama-3.3-70b-versatile",
                "choices": [],
                "usage": {
                    "prompt_tokens": 20,
                    "completion_tokens": 30,
                    "total_tokens": 50,
                    "prompt_tokens_details": {},
                    "completion_tokens_details": {"reasoning_tokens": 5}
                }
            }),
        ];

        let mut mock_body = events
            .into_iter()
            .map(|event| format!("data: {}\n\n", serde_json::to_string(&event).unwrap()))
            .collect::<String>();
        mock_body.push_str("data: [DONE]\n\n");
        mock_body
    }

    #[test]
    fn test_new_rejects_missing_api_key() {
        let err = OpenAiCompatModel::new(Provider::Groq, "", "llama-3.3-70b-versatile", None)
            .unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[tokio::test]
    async fn test_complete_streams_chunks_and_metrics() {
        let server = MockServer::start().await;

        let mock_response = ResponseTemplate::new(200)
            .set_body_raw(mock_event_stream_body(), "text/event-stream")
            .insert_header("Connection", "close");

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(mock_response)
            .mount(&server)
            .await;

        let model = OpenAiCompatModel::new(
            Provider::Groq,
            "gsk-test",
            "llama-3.3-70b-versatile",
            Some(&server.uri()),
        )
        .unwrap();

        let messages = vec![ChatMessage::new(SenderType::User, "Hello")];
        let mut stream = model
            .complete(&messages, &CompletionSettings::default())
            .await;

        let mut responses = Vec::new();
        let mut metrics = CompletionMetrics::default();
        while let Some(chunk_result) = stream.next().await {
            match chunk_result.unwrap() {
                Completion::Response(response) => responses.push(response),
                Completion::Metrics(m) => metrics = m,
            }
        }

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].text, "Hello");
        assert_eq!(responses[1].text, " world");
        assert_eq!(responses[2].finish_reason, Some("Stop".to_string()));

        assert_eq!(metrics.prompt_tokens, 20);
        assert_eq!(metrics.completion_tokens, 30);
        assert!(metrics.completion_latency_ms != 0.0);
    }

    #[tokio::test]
    async fn test_complete_surfaces_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let model = OpenAiCompatModel::new(
            Provider::Openai,
            "sk-bad",
            "gpt-4o",
            Some(&server.uri()),
        )
        .unwrap();

        let messages = vec![ChatMessage::new(SenderType::User, "Hello")];
        let mut stream = model
            .complete(&messages, &CompletionSettings::default())
            .await;

        let first = stream.next().await.unwrap();
        assert!(first.is_err());
    }
}
