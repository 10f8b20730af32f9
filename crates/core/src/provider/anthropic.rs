use crate::completion::{
    ChatMessage, ChatModel, Completion, CompletionMetrics, CompletionResponse,
    CompletionSettings, SenderType,
};
use crate::model::Provider;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use url::Url;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<ApiMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct StartedMessage {
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct StopDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Server-sent events of the Anthropic Messages API stream.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    MessageStart { message: StartedMessage },
    ContentBlockDelta { delta: ContentDelta },
    MessageDelta { delta: StopDelta, usage: Option<Usage> },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Ignored,
}

/// Adapter for the Anthropic Messages API, streaming over SSE.
#[derive(Debug)]
pub struct AnthropicModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    messages_url: Url,
}

impl AnthropicModel {
    pub fn new(api_key: &str, model: &str, base_url_override: Option<&str>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(anyhow!(
                "No API key configured for {}. Set {}.",
                Provider::Anthropic.display_name(),
                Provider::Anthropic.env_var()
            ));
        }

        let base_url = base_url_override
            .or(Provider::Anthropic.base_url())
            .unwrap_or_default();
        let messages_url = Url::parse(base_url)
            .and_then(|u| u.join("/v1/messages"))
            .with_context(|| format!("Invalid Anthropic base URL: {base_url}"))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            messages_url,
        })
    }

    /// The Messages API takes the system prompt as a top-level field, with
    /// only user/assistant entries in `messages`.
    fn build_request(
        &self,
        messages: &[ChatMessage],
        settings: &CompletionSettings,
    ) -> MessagesRequest<'_> {
        let system = messages
            .iter()
            .filter(|m| m.sender == SenderType::System)
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let api_messages = messages
            .iter()
            .filter_map(|m| match m.sender {
                SenderType::User => Some(ApiMessage {
                    role: "user",
                    content: m.text.clone(),
                }),
                SenderType::Assistant => Some(ApiMessage {
                    role: "assistant",
                    content: m.text.clone(),
                }),
                SenderType::System => None,
            })
            .collect();

        MessagesRequest {
            model: &self.model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            system,
            messages: api_messages,
            stream: true,
        }
    }
}

#[async_trait]
impl ChatModel for AnthropicModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        settings: &CompletionSettings,
    ) -> BoxStream<'_, Result<Completion>> {
        let request = self.build_request(messages, settings);
        let request = self
            .client
            .post(self.messages_url.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request);

        let start_time = Instant::now();

        let outer_stream = async_stream::stream! {
            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    yield Err(anyhow!("Anthropic request failed: {err}"));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                yield Err(anyhow!("Anthropic request failed with status {status}: {body}"));
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut metrics = CompletionMetrics::default();
            let mut prev_time = start_time;
            let mut first_chunk = true;

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        yield Err(anyhow!("Anthropic stream error: {err}"));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim_end_matches('\r').to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };

                    let event: StreamEvent = match serde_json::from_str(data) {
                        Ok(event) => event,
                        Err(err) => {
                            yield Err(anyhow!("Malformed Anthropic event: {err}"));
                            return;
                        }
                    };

                    let now = Instant::now();
                    let elapsed = now.duration_since(prev_time).as_millis() as f32;
                    prev_time = now;

                    match event {
                        StreamEvent::MessageStart { message } => {
                            metrics.prompt_tokens = message.usage.input_tokens;
                        }
                        StreamEvent::ContentBlockDelta { delta } => {
                            if first_chunk {
                                metrics.prompt_eval_latency_ms = elapsed;
                                first_chunk = false;
                            }
                            metrics.completion_latency_ms += elapsed;
                            yield Ok(Completion::Response(CompletionResponse {
                                text: delta.text.unwrap_or_default(),
                                finish_reason: None,
                            }));
                        }
                        StreamEvent::MessageDelta { delta, usage } => {
                            if let Some(usage) = usage {
                                metrics.completion_tokens = usage.output_tokens;
                            }
                            if let Some(reason) = delta.stop_reason {
                                yield Ok(Completion::Response(CompletionResponse {
                                    text: String::new(),
                                    finish_reason: Some(reason),
                                }));
                            }
                        }
                        StreamEvent::MessageStop => {
                            yield Ok(Completion::Metrics(metrics.clone()));
                            return;
                        }
                        StreamEvent::Error { error } => {
                            yield Err(anyhow!("Anthropic stream error: {}", error.message));
                            return;
                        }
                        StreamEvent::Ignored => {}
                    }
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
        matchers::{header, method, path},
    };

    fn mock_event_stream_body() -> String {
        let events = vec![
            (
                "message_start",
                json!({
                    "type": "message_start",
                    "message": {
                        "id": "msg_1",
                        "role": "assistant",
                        "usage": {"input_tokens": 12, "output_tokens": 0}
                    }
                }),
            ),
            (
                "content_block_start",
                json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
            ),
            (
                "content_block_delta",
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hello"}}),
            ),
            (
                "content_block_delta",
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": " world"}}),
            ),
            (
                "content_block_stop",
                json!({"type": "content_block_stop", "index": 0}),
            ),
            (
                "message_delta",
                json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 7}}),
            ),
            ("message_stop", json!({"type": "message_stop"})),
        ];

        events
            .into_iter()
            .map(|(name, data)| format!("event: {name}\ndata: {data}\n\n"))
            .collect()
    }

    #[test]
    fn test_new_rejects_missing_api_key() {
        let err = AnthropicModel::new("", "claude-3-7-sonnet-20250219", None).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_build_request_splits_system_prompt() {
        let model = AnthropicModel::new("sk-ant", "claude-3-7-sonnet-20250219", None).unwrap();
        let messages = vec![
            ChatMessage::new(SenderType::System, "be brief"),
            ChatMessage::new(SenderType::User, "hi"),
            ChatMessage::new(SenderType::Assistant, "hello"),
        ];
        let request = model.build_request(&messages, &CompletionSettings::default());

        assert_eq!(request.system, "be brief");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.messages[1].role, "assistant");
        assert!(request.stream);
    }

    #[tokio::test]
    async fn test_complete_streams_chunks_and_metrics() {
        let server = MockServer::start().await;

        let mock_response = ResponseTemplate::new(200)
            .set_body_raw(mock_event_stream_body(), "text/event-stream");

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(header("x-api-key", "sk-ant-test"))
            .respond_with(mock_response)
            .mount(&server)
            .await;

        let model =
            AnthropicModel::new("sk-ant-test", "claude-3-7-sonnet-20250219", Some(&server.uri()))
                .unwrap();

        let messages = vec![ChatMessage::new(SenderType::User, "Hello")];
        let mut stream = model
            .complete(&messages, &CompletionSettings::default())
            .await;

        let mut text = String::new();
        let mut finish_reason = None;
        let mut metrics = CompletionMetrics::default();
        while let Some(item) = stream.next().await {
            match item.unwrap() {
                Completion::Response(response) => {
                    text.push_str(&response.text);
                    if response.finish_reason.is_some() {
                        finish_reason = response.finish_reason;
                    }
                }
                Completion::Metrics(m) => metrics = m,
            }
        }

        assert_eq!(text, "Hello world");
        assert_eq!(finish_reason, Some("end_turn".to_string()));
        assert_eq!(metrics.prompt_tokens, 12);
        assert_eq!(metrics.completion_tokens, 7);
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .mount(&server)
            .await;

        let model =
            AnthropicModel::new("sk-bad", "claude-3-7-sonnet-20250219", Some(&server.uri()))
                .unwrap();

        let messages = vec![ChatMessage::new(SenderType::User, "Hello")];
        let mut stream = model
            .complete(&messages, &CompletionSettings::default())
            .await;

        let first = stream.next().await.unwrap();
        let err = first.unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
