use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use crate::config::LlmConfig;
use crate::errors::{PhoneClawError, PhoneClawResult};
use crate::llm::provider::ModelClient;
use crate::llm::response::split_response;
use crate::llm::sse_parser;
use crate::llm::types::{ChatMessage, ModelResponse, StreamChunkKind};

pub struct OpenAiCompatibleProvider {
    endpoint: String,
    api_key: String,
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: LlmConfig, api_key: String) -> PhoneClawResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            endpoint: chat_completions_url(&config.api_base),
            api_key,
            config,
            client,
        })
    }

    fn request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "frequency_penalty": self.config.frequency_penalty,
            "stream": self.config.stream,
        });
        if self.config.thinking {
            body["thinking"] = serde_json::json!({ "type": "enabled" });
        }
        body
    }
}

/// `https://host/api/v4/` → `https://host/api/v4/chat/completions`.
/// Endpoints already pointing at `/chat/completions` are kept as-is.
pub fn chat_completions_url(api_base: &str) -> String {
    let base = api_base.trim().trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{base}/chat/completions")
    }
}

/// Clone of the request body with base64 image payloads replaced, for logging.
fn sanitized_for_log(body: &serde_json::Value) -> String {
    let mut log_body = body.clone();
    if let Some(msgs) = log_body.get_mut("messages").and_then(|m| m.as_array_mut()) {
        for msg in msgs {
            let Some(parts) = msg.get_mut("content").and_then(|c| c.as_array_mut()) else {
                continue;
            };
            for part in parts {
                if part.get("type").and_then(|t| t.as_str()) == Some("image_url") {
                    if let Some(url) = part.pointer_mut("/image_url/url") {
                        *url = serde_json::Value::String("<omitted_base64_image>".to_string());
                    }
                }
            }
        }
    }
    serde_json::to_string(&log_body).unwrap_or_default()
}

#[async_trait]
impl ModelClient for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn infer(&self, messages: &[ChatMessage]) -> PhoneClawResult<ModelResponse> {
        let body = self.request_body(messages);

        tracing::info!(
            model = %self.config.model,
            messages = messages.len(),
            stream = self.config.stream,
            "sending model request"
        );
        tracing::debug!(body = %sanitized_for_log(&body), "request body (sanitized, base64 omitted)");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(PhoneClawError::Model(format!("{status}: {err_body}")));
        }

        let (content, reasoning) = if self.config.stream {
            self.handle_stream(response).await?
        } else {
            self.handle_json(response).await?
        };

        if !reasoning.is_empty() {
            let preview: String = reasoning.chars().take(100).collect();
            tracing::debug!(reasoning = %preview, "model reasoning");
        }

        Ok(split_response(&content, &reasoning))
    }
}

impl OpenAiCompatibleProvider {
    async fn handle_stream(&self, response: reqwest::Response) -> PhoneClawResult<(String, String)> {
        let (content, reasoning) = collect_sse(response.bytes_stream()).await?;
        tracing::info!(
            content_len = content.len(),
            reasoning_len = reasoning.len(),
            "model stream complete"
        );
        Ok((content, reasoning))
    }

    async fn handle_json(&self, response: reqwest::Response) -> PhoneClawResult<(String, String)> {
        let json: serde_json::Value = response.json().await?;
        let message = &json["choices"][0]["message"];

        let content = message["content"].as_str().unwrap_or("").to_string();
        let reasoning = message["reasoning_content"].as_str().unwrap_or("").to_string();

        tracing::info!(
            content_len = content.len(),
            reasoning_len = reasoning.len(),
            "model JSON response received"
        );
        Ok((content, reasoning))
    }
}

/// Accumulates SSE deltas into (content, reasoning).
///
/// Bytes are buffered until a full line arrives, so multi-byte characters
/// split across network chunks decode intact.
async fn collect_sse<S, B, E>(stream: S) -> PhoneClawResult<(String, String)>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    PhoneClawError: From<E>,
{
    let mut stream = std::pin::pin!(stream);
    let mut pending: Vec<u8> = Vec::new();
    let mut acc = SseAccumulator::default();

    while let Some(chunk) = stream.next().await {
        pending.extend_from_slice(chunk?.as_ref());
        while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = pending.drain(..=newline).collect();
            if acc.feed(&String::from_utf8_lossy(&line))? {
                return Ok(acc.finish());
            }
        }
    }
    // Final line without a trailing newline.
    if !pending.is_empty() {
        acc.feed(&String::from_utf8_lossy(&pending))?;
    }
    Ok(acc.finish())
}

#[derive(Default)]
struct SseAccumulator {
    content: String,
    reasoning: String,
}

impl SseAccumulator {
    /// Applies one line; returns true once the stream reports completion.
    fn feed(&mut self, line: &str) -> PhoneClawResult<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(false);
        }
        match sse_parser::parse_sse_line(line) {
            Ok(Some(chunk)) => match chunk.kind {
                StreamChunkKind::Reasoning => self.reasoning.push_str(&chunk.content),
                StreamChunkKind::Content => self.content.push_str(&chunk.content),
                StreamChunkKind::Done => return Ok(true),
            },
            Ok(None) => {}
            Err(PhoneClawError::SseParsing(e)) => {
                tracing::debug!("SSE parse skipped: {e}");
            }
            Err(e) => return Err(e),
        }
        Ok(false)
    }

    fn finish(self) -> (String, String) {
        (self.content, self.reasoning)
    }
}
