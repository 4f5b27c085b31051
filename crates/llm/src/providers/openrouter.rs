use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde_json::{json, Value};
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message, Role, TextStream};

pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouterProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        let api_messages: Vec<Value> = messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect();

        json!({
            "model": self.model,
            "messages": api_messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(model = %self.model, url = %url, "OpenRouter request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }

        Ok(response)
    }
}

/// Extract the text delta from one SSE `data:` payload.
///
/// Returns None for `[DONE]`, malformed JSON, and deltas without content —
/// all of which are skipped, matching the provider's keep-alive behavior.
pub(crate) fn parse_stream_data(data: &str) -> Option<String> {
    if data == "[DONE]" {
        return None;
    }
    let parsed: Value = serde_json::from_str(data).ok()?;
    parsed["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let body = self.request_body(&messages, temperature, max_tokens);
        let response = self.send(&body).await?;

        let resp: Value = response.json().await?;
        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))?
            .to_string();

        Ok(content)
    }

    async fn stream(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<TextStream, LlmError> {
        let mut body = self.request_body(&messages, temperature, max_tokens);
        body["stream"] = json!(true);

        let response = self.send(&body).await?;

        type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>;

        struct State {
            bytes: ByteStream,
            buffer: String,
            done: bool,
        }

        let state = State {
            bytes: Box::pin(response.bytes_stream()),
            buffer: String::new(),
            done: false,
        };

        let text_stream = stream::unfold(state, move |mut state| async move {
            use futures::StreamExt;
            loop {
                if state.done {
                    return None;
                }

                // Drain complete lines already buffered before reading more.
                while let Some(newline_pos) = state.buffer.find('\n') {
                    let line = state.buffer[..newline_pos].trim_end_matches('\r').to_string();
                    state.buffer = state.buffer[newline_pos + 1..].to_string();

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if data == "[DONE]" {
                        state.done = true;
                        return None;
                    }
                    if let Some(text) = parse_stream_data(data) {
                        return Some((Ok(text), state));
                    }
                }

                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        state.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((Err(LlmError::HttpError(e)), state));
                    }
                    None => return None,
                }
            }
        });

        Ok(Box::pin(text_stream))
    }
}
