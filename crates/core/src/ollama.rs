use crate::error::ModelError;
use crate::models::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_EMBED_MODEL: &str = "mxbai-embed-large";

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Turns text into fixed-dimension vectors. The default `embed_batch` awaits
/// each item sequentially so output order always matches input order and the
/// backing service is never hit concurrently.
#[async_trait]
pub trait Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

pub struct OllamaClient {
    endpoint: String,
    embed_model: String,
    client: Client,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, embed_model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            embed_model: embed_model.into(),
            client: Client::new(),
        }
    }

    pub async fn is_available(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.endpoint))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Sends a chat request and reassembles the streamed NDJSON response by
    /// concatenating `message.content` fragments until a `done` frame.
    pub async fn chat(&self, messages: &[ChatMessage], model: &str) -> Result<String, ModelError> {
        let wire_messages: Vec<Value> = messages
            .iter()
            .map(|message| {
                json!({
                    "role": message.role.as_str(),
                    "content": message.content,
                })
            })
            .collect();

        let mut response = self
            .post_with_retry(
                &format!("{}/api/chat", self.endpoint),
                &json!({
                    "model": model,
                    "messages": wire_messages,
                    "stream": true,
                }),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::Backend {
                status: status.as_u16(),
                details: response.text().await.unwrap_or_default(),
            });
        }

        let mut pending: Vec<u8> = Vec::new();
        let mut reply = String::new();

        while let Some(bytes) = response.chunk().await? {
            pending.extend_from_slice(&bytes);

            while let Some(newline) = pending.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = pending.drain(..=newline).collect();
                let line = std::str::from_utf8(&line[..line.len() - 1])
                    .map_err(|error| ModelError::MalformedStream(error.to_string()))?;

                if append_stream_frame(line, &mut reply)? {
                    return Ok(reply);
                }
            }
        }

        // Stream closed without a done frame; a trailing unterminated line
        // still counts.
        if !pending.is_empty() {
            let line = std::str::from_utf8(&pending)
                .map_err(|error| ModelError::MalformedStream(error.to_string()))?;
            append_stream_frame(line, &mut reply)?;
        }

        Ok(reply)
    }

    async fn post_with_retry(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<reqwest::Response, ModelError> {
        let mut last_failure = String::new();

        for attempt in 1..=RETRY_ATTEMPTS {
            match self.client.post(url).json(body).send().await {
                Ok(response) => return Ok(response),
                Err(error) if error.is_connect() || error.is_timeout() => {
                    last_failure = error.to_string();
                    if attempt < RETRY_ATTEMPTS {
                        sleep(RETRY_DELAY).await;
                    }
                }
                Err(error) => return Err(ModelError::Http(error)),
            }
        }

        Err(ModelError::Unavailable {
            attempts: RETRY_ATTEMPTS,
            details: last_failure,
        })
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let response = self
            .post_with_retry(
                &format!("{}/api/embeddings", self.endpoint),
                &json!({
                    "model": self.embed_model,
                    "prompt": text,
                }),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::Backend {
                status: status.as_u16(),
                details: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: Value = response.json().await?;
        let vector = parsed
            .pointer("/embedding")
            .and_then(Value::as_array)
            .ok_or(ModelError::MissingEmbedding)?;

        vector
            .iter()
            .map(|value| {
                value
                    .as_f64()
                    .map(|number| number as f32)
                    .ok_or(ModelError::MissingEmbedding)
            })
            .collect()
    }
}

/// Applies one NDJSON stream line to the accumulated reply. Returns `true`
/// when the frame carries the terminal `done` signal.
fn append_stream_frame(line: &str, reply: &mut String) -> Result<bool, ModelError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(false);
    }

    let frame: Value = serde_json::from_str(line)
        .map_err(|error| ModelError::MalformedStream(error.to_string()))?;

    if let Some(fragment) = frame.pointer("/message/content").and_then(Value::as_str) {
        reply.push_str(fragment);
    }

    Ok(frame
        .pointer("/done")
        .and_then(Value::as_bool)
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
            Ok(vec![text.len() as f32])
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
            if text == "bad" {
                Err(ModelError::MissingEmbedding)
            } else {
                Ok(vec![1.0])
            }
        }
    }

    #[tokio::test]
    async fn batch_embedding_preserves_input_order() {
        let embedder = FakeEmbedder;
        let texts = vec!["x".to_string(), "yy".to_string(), "zzz".to_string()];

        let embeddings = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(
            embeddings,
            vec![vec![1.0], vec![2.0], vec![3.0]]
        );
    }

    #[tokio::test]
    async fn batch_embedding_fails_as_a_whole() {
        let embedder = FailingEmbedder;
        let texts = vec!["ok".to_string(), "bad".to_string(), "ok".to_string()];

        let result = embedder.embed_batch(&texts).await;
        assert!(matches!(result, Err(ModelError::MissingEmbedding)));
    }

    #[test]
    fn stream_frames_accumulate_until_done() {
        let mut reply = String::new();

        assert!(!append_stream_frame(
            r#"{"message":{"content":"Hel"},"done":false}"#,
            &mut reply
        )
        .unwrap());
        assert!(!append_stream_frame(
            r#"{"message":{"content":"lo"},"done":false}"#,
            &mut reply
        )
        .unwrap());
        assert!(append_stream_frame(
            r#"{"message":{"content":"!"},"done":true}"#,
            &mut reply
        )
        .unwrap());

        assert_eq!(reply, "Hello!");
    }

    #[test]
    fn blank_stream_lines_are_skipped() {
        let mut reply = String::new();
        assert!(!append_stream_frame("   ", &mut reply).unwrap());
        assert!(reply.is_empty());
    }

    #[test]
    fn garbage_stream_lines_are_rejected() {
        let mut reply = String::new();
        let result = append_stream_frame("not json", &mut reply);
        assert!(matches!(result, Err(ModelError::MalformedStream(_))));
    }
}
