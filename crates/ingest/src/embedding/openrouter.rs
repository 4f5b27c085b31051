use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::{Embedder, EmbeddingError};

/// Maximum input length in characters, not tokens. The provider counts
/// tokens, so this is an approximation: it can cut mid-word and can still
/// exceed the true token limit for non-ASCII text. Kept as-is because the
/// stored embeddings were produced with this exact cutoff.
pub const MAX_EMBED_CHARS: usize = 8000;

/// Head-truncate `text` to [`MAX_EMBED_CHARS`] characters.
pub fn truncate_for_embedding(text: &str) -> &str {
    match text.char_indices().nth(MAX_EMBED_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// OpenRouter embedding backend (OpenAI-compatible `/v1/embeddings`).
pub struct OpenRouterEmbedder {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

impl OpenRouterEmbedder {
    pub fn new(api_key: String, model: String, base_url: String, dimensions: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            model,
            base_url,
            dimensions,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenRouterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbedRequest {
            model: &self.model,
            input: truncate_for_embedding(text),
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(format!("{status}: {body}")));
        }

        let resp: EmbedResponse = response.json().await?;
        let embedding = resp
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| EmbeddingError::Api("response contained no embedding".to_string()))?;

        if embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_for_embedding("hello"), "hello");
    }

    #[test]
    fn long_text_is_cut_at_the_character_budget() {
        let text = "a".repeat(MAX_EMBED_CHARS + 500);
        let truncated = truncate_for_embedding(&text);
        assert_eq!(truncated.chars().count(), MAX_EMBED_CHARS);
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let text = "ü".repeat(MAX_EMBED_CHARS + 10);
        let truncated = truncate_for_embedding(&text);
        assert_eq!(truncated.chars().count(), MAX_EMBED_CHARS);
        // Slicing mid-codepoint would have panicked above; double-check the
        // result is valid by re-scanning it.
        assert!(truncated.chars().all(|c| c == 'ü'));
    }

    #[test]
    fn exact_budget_is_kept_whole() {
        let text = "b".repeat(MAX_EMBED_CHARS);
        assert_eq!(truncate_for_embedding(&text).len(), MAX_EMBED_CHARS);
    }
}
