use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tracing::info;

use super::traits::{Embedder, EmbeddingError};
use crate::document::PageContent;

/// Pages per upstream request burst. The provider rate-limits aggressively,
/// so batches run one after another with a short pause in between.
pub const EMBED_BATCH_SIZE: usize = 5;

const BATCH_DELAY: Duration = Duration::from_millis(100);

/// One page with its embedding vector, ready for storage.
#[derive(Debug, Clone)]
pub struct PageEmbedding {
    pub page_number: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Embed every page of a document.
///
/// Pages are processed in fixed batches of [`EMBED_BATCH_SIZE`]: items within
/// a batch run concurrently, batches run sequentially with a short delay
/// between them. Output order equals input order. A failure on any page
/// fails the whole run — re-extraction is all-or-nothing, so partial
/// results are never returned.
pub async fn embed_pages(
    embedder: &Arc<dyn Embedder>,
    pages: &[PageContent],
) -> Result<Vec<PageEmbedding>, EmbeddingError> {
    let mut results = Vec::with_capacity(pages.len());
    let batch_count = pages.len().div_ceil(EMBED_BATCH_SIZE);

    for (batch_idx, batch) in pages.chunks(EMBED_BATCH_SIZE).enumerate() {
        info!(
            "Embedding batch {}/{} ({} pages)",
            batch_idx + 1,
            batch_count,
            batch.len()
        );

        let embeddings = try_join_all(batch.iter().map(|page| embedder.embed(&page.text))).await?;

        results.extend(batch.iter().zip(embeddings).map(|(page, embedding)| {
            PageEmbedding {
                page_number: page.page_number,
                content: page.text.clone(),
                embedding,
            }
        }));

        // Pause between batches to stay under the provider's rate limit.
        if (batch_idx + 1) * EMBED_BATCH_SIZE < pages.len() {
            tokio::time::sleep(BATCH_DELAY).await;
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds each text as a vector derived from its length, counting calls.
    struct FakeEmbedder {
        call_count: AtomicUsize,
        dims: usize,
    }

    impl FakeEmbedder {
        fn new(dims: usize) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                dims,
            }
        }
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32; self.dims])
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }

    /// Fails on a specific text, succeeds otherwise.
    struct FailingEmbedder {
        poison: String,
    }

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text == self.poison {
                Err(EmbeddingError::Api("429: rate limited".to_string()))
            } else {
                Ok(vec![0.0; 4])
            }
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    fn pages(texts: &[&str]) -> Vec<PageContent> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| PageContent {
                page_number: i + 1,
                text: t.to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn preserves_input_order() {
        let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(3));
        let input = pages(&["a", "bb", "ccc", "dddd", "eeeee", "ffffff", "g"]);

        let result = embed_pages(&embedder, &input).await.unwrap();

        assert_eq!(result.len(), 7);
        for (i, page) in result.iter().enumerate() {
            assert_eq!(page.page_number, i + 1);
            assert_eq!(page.embedding[0], input[i].text.len() as f32);
        }
    }

    #[tokio::test]
    async fn one_call_per_page() {
        let embedder = Arc::new(FakeEmbedder::new(3));
        let input = pages(&["a", "b", "c", "d", "e", "f"]);

        let as_dyn: Arc<dyn Embedder> = embedder.clone();
        embed_pages(&as_dyn, &input).await.unwrap();

        assert_eq!(embedder.call_count.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn empty_input_is_a_noop() {
        let embedder = Arc::new(FakeEmbedder::new(3));
        let as_dyn: Arc<dyn Embedder> = embedder.clone();

        let result = embed_pages(&as_dyn, &[]).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(embedder.call_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn any_page_failure_fails_the_run() {
        let embedder: Arc<dyn Embedder> = Arc::new(FailingEmbedder {
            poison: "bad".to_string(),
        });
        let input = pages(&["ok", "ok", "ok", "ok", "ok", "bad", "ok"]);

        let err = embed_pages(&embedder, &input).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Api(ref msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn blank_pages_are_still_embedded() {
        let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::new(2));
        let input = pages(&["text", "", "more"]);

        let result = embed_pages(&embedder, &input).await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[1].content, "");
        assert_eq!(result[1].page_number, 2);
    }
}
