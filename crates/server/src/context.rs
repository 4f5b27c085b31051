//! Document context for the chat prompt: retrieved page subset when page
//! chunks exist, full legacy text otherwise.

use sqlx::PgPool;
use uuid::Uuid;

use lesesaal_ingest::embedding::Embedder;

use crate::page_store;
use crate::retrieval::{self, RetrievalError, RetrievedPage, DEFAULT_TOP_K};

/// How a document's context is supplied to the prompt.
///
/// Resolved once per chat request — never cached, since re-extraction can
/// flip a document from `FullText` to `Chunked` between requests.
#[derive(Debug)]
pub enum DocumentContext {
    /// Page-scoped retrieval: the top-scoring pages for this query.
    Chunked(Vec<RetrievedPage>),
    /// Legacy fallback for documents that predate page chunking: the full
    /// extracted text, unbounded and unfiltered.
    FullText(String),
}

impl DocumentContext {
    /// Render the context block that goes into the system prompt.
    pub fn render(&self) -> String {
        match self {
            DocumentContext::Chunked(pages) => assemble_page_context(pages),
            DocumentContext::FullText(text) => text.clone(),
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, DocumentContext::Chunked(_))
    }
}

/// Render retrieved pages as tagged blocks in reading order.
///
/// Retrieval hands pages ranked by relevance; the prompt wants them in page
/// order, so they are re-sorted ascending before rendering. Content is not
/// truncated here — any truncation already happened at ingestion.
pub fn assemble_page_context(pages: &[RetrievedPage]) -> String {
    let mut sorted: Vec<&RetrievedPage> = pages.iter().collect();
    sorted.sort_by_key(|p| p.page_number);

    sorted
        .iter()
        .map(|p| format!("<page number=\"{}\">\n{}\n</page>", p.page_number, p.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Resolve the context for one chat request.
///
/// Checks whether any page chunks exist for the document: if so, retrieves
/// the [`DEFAULT_TOP_K`] most relevant pages for `query`; if not, falls back
/// to the full legacy `extracted_text`. Zero chunks is a normal condition.
/// Retrieval pipeline errors propagate — the chat turn must fail loudly
/// rather than degrade to an empty context.
pub async fn resolve_document_context(
    pool: &PgPool,
    embedder: &dyn Embedder,
    document_id: Uuid,
    extracted_text: &str,
    query: &str,
) -> Result<DocumentContext, RetrievalError> {
    let count = page_store::page_count(pool, document_id).await?;
    if count == 0 {
        tracing::debug!(%document_id, "no page chunks — using full extracted text");
        return Ok(DocumentContext::FullText(extracted_text.to_string()));
    }

    let pages = retrieval::search(pool, embedder, document_id, query, DEFAULT_TOP_K).await?;
    tracing::debug!(
        %document_id,
        stored = count,
        retrieved = pages.len(),
        "retrieved page context"
    );
    Ok(DocumentContext::Chunked(pages))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrieved(n: i32, content: &str, score: f32) -> RetrievedPage {
        RetrievedPage {
            page_number: n,
            content: content.to_string(),
            score,
        }
    }

    #[test]
    fn blocks_are_rendered_in_page_order() {
        // Relevance order: page 7 beat page 3.
        let pages = vec![retrieved(7, "seventh", 0.9), retrieved(3, "third", 0.8)];

        let context = assemble_page_context(&pages);

        let pos3 = context.find("<page number=\"3\">").unwrap();
        let pos7 = context.find("<page number=\"7\">").unwrap();
        assert!(pos3 < pos7);
    }

    #[test]
    fn block_format_carries_page_number_and_content() {
        let context = assemble_page_context(&[retrieved(3, "third page text", 0.8)]);
        assert_eq!(context, "<page number=\"3\">\nthird page text\n</page>");
    }

    #[test]
    fn blocks_are_joined_with_a_blank_line() {
        let pages = vec![retrieved(1, "a", 0.5), retrieved(2, "b", 0.4)];
        let context = assemble_page_context(&pages);
        assert_eq!(
            context,
            "<page number=\"1\">\na\n</page>\n\n<page number=\"2\">\nb\n</page>"
        );
    }

    #[test]
    fn empty_retrieval_renders_empty() {
        assert_eq!(assemble_page_context(&[]), "");
    }

    #[test]
    fn full_text_renders_verbatim() {
        let ctx = DocumentContext::FullText("--- Page 1 ---\nlegacy text".to_string());
        assert_eq!(ctx.render(), "--- Page 1 ---\nlegacy text");
        assert!(!ctx.is_chunked());
    }

    #[test]
    fn chunked_renders_assembled_blocks() {
        let ctx = DocumentContext::Chunked(vec![retrieved(2, "x", 0.7)]);
        assert!(ctx.is_chunked());
        assert_eq!(ctx.render(), "<page number=\"2\">\nx\n</page>");
    }
}
