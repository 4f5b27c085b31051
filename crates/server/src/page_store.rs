//! Document and page-chunk persistence over sqlx + pgvector.
//!
//! Pages are stored one row per (document_id, page_number) with the page
//! text and its embedding. Re-extraction replaces the whole page set for a
//! document inside a single transaction, so a reader either sees the old
//! complete set or the new complete set.

use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use lesesaal_ingest::embedding::PageEmbedding;

// ── Types ──────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub published: bool,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub page_count: i64,
}

/// Full document row as needed by the chat and re-extract pipelines.
#[derive(Debug)]
pub struct DocumentContent {
    pub id: Uuid,
    pub title: String,
    pub filename: String,
    pub extracted_text: String,
    pub published: bool,
}

/// One stored page chunk with its embedding, as read back for scoring.
#[derive(Debug, Clone)]
pub struct StoredPage {
    pub page_number: i32,
    pub content: String,
    pub embedding: Vec<f32>,
}

pub struct NewDocument<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub filename: &'a str,
    pub file_type: &'a str,
    pub file_size: i64,
    pub extracted_text: &'a str,
}

// ── Document operations ────────────────────────────

/// Insert a new document record. Documents start unpublished.
pub async fn insert_document(pool: &PgPool, doc: NewDocument<'_>) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO documents (id, title, description, category, filename, file_type, file_size, extracted_text) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(id)
    .bind(doc.title)
    .bind(doc.description)
    .bind(doc.category)
    .bind(doc.filename)
    .bind(doc.file_type)
    .bind(doc.file_size)
    .bind(doc.extracted_text)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn get_document(
    pool: &PgPool,
    document_id: Uuid,
) -> Result<Option<DocumentContent>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, title, filename, extracted_text, published FROM documents WHERE id = $1",
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| DocumentContent {
        id: row.get("id"),
        title: row.get("title"),
        filename: row.get("filename"),
        extracted_text: row.get("extracted_text"),
        published: row.get("published"),
    }))
}

/// List all documents with page counts, newest first.
pub async fn list_documents(pool: &PgPool) -> Result<Vec<DocumentRecord>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT d.id, d.title, d.description, d.category, d.filename, d.file_type, \
         d.file_size, d.published, d.uploaded_at, d.updated_at, \
         COUNT(c.id) as page_count \
         FROM documents d \
         LEFT JOIN page_chunks c ON c.document_id = d.id \
         GROUP BY d.id \
         ORDER BY d.uploaded_at DESC",
    )
    .fetch_all(pool)
    .await?;

    let docs = rows
        .iter()
        .map(|row| DocumentRecord {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            category: row.get("category"),
            filename: row.get("filename"),
            file_type: row.get("file_type"),
            file_size: row.get("file_size"),
            published: row.get("published"),
            uploaded_at: row.get("uploaded_at"),
            updated_at: row.get("updated_at"),
            page_count: row.get("page_count"),
        })
        .collect();
    Ok(docs)
}

/// Delete a document and all its page chunks and chat messages (CASCADE).
pub async fn delete_document(pool: &PgPool, document_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(document_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_published(
    pool: &PgPool,
    document_id: Uuid,
    published: bool,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE documents SET published = $2, updated_at = now() WHERE id = $1")
        .bind(document_id)
        .bind(published)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_extracted_text(
    pool: &PgPool,
    document_id: Uuid,
    extracted_text: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE documents SET extracted_text = $2, updated_at = now() WHERE id = $1")
        .bind(document_id)
        .bind(extracted_text)
        .execute(pool)
        .await?;
    Ok(())
}

// ── Page chunk operations ──────────────────────────

/// Replace the full page set for a document.
///
/// Delete and insert run in one transaction: the old set stays readable
/// until commit, and survives untouched if anything fails. Callers must
/// have finished embedding before calling this — nothing here is partial.
pub async fn replace_pages(
    pool: &PgPool,
    document_id: Uuid,
    pages: &[PageEmbedding],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM page_chunks WHERE document_id = $1")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

    for page in pages {
        let embedding = Vector::from(page.embedding.clone());
        sqlx::query(
            "INSERT INTO page_chunks (id, document_id, page_number, content, embedding) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(document_id)
        .bind(page.page_number as i32)
        .bind(&page.content)
        .bind(&embedding)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// All page chunks for a document, in page order.
pub async fn list_pages(pool: &PgPool, document_id: Uuid) -> Result<Vec<StoredPage>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT page_number, content, embedding FROM page_chunks \
         WHERE document_id = $1 ORDER BY page_number",
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    let pages = rows
        .iter()
        .map(|row| {
            let embedding: Vector = row.get("embedding");
            StoredPage {
                page_number: row.get("page_number"),
                content: row.get("content"),
                embedding: embedding.to_vec(),
            }
        })
        .collect();
    Ok(pages)
}

/// Number of page chunks stored for a document.
pub async fn page_count(pool: &PgPool, document_id: Uuid) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) as n FROM page_chunks WHERE document_id = $1")
        .bind(document_id)
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_page_holds_embedding() {
        let page = StoredPage {
            page_number: 3,
            content: "third page".to_string(),
            embedding: vec![0.1, 0.2, 0.3],
        };
        assert_eq!(page.page_number, 3);
        assert_eq!(page.embedding.len(), 3);
    }

    #[test]
    fn document_record_serializes() {
        let rec = DocumentRecord {
            id: Uuid::nil(),
            title: "Annual Report".to_string(),
            description: None,
            category: Some("finance".to_string()),
            filename: "report.pdf".to_string(),
            file_type: "pdf".to_string(),
            file_size: 1024,
            published: true,
            uploaded_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            page_count: 12,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"title\":\"Annual Report\""));
        assert!(json.contains("\"page_count\":12"));
        assert!(json.contains("\"description\":null"));
    }
}
