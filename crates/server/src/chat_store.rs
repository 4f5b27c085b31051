//! Chat message persistence, one thread per document.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ChatMessageRecord {
    pub id: Uuid,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_chat_message(
    pool: &PgPool,
    document_id: Uuid,
    role: &str,
    content: &str,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO chat_messages (id, document_id, role, content) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(document_id)
        .bind(role)
        .bind(content)
        .execute(pool)
        .await?;
    Ok(id)
}

/// All messages for a document, oldest first.
pub async fn list_chat_messages(
    pool: &PgPool,
    document_id: Uuid,
) -> Result<Vec<ChatMessageRecord>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, role, content, created_at FROM chat_messages \
         WHERE document_id = $1 ORDER BY created_at",
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ChatMessageRecord {
            id: row.get("id"),
            role: row.get("role"),
            content: row.get("content"),
            created_at: row.get("created_at"),
        })
        .collect())
}
