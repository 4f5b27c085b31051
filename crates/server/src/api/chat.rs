//! Document chat endpoint: retrieval-augmented, streamed.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lesesaal_llm::{chat_messages, Message};

use crate::api::{require_embedder, require_llm};
use crate::chat_store;
use crate::context;
use crate::page_store;
use crate::retrieval::RetrievalError;
use crate::state::AppState;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

fn history_to_messages(history: &[HistoryMessage]) -> Vec<Message> {
    history
        .iter()
        .filter_map(|m| match m.role.as_str() {
            "user" => Some(Message::user(&m.content)),
            "assistant" => Some(Message::assistant(&m.content)),
            _ => None,
        })
        .collect()
}

/// Chat about a document, streaming the reply
///
/// Resolves the document context per request: page-scoped retrieval when
/// page chunks exist, the full legacy extracted text otherwise. The reply
/// streams as plain text; the full assistant message is persisted when the
/// model finishes, even if the client disconnects mid-stream.
#[utoipa::path(
    post,
    path = "/documents/{id}/chat",
    tag = "Chat",
    params(("id" = String, Path, description = "Document UUID")),
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Streamed assistant reply", body = String, content_type = "text/plain"),
        (status = 404, description = "Document not found or unpublished", body = String),
        (status = 502, description = "Embedding or LLM provider failure", body = String)
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, (StatusCode, String)> {
    let embedder = require_embedder(&state)?;
    let llm = require_llm(&state)?.clone();

    if req.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message is required".to_string()));
    }

    let doc = page_store::get_document(&state.pool, id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?
        .filter(|d| d.published)
        .ok_or((StatusCode::NOT_FOUND, "Document not found".to_string()))?;

    chat_store::insert_chat_message(&state.pool, id, "user", &req.message)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?;

    // Resolved fresh on every request: re-extraction may have switched the
    // document between the fallback and retrieval paths since the last turn.
    let doc_context = context::resolve_document_context(
        &state.pool,
        embedder.as_ref(),
        id,
        &doc.extracted_text,
        &req.message,
    )
    .await
    .map_err(|e| match e {
        RetrievalError::Store(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}"))
        }
        // A broken retrieval pipeline fails the turn. Answering from no
        // context would look like the document is empty — only the
        // zero-chunks case may degrade, and that is handled above.
        RetrievalError::Embedding(e) => {
            (StatusCode::BAD_GATEWAY, format!("Embedding failed: {e}"))
        }
    })?;

    debug!(
        %id,
        chunked = doc_context.is_chunked(),
        "document context resolved"
    );

    let document_context = format!("Title: {}\n\n{}", doc.title, doc_context.render());

    let messages = chat_messages(
        &document_context,
        &history_to_messages(&req.history),
        req.message.trim(),
    );

    let mut llm_stream = llm
        .stream(
            messages,
            state.config.llm.temperature,
            state.config.llm.max_tokens,
        )
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("LLM request failed: {e}")))?;

    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(32);
    let pool = state.pool.clone();

    // Consume the provider stream to completion in a background task so the
    // assistant message gets persisted even if the client goes away.
    tokio::spawn(async move {
        let mut full_reply = String::new();
        while let Some(item) = llm_stream.next().await {
            match item {
                Ok(fragment) => {
                    full_reply.push_str(&fragment);
                    // A send error means the client disconnected; keep
                    // draining the stream for persistence.
                    let _ = tx.send(Ok(Bytes::from(fragment))).await;
                }
                Err(e) => {
                    warn!("LLM stream error mid-response: {e}");
                    break;
                }
            }
        }

        if !full_reply.trim().is_empty() {
            match chat_store::insert_chat_message(&pool, id, "assistant", &full_reply).await {
                Ok(_) => info!("Persisted assistant reply ({} chars)", full_reply.len()),
                Err(e) => warn!("Failed to persist assistant reply: {e}"),
            }
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(body)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Response build failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesesaal_llm::Role;

    #[test]
    fn history_maps_known_roles() {
        let history = vec![
            HistoryMessage {
                role: "user".to_string(),
                content: "q".to_string(),
            },
            HistoryMessage {
                role: "assistant".to_string(),
                content: "a".to_string(),
            },
            HistoryMessage {
                role: "system".to_string(),
                content: "ignored".to_string(),
            },
        ];

        let messages = history_to_messages(&history);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }
}
