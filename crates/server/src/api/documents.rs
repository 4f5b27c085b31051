//! Document CRUD, re-extraction, and page search endpoints.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat_store;
use crate::page_store::{self, NewDocument};
use crate::retrieval::{self, RetrievalError, RetrievedPage, DEFAULT_TOP_K};
use crate::state::AppState;
use crate::api::{require_embedder, require_llm};

const MAX_UPLOAD_BYTES: i64 = 500 * 1024 * 1024;

// ── Request/Response types ────────────────────────

#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    #[schema(value_type = String)]
    pub document_id: Uuid,
    pub title: String,
    pub filename: String,
    pub file_size: i64,
    pub page_count: usize,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentListResponse {
    #[schema(value_type = Vec<Object>)]
    pub documents: Vec<page_store::DocumentRecord>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentDetailResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub title: String,
    pub filename: String,
    pub published: bool,
    pub extracted_text: String,
    pub page_count: i64,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PublishRequest {
    pub published: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReextractResponse {
    pub pages_processed: usize,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SearchResponse {
    pub results: Vec<RetrievedPage>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessagesResponse {
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<chat_store::ChatMessageRecord>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GeneratedTextResponse {
    pub text: String,
}

fn map_retrieval_error(e: RetrievalError) -> (StatusCode, String) {
    match e {
        RetrievalError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")),
        RetrievalError::Embedding(e) => (StatusCode::BAD_GATEWAY, format!("Embedding failed: {e}")),
    }
}

// ── POST /documents ───────────────────────────────

/// Upload a document
///
/// Accepts multipart/form-data with a `file` field plus optional `title`,
/// `description`, and `category` fields. The document is parsed and stored
/// with its page-marked full text; page chunks and embeddings are built by
/// the separate re-extract operation.
#[utoipa::path(
    post,
    path = "/documents",
    tag = "Documents",
    request_body(content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 200, description = "Document stored", body = UploadResponse),
        (status = 400, description = "Upload error", body = String)
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, String)> {
    let mut filename = None;
    let mut bytes = None;
    let mut title = None;
    let mut description = None;
    let mut category = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {e}")))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                filename = Some(field.file_name().unwrap_or("document.pdf").to_string());
                bytes = Some(field.bytes().await.map_err(|e| {
                    (StatusCode::BAD_REQUEST, format!("Failed to read file: {e}"))
                })?);
            }
            "title" => title = field.text().await.ok().filter(|s| !s.is_empty()),
            "description" => description = field.text().await.ok().filter(|s| !s.is_empty()),
            "category" => category = field.text().await.ok().filter(|s| !s.is_empty()),
            _ => {}
        }
    }

    let filename = filename.ok_or((StatusCode::BAD_REQUEST, "No file provided".to_string()))?;
    let bytes = bytes.ok_or((StatusCode::BAD_REQUEST, "No file provided".to_string()))?;
    let file_size = bytes.len() as i64;

    if file_size > MAX_UPLOAD_BYTES {
        return Err((StatusCode::PAYLOAD_TOO_LARGE, "File exceeds 500MB limit".to_string()));
    }

    let doc = lesesaal_ingest::document::extract_text(&bytes, &filename)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Text extraction failed: {e}")))?;

    info!(
        "Extracted '{}' (type={}): {} pages, {} chars",
        filename,
        doc.file_type,
        doc.pages.len(),
        doc.total_chars(),
    );

    let title = title.unwrap_or_else(|| filename.clone());
    let document_id = page_store::insert_document(
        &state.pool,
        NewDocument {
            title: &title,
            description: description.as_deref(),
            category: category.as_deref(),
            filename: &filename,
            file_type: &doc.file_type,
            file_size,
            extracted_text: &doc.page_marked_text(),
        },
    )
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("DB insert failed: {e}")))?;

    // Persist the original file so re-extraction can re-read it later.
    let doc_dir = state.data_dir.join("documents").join(document_id.to_string());
    fs::create_dir_all(&doc_dir)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to create storage dir: {e}")))?;
    fs::write(doc_dir.join(&filename), &bytes)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to save file: {e}")))?;

    info!("Uploaded document '{}' ({} pages)", title, doc.pages.len());

    Ok(Json(UploadResponse {
        document_id,
        title,
        filename,
        file_size,
        page_count: doc.pages.len(),
    }))
}

// ── GET /documents ────────────────────────────────

/// List all documents with page counts
#[utoipa::path(
    get,
    path = "/documents",
    tag = "Documents",
    responses((status = 200, description = "All documents, newest first", body = DocumentListResponse))
)]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentListResponse>, (StatusCode, String)> {
    let documents = page_store::list_documents(&state.pool)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to list documents: {e}")))?;
    Ok(Json(DocumentListResponse { documents }))
}

// ── GET /documents/{id} ───────────────────────────

/// Fetch one document with its extracted text
#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "Documents",
    params(("id" = String, Path, description = "Document UUID")),
    responses(
        (status = 200, description = "Document detail", body = DocumentDetailResponse),
        (status = 404, description = "Document not found", body = String)
    )
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentDetailResponse>, (StatusCode, String)> {
    let doc = page_store::get_document(&state.pool, id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?
        .ok_or((StatusCode::NOT_FOUND, "Document not found".to_string()))?;

    let page_count = page_store::page_count(&state.pool, id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?;

    Ok(Json(DocumentDetailResponse {
        id: doc.id,
        title: doc.title,
        filename: doc.filename,
        published: doc.published,
        extracted_text: doc.extracted_text,
        page_count,
    }))
}

// ── DELETE /documents/{id} ────────────────────────

/// Delete a document, its page chunks, and its stored file
#[utoipa::path(
    delete,
    path = "/documents/{id}",
    tag = "Documents",
    params(("id" = String, Path, description = "Document UUID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Document not found", body = String)
    )
)]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = page_store::delete_document(&state.pool, id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete failed: {e}")))?;

    if deleted {
        let doc_dir = state.data_dir.join("documents").join(id.to_string());
        if let Err(e) = fs::remove_dir_all(&doc_dir).await {
            warn!("Failed to remove file dir {}: {e}", doc_dir.display());
        }
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Document not found".to_string()))
    }
}

// ── POST /documents/{id}/publish ──────────────────

/// Publish or unpublish a document
#[utoipa::path(
    post,
    path = "/documents/{id}/publish",
    tag = "Documents",
    params(("id" = String, Path, description = "Document UUID")),
    request_body = PublishRequest,
    responses(
        (status = 204, description = "Publish state updated"),
        (status = 404, description = "Document not found", body = String)
    )
)]
pub async fn publish(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PublishRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    let updated = page_store::set_published(&state.pool, id, req.published)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update failed: {e}")))?;

    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Document not found".to_string()))
    }
}

// ── POST /documents/{id}/reextract ────────────────

/// Re-extract a document and rebuild its page chunks
///
/// Re-reads the stored file, extracts pages, embeds every page, then
/// replaces the document's page chunk set in one transaction. Nothing is
/// deleted until the new set has been fully extracted and embedded, so a
/// failure anywhere leaves the previous chunks intact.
#[utoipa::path(
    post,
    path = "/documents/{id}/reextract",
    tag = "Documents",
    params(("id" = String, Path, description = "Document UUID")),
    responses(
        (status = 200, description = "Pages re-extracted and embedded", body = ReextractResponse),
        (status = 404, description = "Document not found", body = String),
        (status = 502, description = "Embedding provider failure", body = String)
    )
)]
pub async fn reextract(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReextractResponse>, (StatusCode, String)> {
    let embedder = require_embedder(&state)?;

    let doc = page_store::get_document(&state.pool, id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?
        .ok_or((StatusCode::NOT_FOUND, "Document not found".to_string()))?;

    let file_path = state
        .data_dir
        .join("documents")
        .join(id.to_string())
        .join(&doc.filename);
    let bytes = fs::read(&file_path).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read stored file {}: {e}", file_path.display()),
        )
    })?;

    info!("Re-extracting '{}' ({} bytes)", doc.filename, bytes.len());

    let extracted = lesesaal_ingest::document::extract_text(&bytes, &doc.filename)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, format!("Text extraction failed: {e}")))?;

    info!(
        "Extracted {} pages, generating embeddings...",
        extracted.pages.len()
    );

    let embedded = lesesaal_ingest::embedding::embed_pages(embedder, &extracted.pages)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("Embedding failed: {e}")))?;

    page_store::replace_pages(&state.pool, id, &embedded)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Chunk replace failed: {e}")))?;

    page_store::update_extracted_text(&state.pool, id, &extracted.page_marked_text())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?;

    info!(
        "Re-extraction complete for {}: {} page chunks stored",
        id,
        embedded.len()
    );

    Ok(Json(ReextractResponse {
        pages_processed: embedded.len(),
    }))
}

// ── POST /documents/{id}/search ───────────────────

/// Score a document's pages against a query
///
/// Embeds the query and ranks every stored page chunk by cosine
/// similarity. Returns an empty list for documents without page chunks.
#[utoipa::path(
    post,
    path = "/documents/{id}/search",
    tag = "Retrieval",
    params(("id" = String, Path, description = "Document UUID")),
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Pages ranked by similarity", body = SearchResponse),
        (status = 503, description = "Embedding provider not configured", body = String)
    )
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let embedder = require_embedder(&state)?;

    let results = retrieval::search(&state.pool, embedder.as_ref(), id, &req.query, req.top_k)
        .await
        .map_err(map_retrieval_error)?;

    Ok(Json(SearchResponse { results }))
}

// ── GET /documents/{id}/messages ──────────────────

/// Chat history for a document
#[utoipa::path(
    get,
    path = "/documents/{id}/messages",
    tag = "Chat",
    params(("id" = String, Path, description = "Document UUID")),
    responses(
        (status = 200, description = "Messages, oldest first", body = MessagesResponse),
        (status = 404, description = "Document not found", body = String)
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessagesResponse>, (StatusCode, String)> {
    let doc = page_store::get_document(&state.pool, id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?;
    if doc.is_none() {
        return Err((StatusCode::NOT_FOUND, "Document not found".to_string()));
    }

    let messages = chat_store::list_chat_messages(&state.pool, id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?;

    Ok(Json(MessagesResponse { messages }))
}

// ── One-shot generation helpers ───────────────────

async fn generate_from_document<F, Fut>(
    state: &AppState,
    id: Uuid,
    f: F,
) -> Result<Json<GeneratedTextResponse>, (StatusCode, String)>
where
    F: FnOnce(Arc<dyn lesesaal_llm::LlmProvider>, String, f32, u32) -> Fut,
    Fut: std::future::Future<Output = Result<String, lesesaal_llm::LlmError>>,
{
    let llm = require_llm(state)?.clone();

    let doc = page_store::get_document(&state.pool, id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?
        .ok_or((StatusCode::NOT_FOUND, "Document not found".to_string()))?;

    let text = f(
        llm,
        doc.extracted_text,
        state.config.llm.temperature,
        state.config.llm.max_tokens,
    )
    .await
    .map_err(|e| (StatusCode::BAD_GATEWAY, format!("LLM call failed: {e}")))?;

    Ok(Json(GeneratedTextResponse { text }))
}

/// Summarize a document in 2-3 sentences
#[utoipa::path(
    post,
    path = "/documents/{id}/summarize",
    tag = "Generation",
    params(("id" = String, Path, description = "Document UUID")),
    responses((status = 200, description = "Summary text", body = GeneratedTextResponse))
)]
pub async fn summarize(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GeneratedTextResponse>, (StatusCode, String)> {
    generate_from_document(&state, id, |llm, text, temp, max| async move {
        lesesaal_llm::chat::summarize_document(llm.as_ref(), &text, temp, max).await
    })
    .await
}

/// Generate a short title for a document
#[utoipa::path(
    post,
    path = "/documents/{id}/generate-title",
    tag = "Generation",
    params(("id" = String, Path, description = "Document UUID")),
    responses((status = 200, description = "Title text", body = GeneratedTextResponse))
)]
pub async fn generate_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GeneratedTextResponse>, (StatusCode, String)> {
    generate_from_document(&state, id, |llm, text, temp, max| async move {
        lesesaal_llm::chat::generate_title(llm.as_ref(), &text, temp, max).await
    })
    .await
}

/// Generate a one-sentence description for a document
#[utoipa::path(
    post,
    path = "/documents/{id}/generate-description",
    tag = "Generation",
    params(("id" = String, Path, description = "Document UUID")),
    responses((status = 200, description = "Description text", body = GeneratedTextResponse))
)]
pub async fn generate_description(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GeneratedTextResponse>, (StatusCode, String)> {
    generate_from_document(&state, id, |llm, text, temp, max| async move {
        lesesaal_llm::chat::generate_description(llm.as_ref(), &text, temp, max).await
    })
    .await
}
