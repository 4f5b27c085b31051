//! HTTP endpoint modules.

pub mod chat;
pub mod doc;
pub mod documents;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use lesesaal_ingest::embedding::Embedder;
use lesesaal_llm::LlmProvider;

use crate::state::AppState;

// ── Health ────────────────────────────────────────

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Server health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
pub async fn health(State(_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ── Shared dependency guards ──────────────────────

pub(crate) fn require_embedder(
    state: &AppState,
) -> Result<&Arc<dyn Embedder>, (StatusCode, String)> {
    state.embedder.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "Embedding provider not configured".to_string(),
    ))
}

pub(crate) fn require_llm(
    state: &AppState,
) -> Result<&Arc<dyn LlmProvider>, (StatusCode, String)> {
    state.llm.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "LLM provider not configured".to_string(),
    ))
}
