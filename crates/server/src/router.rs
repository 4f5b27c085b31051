//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route(
            "/documents",
            get(api::documents::list_documents)
                .post(api::documents::upload)
                .layer(DefaultBodyLimit::max(500 * 1024 * 1024)), // 500MB
        )
        .route(
            "/documents/{id}",
            get(api::documents::get_document).delete(api::documents::delete_document),
        )
        .route("/documents/{id}/publish", post(api::documents::publish))
        .route("/documents/{id}/reextract", post(api::documents::reextract))
        .route("/documents/{id}/search", post(api::documents::search))
        .route("/documents/{id}/chat", post(api::chat::chat))
        .route("/documents/{id}/messages", get(api::documents::list_messages))
        .route("/documents/{id}/summarize", post(api::documents::summarize))
        .route(
            "/documents/{id}/generate-title",
            post(api::documents::generate_title),
        )
        .route(
            "/documents/{id}/generate-description",
            post(api::documents::generate_description),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}
