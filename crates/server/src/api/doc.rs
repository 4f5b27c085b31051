//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "lesesaal API",
        version = "0.1.0",
        description = "Document portal with page-level retrieval-augmented chat.",
    ),
    tags(
        (name = "Health", description = "Server readiness"),
        (name = "Documents", description = "Document upload, listing, publishing, and re-extraction"),
        (name = "Retrieval", description = "Page-level similarity search"),
        (name = "Chat", description = "Document-grounded streamed chat"),
        (name = "Generation", description = "One-shot summaries, titles, and descriptions"),
    ),
    paths(
        crate::api::health,
        crate::api::documents::upload,
        crate::api::documents::list_documents,
        crate::api::documents::get_document,
        crate::api::documents::delete_document,
        crate::api::documents::publish,
        crate::api::documents::reextract,
        crate::api::documents::search,
        crate::api::documents::list_messages,
        crate::api::documents::summarize,
        crate::api::documents::generate_title,
        crate::api::documents::generate_description,
        crate::api::chat::chat,
    ),
    components(schemas(
        crate::api::HealthResponse,
        crate::api::documents::UploadResponse,
        crate::api::documents::DocumentListResponse,
        crate::api::documents::DocumentDetailResponse,
        crate::api::documents::PublishRequest,
        crate::api::documents::ReextractResponse,
        crate::api::documents::SearchRequest,
        crate::api::documents::SearchResponse,
        crate::api::documents::MessagesResponse,
        crate::api::documents::GeneratedTextResponse,
        crate::api::chat::ChatRequest,
        crate::api::chat::HistoryMessage,
        crate::retrieval::RetrievedPage,
    ))
)]
pub struct ApiDoc;
