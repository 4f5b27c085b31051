use std::path::PathBuf;
use std::sync::Arc;

use sqlx::PgPool;

use lesesaal_core::Config;
use lesesaal_ingest::embedding::Embedder;
use lesesaal_llm::LlmProvider;

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    /// None when no embedding API key is configured; retrieval endpoints
    /// answer 503 in that case.
    pub embedder: Option<Arc<dyn Embedder>>,
    /// None when no LLM API key is configured; chat endpoints answer 503.
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub data_dir: PathBuf,
}
