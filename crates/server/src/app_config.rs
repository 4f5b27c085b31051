//! Application configuration builders.
//!
//! Constructs the embedding and LLM clients from `Config`.

use std::sync::Arc;

use tracing::info;

use lesesaal_ingest::embedding::{Embedder, OpenRouterEmbedder};
use lesesaal_llm::LlmProvider;

/// Load configuration from `.env` and environment variables.
pub fn load_config() -> lesesaal_core::Config {
    lesesaal_core::config::load_dotenv();
    lesesaal_core::Config::from_env()
}

/// Build an Embedder from config. Returns None if no API key is configured.
pub fn build_embedder(config: &lesesaal_core::Config) -> Option<Arc<dyn Embedder>> {
    let Some(api_key) = config.embedding.api_key.clone() else {
        tracing::warn!("No embedding API key configured — retrieval features disabled");
        return None;
    };
    let embedder = OpenRouterEmbedder::new(
        api_key,
        config.embedding.model.clone(),
        config.embedding.base_url.clone(),
        config.embedding.dimensions as usize,
    );
    info!(
        "Embedding provider ready: {} (dims: {})",
        config.embedding.model, config.embedding.dimensions
    );
    Some(Arc::new(embedder))
}

/// Build an LLM provider from config. Returns None if not configured.
pub fn build_llm(config: &lesesaal_core::Config) -> Option<Arc<dyn LlmProvider>> {
    match lesesaal_llm::create_provider(&config.llm) {
        Ok(provider) => {
            info!(
                "LLM provider ready: {} ({})",
                config.llm.provider, config.llm.model
            );
            Some(provider)
        }
        Err(e) => {
            tracing::warn!("LLM provider not available: {} — chat endpoints disabled", e);
            None
        }
    }
}
