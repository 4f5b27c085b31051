pub mod openrouter;

use std::sync::Arc;

use lesesaal_core::config::LlmConfig;

use crate::provider::{LlmError, LlmProvider};
pub use openrouter::OpenRouterProvider;

/// Build an LLM provider from config.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.provider.as_str() {
        // OpenRouter and OpenAI speak the same chat/completions dialect.
        "openrouter" | "openai" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| LlmError::NotConfigured("missing LLM API key".to_string()))?;
            Ok(Arc::new(OpenRouterProvider::new(
                api_key,
                config.model.clone(),
                config.base_url.clone(),
            )))
        }
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider '{other}'"
        ))),
    }
}
