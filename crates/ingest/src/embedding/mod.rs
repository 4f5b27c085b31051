pub mod openrouter;
pub mod pipeline;
pub mod traits;

pub use openrouter::OpenRouterEmbedder;
pub use pipeline::{embed_pages, PageEmbedding};
pub use traits::{Embedder, EmbeddingError};
