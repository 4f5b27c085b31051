pub mod chat;
pub mod provider;
pub mod providers;

pub use chat::{chat_messages, document_system_prompt};
pub use provider::{LlmError, LlmProvider, Message, Role, TextStream};
pub use providers::create_provider;
