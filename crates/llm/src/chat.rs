//! Prompt building for document-grounded chat and one-shot helpers.

use crate::provider::{LlmError, LlmProvider, Message, Role};

/// System prompt grounding the assistant in a single document's context.
///
/// `document_context` is either the assembled page blocks (retrieval path)
/// or the full legacy extracted text (fallback path) — the prompt shape is
/// identical in both cases.
pub fn document_system_prompt(document_context: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions about a specific document. \n\
         Here is the document content for context:\n\n\
         <document>\n{document_context}\n</document>\n\n\
         Please answer questions based on this document. If the question cannot be answered from the document, \n\
         say so clearly. Be concise and accurate in your responses."
    )
}

/// Assemble the full message list for a chat turn: system prompt, sanitized
/// history, then the new user message. Empty history entries are dropped.
pub fn chat_messages(
    document_context: &str,
    history: &[Message],
    user_message: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(document_system_prompt(document_context)));
    messages.extend(
        history
            .iter()
            .filter(|m| !m.content.trim().is_empty() && m.role != Role::System)
            .map(|m| Message {
                role: m.role,
                content: m.content.trim().to_string(),
            }),
    );
    messages.push(Message::user(user_message));
    messages
}

/// Brief 2-3 sentence summary of a document.
pub async fn summarize_document(
    provider: &dyn LlmProvider,
    document_text: &str,
    temperature: f32,
    max_tokens: u32,
) -> Result<String, LlmError> {
    provider
        .complete(
            vec![Message::user(format!(
                "Please provide a brief summary (2-3 sentences) of the following document:\n\n{document_text}"
            ))],
            temperature,
            max_tokens,
        )
        .await
}

/// Single-sentence description of what a document is about.
pub async fn generate_description(
    provider: &dyn LlmProvider,
    document_text: &str,
    temperature: f32,
    max_tokens: u32,
) -> Result<String, LlmError> {
    provider
        .complete(
            vec![Message::user(format!(
                "Write a single concise sentence (max 20 words) describing what this document is about. \
                 Focus on the main topic and purpose. Do not start with \"This document\" - just state what it is directly.\n\n\
                 Document content:\n{document_text}"
            ))],
            temperature,
            max_tokens,
        )
        .await
}

/// Short document title (max 10 words), trimmed.
pub async fn generate_title(
    provider: &dyn LlmProvider,
    document_text: &str,
    temperature: f32,
    max_tokens: u32,
) -> Result<String, LlmError> {
    let title = provider
        .complete(
            vec![Message::user(format!(
                "Generate a short, descriptive title for this document (max 10 words). \
                 The title should be clear and professional, like a document heading. \
                 Do not use quotes or punctuation at the end. Just output the title, nothing else.\n\n\
                 Document content:\n{document_text}"
            ))],
            temperature,
            max_tokens,
        )
        .await?;
    Ok(title.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_wraps_context_in_document_tags() {
        let prompt = document_system_prompt("page one text");
        assert!(prompt.contains("<document>\npage one text\n</document>"));
    }

    #[test]
    fn chat_messages_order_and_shape() {
        let history = vec![Message::user("earlier question"), Message::assistant("earlier answer")];
        let messages = chat_messages("ctx", &history, "new question");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].content, "new question");
    }

    #[test]
    fn empty_history_entries_are_dropped() {
        let history = vec![
            Message::user("  "),
            Message::assistant(""),
            Message::user("kept"),
        ];
        let messages = chat_messages("ctx", &history, "q");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "kept");
    }

    #[test]
    fn history_content_is_trimmed() {
        let history = vec![Message::user("  padded  ")];
        let messages = chat_messages("ctx", &history, "q");
        assert_eq!(messages[1].content, "padded");
    }
}
