//! Prompt templates for RAG generation

use serde::{Deserialize, Serialize};

use crate::providers::GenerationRequest;

/// Context block used when retrieval found nothing
pub const NO_CONTEXT_NOTE: &str = "(no relevant context found)";

const SNIPPET_SEPARATOR: &str = "\n\n---\n\n";

/// One chat-completion message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join ranked snippets into a single delimited context block
    pub fn build_context(snippets: &[String]) -> String {
        if snippets.is_empty() {
            return NO_CONTEXT_NOTE.to_string();
        }

        snippets
            .iter()
            .enumerate()
            .map(|(i, text)| format!("[{}] {}", i + 1, text.trim()))
            .collect::<Vec<_>>()
            .join(SNIPPET_SEPARATOR)
    }

    /// System instructions followed by the context block
    pub fn build_system_message(system_prompt: &str, snippets: &[String]) -> String {
        format!(
            "{}\n\nContext:\n{}",
            system_prompt.trim_end(),
            Self::build_context(snippets)
        )
    }

    /// System + user messages for a generation request
    pub fn build_messages(request: &GenerationRequest<'_>) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(Self::build_system_message(
                request.system_prompt,
                request.context,
            )),
            ChatMessage::user(request.query),
        ]
    }
}
