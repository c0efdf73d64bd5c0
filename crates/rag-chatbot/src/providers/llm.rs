//! LLM provider trait for generating grounded answers

use async_trait::async_trait;

use crate::error::Result;

/// One generation call: the question, ranked context and instructions
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub query: &'a str,
    /// Retrieved snippets in rank order; may be empty
    pub context: &'a [String],
    pub system_prompt: &'a str,
    pub temperature: f32,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(query: &'a str, context: &'a [String], system_prompt: &'a str) -> Self {
        Self {
            query,
            context,
            system_prompt,
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Trait for chat-completion answer generation
///
/// Implementations:
/// - `OpenAiChat`: OpenAI `/chat/completions` (gpt-4o)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Produce the complete answer for `request`.
    ///
    /// An empty context still produces a prompt, carrying an explicit
    /// "no context found" note.
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
