//! Prompt assembly for grounded answer generation

pub mod prompt;

pub use prompt::{ChatMessage, PromptBuilder, NO_CONTEXT_NOTE};
