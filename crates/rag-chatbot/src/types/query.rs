//! Request types validated at the HTTP boundary

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Longest question accepted by the chat endpoint, in characters
pub const MAX_QUESTION_CHARS: usize = 4000;

/// Longest source id accepted by the ingest endpoint
pub const MAX_SOURCE_ID_CHARS: usize = 256;

/// Chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub question: String,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }

    /// Trimmed question, or an `InvalidRequest` error
    pub fn validate(&self) -> Result<&str> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(Error::invalid("question must not be empty"));
        }
        if question.chars().count() > MAX_QUESTION_CHARS {
            return Err(Error::invalid(format!(
                "question must be at most {} characters",
                MAX_QUESTION_CHARS
            )));
        }
        Ok(question)
    }
}

/// Ingest request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Raw document text
    pub text: String,
    /// Stable identifier; record ids derive from it
    pub source_id: String,
}

impl IngestRequest {
    pub fn new(text: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
        }
    }

    /// Check the text and source id; returns the trimmed source id
    pub fn validate(&self) -> Result<&str> {
        if self.text.trim().is_empty() {
            return Err(Error::invalid("text must not be empty"));
        }
        validate_source_id(&self.source_id)
    }
}

/// Source ids become record id prefixes, so keep them to a safe alphabet
pub fn validate_source_id(source_id: &str) -> Result<&str> {
    let source_id = source_id.trim();
    if source_id.is_empty() {
        return Err(Error::invalid("source_id must not be empty"));
    }
    if source_id.chars().count() > MAX_SOURCE_ID_CHARS {
        return Err(Error::invalid(format!(
            "source_id must be at most {} characters",
            MAX_SOURCE_ID_CHARS
        )));
    }
    if let Some(bad) = source_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
    {
        return Err(Error::invalid(format!(
            "source_id contains unsupported character '{}'",
            bad
        )));
    }
    Ok(source_id)
}
