//! Model-consistent tokenization
//!
//! Token counts have to agree with what the embedding and chat APIs bill
//! and limit, so chunk boundaries are drawn on OpenAI's BPE tokens.

use tiktoken_rs::CoreBPE;

use crate::error::{Error, Result};

/// Text to token sequence and back
pub trait Tokenizer: Send + Sync {
    /// Encode text into token ids
    fn encode(&self, text: &str) -> Vec<usize>;

    /// Decode a token slice back to text
    fn decode(&self, tokens: &[usize]) -> Result<String>;

    /// Number of tokens in `text`
    fn count_tokens(&self, text: &str) -> usize {
        self.encode(text).len()
    }

    /// Encoding name for logging
    fn name(&self) -> &str;
}

/// Byte-pair encoder from `tiktoken-rs`
pub struct BpeTokenizer {
    bpe: CoreBPE,
    name: String,
}

impl BpeTokenizer {
    /// Tokenizer for `model`, falling back to `cl100k_base` for models
    /// `tiktoken-rs` does not know about
    pub fn for_model(model: &str) -> Result<Self> {
        match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => Ok(Self {
                bpe,
                name: model.to_string(),
            }),
            Err(_) => {
                tracing::warn!(
                    "No specific tokenizer found for {}, using cl100k_base",
                    model
                );
                Self::cl100k()
            }
        }
    }

    /// The `cl100k_base` encoding used by the OpenAI embedding models
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| Error::config(format!("failed to load cl100k_base: {}", e)))?;
        Ok(Self {
            bpe,
            name: "cl100k_base".to_string(),
        })
    }
}

impl Tokenizer for BpeTokenizer {
    fn encode(&self, text: &str) -> Vec<usize> {
        self.bpe.encode_ordinary(text)
    }

    fn decode(&self, tokens: &[usize]) -> Result<String> {
        if let Ok(text) = self.bpe.decode(tokens.to_vec()) {
            return Ok(text);
        }

        // A window boundary can split a multi-byte character; decode token
        // by token and replace the broken pieces.
        let mut text = String::new();
        for &token in tokens {
            match self.bpe.decode(vec![token]) {
                Ok(piece) => text.push_str(&piece),
                Err(_) => text.push(char::REPLACEMENT_CHARACTER),
            }
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
