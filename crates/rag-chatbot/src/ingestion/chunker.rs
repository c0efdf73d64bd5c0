//! Overlapping token-window chunking

use std::ops::Range;

use crate::error::{Error, Result};
use crate::types::Chunk;

use super::tokenizer::Tokenizer;

/// Splits text into windows of at most `max_tokens` tokens, consecutive
/// windows sharing `overlap_tokens` tokens
#[derive(Debug, Clone, Copy)]
pub struct TokenChunker {
    max_tokens: usize,
    overlap_tokens: usize,
}

impl TokenChunker {
    /// Create a chunker; the window must advance on every step
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Result<Self> {
        if max_tokens == 0 {
            return Err(Error::config("max_tokens must be positive"));
        }
        if overlap_tokens >= max_tokens {
            return Err(Error::config(format!(
                "overlap_tokens ({}) must be less than max_tokens ({})",
                overlap_tokens, max_tokens
            )));
        }
        Ok(Self {
            max_tokens,
            overlap_tokens,
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Tokens the window start moves by per step
    pub fn stride(&self) -> usize {
        self.max_tokens - self.overlap_tokens
    }

    /// Chunk `text`, naming chunks `{source_id}-{index}`
    pub fn chunk(
        &self,
        tokenizer: &dyn Tokenizer,
        text: &str,
        source_id: &str,
    ) -> Result<Vec<Chunk>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let tokens = tokenizer.encode(text);
        let windows = token_windows(tokens.len(), self.max_tokens, self.overlap_tokens);

        let mut chunks = Vec::with_capacity(windows.len());
        for (chunk_index, window) in windows.into_iter().enumerate() {
            let slice = &tokens[window.clone()];
            chunks.push(Chunk {
                id: Chunk::record_id(source_id, chunk_index),
                text: tokenizer.decode(slice)?,
                chunk_index,
                source_offset: window.start,
                token_count: slice.len(),
            });
        }

        tracing::debug!(
            "Chunked {} tokens into {} chunks (max {}, overlap {}, tokenizer {})",
            tokens.len(),
            chunks.len(),
            self.max_tokens,
            self.overlap_tokens,
            tokenizer.name()
        );

        Ok(chunks)
    }
}

/// Chunk `text` with an explicit window size and overlap
pub fn chunk_text(
    tokenizer: &dyn Tokenizer,
    text: &str,
    max_tokens: usize,
    overlap_tokens: usize,
    source_id: &str,
) -> Result<Vec<Chunk>> {
    TokenChunker::new(max_tokens, overlap_tokens)?.chunk(tokenizer, text, source_id)
}

/// Token ranges of each window over a sequence of `len` tokens.
///
/// Windows start at multiples of `max_tokens - overlap_tokens`; the last one
/// ends at `len` and may be shorter. Callers guarantee `overlap < max`.
pub fn token_windows(len: usize, max_tokens: usize, overlap_tokens: usize) -> Vec<Range<usize>> {
    debug_assert!(overlap_tokens < max_tokens);
    let stride = max_tokens - overlap_tokens;

    let mut windows = Vec::new();
    let mut start = 0usize;
    while start < len {
        let end = (start + max_tokens).min(len);
        windows.push(start..end);
        if end == len {
            break;
        }
        start += stride;
    }
    windows
}
