//! Document ingestion: tokenization and token-window chunking

mod chunker;
mod tokenizer;

pub use chunker::{chunk_text, token_windows, TokenChunker};
pub use tokenizer::{BpeTokenizer, Tokenizer};
