//! RAG chatbot server binary
//!
//! Run with: cargo run -p rag-chatbot --bin rag-chatbot-server

use rag_chatbot::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_chatbot=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing credentials fail here, before any request is served
    let config_path = std::env::var_os("RAG_CONFIG").map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.openai.embedding_model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - Generation model: {}", config.openai.generation_model);
    tracing::info!("  - Vector backend: {:?}", config.vector_store.backend);
    tracing::info!("  - Index: {}", config.vector_store.index_name);
    tracing::info!(
        "  - Chunking: {} tokens, {} overlap",
        config.chunking.max_tokens,
        config.chunking.overlap_tokens
    );

    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/chat   - Ask questions");
    println!("  POST /api/ingest - Add a document");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
