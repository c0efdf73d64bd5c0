//! API routes for the chatbot server

pub mod chat;
pub mod ingest;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat))
        .route(
            "/ingest",
            post(ingest::ingest_document).layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .route("/index/stats", get(ingest::index_stats))
        .route("/health", get(crate::server::provider_health))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "rag-chatbot",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Retrieval-augmented chatbot over ingested documents",
        "endpoints": {
            "POST /api/chat": "Answer a question from retrieved context",
            "POST /api/ingest": "Chunk, embed and store a document",
            "GET /api/index/stats": "Vector count and dimension",
            "GET /api/health": "Embedder, vector index and chat model reachability",
            "GET /health": "Vector index reachability",
            "GET /ready": "Whether the server is accepting traffic"
        }
    }))
}
