//! HTTP server for the chatbot

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::types::HealthResponse;
use state::AppState;

/// RAG chatbot HTTP server
pub struct RagServer {
    state: AppState,
}

impl RagServer {
    /// Create a new server, connecting to every configured provider
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config).await?;
        Ok(Self { state })
    }

    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = build_router(self.state.clone());

        tracing::info!("Starting RAG chatbot on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        self.state.set_ready(true);
        let state = self.state.clone();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                state.set_ready(false);
            })
            .await;
        self.state.set_ready(false);

        result.map_err(|e| Error::Internal(format!("Server error: {}", e)))
    }

    /// Get the server address
    pub fn address(&self) -> String {
        let server = &self.state.config().server;
        format!("{}:{}", server.host, server.port)
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    let server = &state.config().server;

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .nest("/api", routes::api_routes(server.max_body_bytes))
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http());

    if server.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }

    router
}

/// Health check endpoint: reports whether the vector index is reachable
pub(crate) async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    match state.pipeline().vector_store().health_check().await {
        Ok(true) => Json(HealthResponse::ok()),
        Ok(false) => Json(HealthResponse::error("Vector index not available")),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Json(HealthResponse::error("Service health check failed"))
        }
    }
}

/// Provider health endpoint: embedder, vector index and chat model
pub(crate) async fn provider_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let providers = state.pipeline().health().await;
    if !providers.is_healthy() {
        tracing::warn!("Provider health check failed: {:?}", providers);
    }
    Json(HealthResponse::from_providers(providers))
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down");
}
