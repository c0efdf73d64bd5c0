//! Document ingestion and index statistics endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{IndexStats, IngestReport, IngestRequest};

/// POST /api/ingest - Chunk, embed and upsert one document
pub async fn ingest_document(
    State(state): State<AppState>,
    payload: std::result::Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestReport>> {
    let Json(request) = payload?;
    let source_id = request.validate()?;
    tracing::info!("Ingesting '{}' ({} bytes)", source_id, request.text.len());

    let report = state.pipeline().ingest(&request.text, source_id).await?;
    Ok(Json(report))
}

/// GET /api/index/stats - Index dimension and record count
pub async fn index_stats(State(state): State<AppState>) -> Result<Json<IndexStats>> {
    Ok(Json(state.pipeline().index_stats().await?))
}
