//! Chat endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse};

/// POST /api/chat - Answer a question from the indexed documents
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(request) = payload?;
    let question = request.validate()?;
    tracing::debug!("Received chat query: {}", question);

    let turn = state.pipeline().answer(question).await?;
    Ok(Json(ChatResponse::from(turn)))
}
