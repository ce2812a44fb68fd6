//! Single-shot chat endpoint.
//!
//! POST /api/chat always runs a non-streaming turn; streaming replies are
//! only available over the WebSocket relay.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;

use parley_types::chat::TurnOutcome;

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default, alias = "content")]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// `Some("")` clears the session prompt back to the default.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<TurnOutcome>, AppError> {
    let Json(body) = body?;
    let outcome = state
        .orchestrator
        .handle_turn(
            body.session_id.as_deref().unwrap_or_default(),
            &body.message,
            body.system_prompt.as_deref(),
        )
        .await?;
    Ok(Json(outcome))
}
