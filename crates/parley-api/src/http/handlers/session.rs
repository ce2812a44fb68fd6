//! Session export endpoint.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use parley_types::chat::SessionExport;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// GET /api/session?session_id=...
///
/// Unknown ids export an empty history with the default prompt.
pub async fn get_session(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionExport>, AppError> {
    let session_id = query
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingParameter("session_id"))?;

    Ok(Json(state.export_session(session_id).await?))
}
