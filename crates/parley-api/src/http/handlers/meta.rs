//! Frontend discovery and health endpoints.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

pub const WS_PATH: &str = "/ws";

#[derive(Debug, Serialize)]
pub struct ClientConfig {
    pub ws_port: u16,
    pub ws_path: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub provider: String,
    pub gateway: String,
    pub base_url: String,
    pub model: String,
    pub api_key_present: bool,
    pub ws_port: u16,
    pub db_path: String,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<ClientConfig> {
    Json(ClientConfig {
        ws_port: state.ws_port,
        ws_path: WS_PATH,
    })
}

/// GET /api/health
///
/// Never exposes the key itself, only whether one is configured.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let config = &state.config;
    Json(Health {
        status: "ok",
        provider: config.model.provider.clone(),
        gateway: state.orchestrator.gateway_name().to_string(),
        base_url: config.model.base_url.clone(),
        model: config.model.model.clone(),
        api_key_present: config.model.api_key_present(),
        ws_port: state.ws_port,
        db_path: config.storage.db_path.clone(),
    })
}
