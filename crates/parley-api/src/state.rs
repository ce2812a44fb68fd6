//! Shared application state for the HTTP and WebSocket handlers.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use parley_core::relay::Orchestrator;
use parley_infra::llm::build_gateway;
use parley_infra::sqlite::{DatabasePool, SqliteConversationStore};
use parley_types::chat::SessionExport;
use parley_types::config::ParleyConfig;
use parley_types::error::RelayError;

/// Orchestrator bound to the concrete SQLite store.
pub type ConcreteOrchestrator = Orchestrator<SqliteConversationStore>;

/// Cloned into every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub config: Arc<ParleyConfig>,
    /// Port the dedicated WebSocket listener actually bound to.
    pub ws_port: u16,
    /// Cancelled on process shutdown; each connection uses a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Open the database, build the model gateway and wire the orchestrator.
    pub async fn init(config: ParleyConfig) -> anyhow::Result<Self> {
        let db_path = std::path::Path::new(&config.storage.db_path);
        let pool = DatabasePool::open(db_path)
            .await
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;

        let store = SqliteConversationStore::new(pool);
        let gateway = build_gateway(&config.model);
        tracing::info!(
            db_path = %config.storage.db_path,
            provider = gateway.name(),
            "Relay state initialized"
        );

        let orchestrator = Orchestrator::new(store, gateway, &config.relay);
        let ws_port = config.server.ws_port;

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
            ws_port,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn with_ws_port(mut self, ws_port: u16) -> Self {
        self.ws_port = ws_port;
        self
    }

    /// Export with the configured default filled in for sessions without
    /// their own prompt.
    pub async fn export_session(&self, session_id: &str) -> Result<SessionExport, RelayError> {
        let mut export = self.orchestrator.export_session(session_id).await?;
        let blank = export
            .system_prompt
            .as_deref()
            .is_none_or(|prompt| prompt.trim().is_empty());
        if blank {
            export.system_prompt = Some(self.orchestrator.default_system_prompt().to_string());
        }
        Ok(export)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Config with a fresh database in `dir` and the placeholder provider.
    pub(crate) fn test_config(dir: &tempfile::TempDir) -> ParleyConfig {
        let mut config = ParleyConfig::default();
        config.storage.db_path = dir.path().join("parley.db").display().to_string();
        config.relay.system_prompt = "default prompt".to_string();
        config
    }

    pub(crate) async fn test_state(dir: &tempfile::TempDir) -> AppState {
        AppState::init(test_config(dir)).await.unwrap()
    }

    #[tokio::test]
    async fn test_init_creates_database_and_placeholder_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        assert!(dir.path().join("parley.db").exists());
        assert_eq!(state.orchestrator.gateway_name(), "placeholder");
        assert_eq!(state.ws_port, 8765);
        assert_eq!(state.with_ws_port(9001).ws_port, 9001);
    }

    #[tokio::test]
    async fn test_export_fills_default_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let export = state.export_session("unknown").await.unwrap();
        assert_eq!(export.session_id, "unknown");
        assert_eq!(export.system_prompt.as_deref(), Some("default prompt"));
        assert!(export.messages.is_empty());

        state
            .orchestrator
            .handle_turn("s1", "hi", Some("be terse"))
            .await
            .unwrap();
        let export = state.export_session("s1").await.unwrap();
        assert_eq!(export.system_prompt.as_deref(), Some("be terse"));
        assert_eq!(export.messages.len(), 2);
    }
}
