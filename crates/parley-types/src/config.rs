//! Configuration types for Parley.
//!
//! `ParleyConfig` mirrors `parley.toml`. Every field has a default, so an
//! empty or partial file is valid. The config is built once at startup and
//! passed down explicitly; nothing in the core reads the environment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Listener settings for the HTTP and WebSocket adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// First port tried for the dedicated WebSocket listener.
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    /// Static files served as a fallback when the directory exists.
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_ws_port() -> u16 {
    8765
}

fn default_frontend_dir() -> String {
    "frontend".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_port: default_ws_port(),
            frontend_dir: default_frontend_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "data/parley.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Model gateway selection and remote endpoint settings.
///
/// Does NOT derive Debug: the API key must never reach a log line.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub api_key: String,
}

fn default_provider() -> String {
    "placeholder".to_string()
}

fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
            api_key: String::new(),
        }
    }
}

impl ModelConfig {
    pub fn api_key_present(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn provider_kind(&self) -> ProviderKind {
        ProviderKind::from_name(&self.provider)
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("api_key", &if self.api_key_present() { "[REDACTED]" } else { "" })
            .finish()
    }
}

/// Which gateway variant a provider name selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions endpoint (DeepSeek and friends).
    Remote,
    /// Local canned replies, no network.
    Placeholder,
}

impl ProviderKind {
    /// Unknown and empty names select the placeholder.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "deepseek" | "deepseek_api" | "openai_compatible" => ProviderKind::Remote,
            _ => ProviderKind::Placeholder,
        }
    }
}

/// Conversation relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Process-wide default system prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// History window sent to the model. Values below 2 are clamped to 2.
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: i64,
}

fn default_system_prompt() -> String {
    "You are a friendly, reliable AI companion. Keep answers concise and clear, \
     with actionable steps when needed."
        .to_string()
}

fn default_max_history_messages() -> i64 {
    20
}

/// Lower bound of the history window.
pub const MIN_HISTORY_MESSAGES: i64 = 2;

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_history_messages: default_max_history_messages(),
        }
    }
}

impl RelayConfig {
    pub fn history_window(&self) -> i64 {
        self.max_history_messages.max(MIN_HISTORY_MESSAGES)
    }
}
