//! Model gateway implementations.
//!
//! Provides the gateway factory ([`build_gateway`]) that maps the configured
//! provider name to a concrete [`ModelGateway`](parley_core::gateway::ModelGateway).

pub mod remote;

use parley_core::gateway::{BoxModelGateway, PlaceholderGateway};
use parley_types::config::{ModelConfig, ProviderKind};

use self::remote::RemoteGateway;

/// Build the gateway selected by `config.provider`.
///
/// Never fails: an unknown or empty provider name selects the placeholder,
/// and a remote provider without a key is still constructed (each call then
/// fails with `MissingCredential`).
pub fn build_gateway(config: &ModelConfig) -> BoxModelGateway {
    match config.provider_kind() {
        ProviderKind::Remote => {
            if !config.api_key_present() {
                tracing::warn!(
                    provider = %config.provider,
                    "No API key configured; every model call will fall back"
                );
            }
            BoxModelGateway::new(RemoteGateway::new(config))
        }
        ProviderKind::Placeholder => BoxModelGateway::new(PlaceholderGateway),
    }
}
