//! CLI command definitions for the `parley` binary.

pub mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use parley_infra::config::DEFAULT_CONFIG_FILE;
use parley_types::config::ParleyConfig;

/// Session-addressed conversation relay.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, env = "PARLEY_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// SQLite database file (overrides [storage] db_path).
    #[arg(long, global = true, env = "PARLEY_DB_PATH")]
    pub db: Option<String>,

    /// Model provider: "deepseek" or "placeholder" (overrides [model] provider).
    #[arg(long, global = true, env = "PARLEY_PROVIDER")]
    pub provider: Option<String>,

    /// Model API key (overrides [model] api_key).
    #[arg(long, global = true, env = "PARLEY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP and WebSocket listeners.
    Serve {
        /// Host to bind both listeners to.
        #[arg(long, env = "PARLEY_HOST")]
        host: Option<String>,

        /// Main HTTP port.
        #[arg(long, env = "PARLEY_PORT")]
        port: Option<u16>,

        /// First port tried for the dedicated WebSocket listener.
        #[arg(long, env = "PARLEY_WS_PORT")]
        ws_port: Option<u16>,
    },

    /// Run one turn and print the reply.
    Send {
        /// Message text.
        message: String,

        /// Continue an existing session instead of starting a new one.
        #[arg(long)]
        session: Option<String>,

        /// Set (or with "" clear) the session's system prompt first.
        #[arg(long)]
        system_prompt: Option<String>,
    },

    /// Print a session's prompt and recent history.
    Export {
        session_id: String,
    },
}

impl Cli {
    /// Apply global and `serve` flag overrides on top of the file config.
    pub fn apply_overrides(&self, config: &mut ParleyConfig) {
        if let Some(db) = &self.db {
            config.storage.db_path = db.clone();
        }
        if let Some(provider) = &self.provider {
            config.model.provider = provider.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.model.api_key = api_key.clone();
        }

        if let Commands::Serve {
            host,
            port,
            ws_port,
        } = &self.command
        {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            if let Some(ws_port) = ws_port {
                config.server.ws_port = *ws_port;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "parley",
            "--db",
            "/tmp/x.db",
            "--provider",
            "deepseek",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--ws-port",
            "9090",
        ])
        .unwrap();

        let mut config = ParleyConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.storage.db_path, "/tmp/x.db");
        assert_eq!(config.model.provider, "deepseek");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.ws_port, 9090);
    }

    #[test]
    fn test_send_parses_and_keeps_server_defaults() {
        let cli = Cli::try_parse_from([
            "parley",
            "send",
            "hello there",
            "--session",
            "abc",
            "--system-prompt",
            "",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match &cli.command {
            Commands::Send {
                message,
                session,
                system_prompt,
            } => {
                assert_eq!(message, "hello there");
                assert_eq!(session.as_deref(), Some("abc"));
                assert_eq!(system_prompt.as_deref(), Some(""));
            }
            _ => panic!("expected send"),
        }

        let mut config = ParleyConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.server.port, 5000);
    }
}
