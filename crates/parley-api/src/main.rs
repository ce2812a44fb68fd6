//! Parley CLI and relay server entry point.
//!
//! Binary name: `parley`
//!
//! Loads configuration, applies CLI overrides, opens the conversation store
//! and the model gateway, then runs the listeners or a one-shot command.

mod cli;
mod http;
mod serve;
mod state;

use clap::Parser;

use cli::{Cli, Commands};
use parley_infra::config::load_config;
use parley_observe::tracing_setup::{filter_for_verbosity, init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(filter_for_verbosity(cli.verbose, cli.quiet), cli.otel)
        .map_err(|e| anyhow::anyhow!(e))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(&cli.config).await;
    cli.apply_overrides(&mut config);

    let state = AppState::init(config).await?;

    match &cli.command {
        Commands::Serve { .. } => {
            serve::run(state, cli.quiet).await?;
        }

        Commands::Send {
            message,
            session,
            system_prompt,
        } => {
            cli::session::send(
                &state,
                message,
                session.as_deref(),
                system_prompt.as_deref(),
                cli.json,
            )
            .await?;
        }

        Commands::Export { session_id } => {
            cli::session::export(&state, session_id, cli.json).await?;
        }
    }

    Ok(())
}
