//! `parley serve`: bind both listeners and run them until shutdown.

use std::io;

use console::style;
use tokio::net::TcpListener;

use crate::http::router::{build_router, build_ws_router};
use crate::state::AppState;

/// Consecutive ports tried for the dedicated WebSocket listener.
pub const WS_PORT_ATTEMPTS: u16 = 20;

/// Bind `host:first_port`, moving to the next port while binding fails.
///
/// Returns the listener and the port it is bound to, or the last bind error
/// once `attempts` ports have been tried.
pub async fn bind_with_retry(
    host: &str,
    first_port: u16,
    attempts: u16,
) -> io::Result<(TcpListener, u16)> {
    let mut last_err = io::Error::new(io::ErrorKind::AddrNotAvailable, "no port attempted");

    for offset in 0..attempts {
        let Some(port) = first_port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                let port = listener.local_addr()?.port();
                return Ok((listener, port));
            }
            Err(err) => {
                tracing::debug!(port, "Port unavailable: {err}");
                last_err = err;
            }
        }
    }

    Err(last_err)
}

/// Run the main and WebSocket listeners until Ctrl+C or SIGTERM.
pub async fn run(state: AppState, quiet: bool) -> anyhow::Result<()> {
    let host = state.config.server.host.clone();
    let port = state.config.server.port;

    let listener = TcpListener::bind((host.as_str(), port)).await?;
    let main_port = listener.local_addr()?.port();

    let ws_listener =
        match bind_with_retry(&host, state.config.server.ws_port, WS_PORT_ATTEMPTS).await {
            Ok((ws_listener, ws_port)) => {
                if ws_port != state.config.server.ws_port {
                    tracing::info!(
                        requested = state.config.server.ws_port,
                        ws_port,
                        "WebSocket port in use, bound the next free one"
                    );
                }
                Some((ws_listener, ws_port))
            }
            Err(err) => {
                tracing::warn!(
                    first_port = state.config.server.ws_port,
                    attempts = WS_PORT_ATTEMPTS,
                    "No WebSocket port available, /ws stays on the main listener: {err}"
                );
                None
            }
        };

    let ws_port = ws_listener.as_ref().map_or(main_port, |(_, port)| *port);
    let state = state.with_ws_port(ws_port);
    let shutdown = state.shutdown.clone();

    if !quiet {
        println!();
        println!(
            "  {} Parley listening on {}",
            style("⚡").bold(),
            style(format!("http://{host}:{main_port}")).cyan()
        );
        println!(
            "  {} WebSocket relay on {}",
            style("↔").bold(),
            style(format!("ws://{host}:{ws_port}/ws")).cyan()
        );
        println!(
            "  {} {}",
            style("model").dim(),
            state.orchestrator.gateway_name()
        );
        println!("  {}", style("Press Ctrl+C to stop").dim());
        println!();
    }

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        signal_token.cancel();
    });

    let ws_server = ws_listener.map(|(ws_listener, _)| {
        let router = build_ws_router(state.clone());
        let token = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(ws_listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
        })
    });

    let result = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await;
    // The main listener stopping for any reason takes the WebSocket one down too.
    shutdown.cancel();

    if let Some(ws_server) = ws_server {
        match ws_server.await {
            Ok(Err(err)) => tracing::warn!("WebSocket listener failed: {err}"),
            Err(err) => tracing::warn!("WebSocket listener task failed: {err}"),
            Ok(Ok(())) => {}
        }
    }
    result?;

    if !quiet {
        println!("\n  Server stopped.");
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
