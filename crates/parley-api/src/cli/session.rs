//! One-shot turn and session export commands.

use anyhow::Result;
use console::style;

use parley_core::store::ConversationStore;

use crate::state::AppState;

/// Run a single turn through the orchestrator and print the reply.
pub async fn send(
    state: &AppState,
    message: &str,
    session_id: Option<&str>,
    system_prompt: Option<&str>,
    json: bool,
) -> Result<()> {
    let outcome = state
        .orchestrator
        .handle_turn(session_id.unwrap_or_default(), message, system_prompt)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    println!("  {}", outcome.reply);
    println!();
    println!(
        "  {} {}",
        style("session").dim(),
        style(&outcome.session_id).cyan()
    );
    println!();
    Ok(())
}

/// Print the session's effective prompt and recent history.
pub async fn export(state: &AppState, session_id: &str, json: bool) -> Result<()> {
    let export = state.export_session(session_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&export)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style("Session").bold(),
        style(&export.session_id).cyan()
    );
    if let Some(session) = state
        .orchestrator
        .store()
        .get_session(&export.session_id)
        .await?
    {
        println!(
            "  {} {}",
            style("updated").dim(),
            session.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!();
    println!(
        "  {} {}",
        style("prompt").dim(),
        export.system_prompt.as_deref().unwrap_or_default()
    );
    println!();

    if export.messages.is_empty() {
        println!("  {}", style("No messages yet.").dim());
    }
    for turn in &export.messages {
        println!("  {:>9}  {}", style(turn.role.to_string()).yellow(), turn.content);
    }
    println!();
    Ok(())
}
