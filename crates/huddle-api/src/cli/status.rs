//! Store status command.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Display store counts, schema version and configuration.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let stats = state.store().stats().await?;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "store": stats,
            "mailbox_retention": state.config.mailbox_retention,
            "default_language": state.config.default_language,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!("  {} Huddle v{}", style("⚡").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Sessions ──").dim());
    println!("  Running:     {}", style(stats.sessions).bold());
    println!("  Chat users:  {}", stats.chat_users);
    println!("  Web guests:  {}", stats.web_guests);
    if stats.mailbox_messages > 0 {
        println!("  Queued msgs: {}", style(stats.mailbox_messages).yellow());
    }
    println!();

    println!("  {}", style("── System ──").dim());
    println!("  Data dir: {}", style(state.data_dir.display()).dim());
    println!(
        "  Schema:   {}",
        style(stats.schema_version.as_deref().unwrap_or("none")).dim()
    );
    println!(
        "  Mailbox:  {} messages per guest",
        state.config.mailbox_retention
    );
    println!();

    Ok(())
}
