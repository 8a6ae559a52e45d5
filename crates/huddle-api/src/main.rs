//! Huddle CLI and web channel entry point.
//!
//! Binary name: `huddle`
//!
//! Parses CLI arguments, sets up logging, opens the store (running pending
//! schema upgrades) and dispatches to the command handler or the HTTP server.

mod cli;
mod http;
mod state;

use clap::Parser;
use huddle_observe::tracing_setup::{LogFormat, env_filter, init_tracing_with_filter, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,huddle_api=debug,huddle_infra=debug,huddle_core=debug",
        _ => "trace",
    };
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing_with_filter(format, cli.otel, env_filter(directive))
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;

    match cli.command {
        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Migrate => {
            let stats = state.store().stats().await?;
            let version = stats.schema_version.unwrap_or_default();
            if cli.json {
                println!("{}", serde_json::json!({ "schema_version": version }));
            } else {
                println!(
                    "  {} Schema at version {}",
                    console::style("✓").green(),
                    console::style(version).bold()
                );
            }
        }

        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| state.config.http_host.clone());
            let port = port.unwrap_or(state.config.http_port);
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            tracing::info!(%addr, "web channel listening");
            if !cli.quiet {
                println!(
                    "  {} Huddle listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!("server stopped");
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
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
