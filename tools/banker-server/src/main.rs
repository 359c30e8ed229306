//! Banker Server entry point

use anyhow::Context;
use banker_server::{app, AppState, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let addr = config.socket_addr();
    info!(
        %addr,
        max_sessions = config.max_sessions,
        rr_iteration_limit = config.engine.round_robin_iteration_limit,
        starvation_threshold = config.engine.starvation_threshold,
        "Starting Banker server"
    );

    let app = app(AppState::new(config));

    println!("╔═══════════════════════════════════════════════════╗");
    println!("║                  Banker Server                    ║");
    println!("╠═══════════════════════════════════════════════════╣");
    println!("║  URL: http://{:<37}║", addr);
    println!("║  Press Ctrl+C to stop                             ║");
    println!("╚═══════════════════════════════════════════════════╝");
    println!();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Banker server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
