//! Gamehub Engine - Main entry point.

use std::sync::Arc;

use gamehub_engine::games::SecretMooseFactory;
use gamehub_engine::{api, Hub, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may be run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gamehub_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gamehub Engine");

    let config = ServerConfig::from_env();
    tracing::info!(
        keep_alive = ?config.hub.keep_alive,
        write_deadline = ?config.hub.write_deadline,
        idle_eviction = ?config.hub.idle_eviction,
        "Hub configured"
    );

    let hub = Hub::new(config.hub.clone(), Arc::new(SecretMooseFactory));
    hub.spawn_reaper();

    let router = api::router(hub.clone(), &config);

    // Start server
    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if hub.shutdown(config.shutdown_timeout).await {
        tracing::info!("Shutdown complete");
    } else {
        tracing::warn!("Shutdown finished with tasks still running");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
