//! Storage Cache server
//!
//! Serves a persistent and a session-scoped cache over HTTP.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storage_cache::api::create_router;
use storage_cache::{spawn_cleanup_task, AppState, Config};

/// Main entry point for the storage cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the persistent and session caches
/// 4. Start background expiry sweep
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. On SIGINT/SIGTERM, drain connections, stop the sweep and purge
///    expired entries from local storage once more
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storage_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Storage Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: prefix={}, default_expiry={}ms, eviction_batch={}, quota={:?}, port={}, cleanup_interval={}s",
        config.cache_prefix,
        config.default_expiry_ms,
        config.eviction_batch,
        config.storage_quota_bytes,
        config.server_port,
        config.cleanup_interval
    );

    let state = AppState::from_config(&config);
    info!("Caches initialized");

    let cleanup_handle = spawn_cleanup_task(state.clone(), config.cleanup_interval);

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let signal = wait_for_shutdown().await;
            info!(signal, "Shutdown requested, draining connections");
        })
        .await
        .context("server error")?;

    // Sweep stops before the final purge
    cleanup_handle.abort();
    let purged = state.local.write().await.purge_expired();
    info!(purged, "Server shutdown complete");
    Ok(())
}

async fn interrupted() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Ctrl+C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Resolves with the name of the first termination signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("SIGTERM handler unavailable: {}", e);
            interrupted().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = interrupted() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> &'static str {
    interrupted().await;
    "Ctrl+C"
}
