//! Expiry Sweep Task
//!
//! Background task that periodically purges expired entries from both caches.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::{AppState, SharedCache};

/// Spawns a background task that periodically purges expired cache entries.
///
/// Reads already drop expired entries lazily; the sweep reclaims space held
/// by entries nobody reads again. Each round takes the write lock of one
/// cache at a time.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let state = AppState::from_config(&config);
/// let cleanup_handle = spawn_cleanup_task(state.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(state: AppState, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let local = purge(&state.local).await;
            let session = purge(&state.session).await;

            if local + session > 0 {
                info!(local, session, "Expiry sweep removed entries");
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}

async fn purge(cache: &SharedCache) -> usize {
    cache.write().await.purge_expired()
}
