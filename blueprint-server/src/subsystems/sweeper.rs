//! Background eviction of idle sessions.

use blueprint_core::config::SessionConfig;
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::sessions::SessionStore;

/// One sweep pass. Returns the number of evicted sessions.
pub fn sweep_once(store: &SessionStore, config: &SessionConfig) -> usize {
    let ttl = Duration::minutes(config.ttl_minutes as i64);
    let evicted = store.sweep_expired(ttl);
    if evicted > 0 {
        tracing::info!(
            evicted = evicted,
            remaining = store.len(),
            "Expired blueprint sessions evicted"
        );
    }
    evicted
}

/// Called from main.rs to evict sessions idle for longer than the TTL.
pub async fn run_session_sweeper(
    store: Arc<SessionStore>,
    config: SessionConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    if config.ttl_minutes == 0 {
        tracing::info!("Session sweeper disabled (ttl_minutes = 0)");
        return;
    }

    let interval = tokio::time::Duration::from_secs(config.sweep_interval_seconds.max(1));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!(
        ttl_min = config.ttl_minutes,
        interval_secs = config.sweep_interval_seconds,
        "Session sweeper started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_once(&store, &config);
            }
            _ = shutdown.recv() => {
                tracing::info!("Session sweeper shutting down");
                break;
            }
        }
    }
}
