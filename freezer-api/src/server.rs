//! Main FreezerApi server coordination.
//!
//! FreezerApi owns the configuration, the session store and the operational
//! metrics. It is shared by every request handler.

use crate::config::Config;
use crate::error::ServerError;
use crate::http::build_router;
use crate::storage::SessionStore;
use freezer_core::Outcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Operational metrics for monitoring API activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct ApiMetrics {
    /// Total session action requests received.
    pub actions_total: AtomicU64,
    /// Actions answered with "success".
    pub action_success: AtomicU64,
    /// Start actions suppressed by the hold-off window.
    pub action_hold_off: AtomicU64,
    /// Start actions from clients behind the current round.
    pub action_out_of_sync: AtomicU64,
    /// Actions rejected as malformed or unknown.
    pub action_rejected: AtomicU64,
    /// Sessions created.
    pub sessions_created: AtomicU64,
}

impl ApiMetrics {
    /// Count an accepted action by its outcome.
    pub fn record_outcome(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Success => &self.action_success,
            Outcome::HoldOff => &self.action_hold_off,
            Outcome::OutOfSync => &self.action_out_of_sync,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Main API server state.
pub struct FreezerApi {
    config: Config,
    storage: Arc<dyn SessionStore>,
    /// Operational metrics (counters).
    metrics: ApiMetrics,
}

impl std::fmt::Debug for FreezerApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreezerApi")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl FreezerApi {
    /// Create a new FreezerApi with the given config and store.
    pub fn new(config: Config, storage: Arc<dyn SessionStore>) -> Self {
        Self {
            config,
            storage,
            metrics: ApiMetrics::default(),
        }
    }

    /// Get the API configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the session store.
    pub fn storage(&self) -> &dyn SessionStore {
        self.storage.as_ref()
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &ApiMetrics {
        &self.metrics
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(api: Arc<FreezerApi>) -> Result<(), ServerError> {
    let bind_address = api.config().server.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("freezer-api listening on {}", listener.local_addr()?);

    crate::http::health::init_start_time();
    axum::serve(listener, build_router(api))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("freezer-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    #[tokio::test]
    async fn api_exposes_config_and_storage() {
        let storage = Arc::new(SqliteStore::in_memory().await.unwrap());
        let api = FreezerApi::new(Config::default(), storage);

        assert_eq!(api.config().sessions.default_hold_off, 60);
        assert_eq!(api.storage().count_sessions().await.unwrap(), 0);
    }

    #[test]
    fn outcomes_are_counted_separately() {
        let metrics = ApiMetrics::default();
        metrics.record_outcome(Outcome::Success);
        metrics.record_outcome(Outcome::Success);
        metrics.record_outcome(Outcome::HoldOff);
        metrics.record_outcome(Outcome::OutOfSync);

        assert_eq!(metrics.action_success.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.action_hold_off.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.action_out_of_sync.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn unix_now_is_after_2020() {
        assert!(unix_now() > 1_577_836_800);
    }
}
