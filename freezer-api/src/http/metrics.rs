//! Prometheus metrics endpoint.

use crate::server::{ApiMetrics, FreezerApi};
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
pub async fn metrics_handler(Extension(api): Extension<Arc<FreezerApi>>) -> impl IntoResponse {
    // Best effort: a storage failure reports zero stored sessions.
    let stored = api.storage().count_sessions().await.unwrap_or(0);

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(api.metrics(), stored),
    )
}

fn render(m: &ApiMetrics, stored_sessions: u64) -> String {
    let actions = m.actions_total.load(Ordering::Relaxed);
    let success = m.action_success.load(Ordering::Relaxed);
    let hold_off = m.action_hold_off.load(Ordering::Relaxed);
    let out_of_sync = m.action_out_of_sync.load(Ordering::Relaxed);
    let rejected = m.action_rejected.load(Ordering::Relaxed);
    let created = m.sessions_created.load(Ordering::Relaxed);

    format!(
        r#"# HELP freezer_api_info Server information
# TYPE freezer_api_info gauge
freezer_api_info{{version="{version}"}} 1

# HELP freezer_api_actions_total Session action requests received
# TYPE freezer_api_actions_total counter
freezer_api_actions_total {actions}

# HELP freezer_api_action_outcomes_total Accepted session actions by outcome
# TYPE freezer_api_action_outcomes_total counter
freezer_api_action_outcomes_total{{outcome="success"}} {success}
freezer_api_action_outcomes_total{{outcome="hold-off"}} {hold_off}
freezer_api_action_outcomes_total{{outcome="out-of-sync"}} {out_of_sync}

# HELP freezer_api_actions_rejected_total Session actions rejected as malformed or unknown
# TYPE freezer_api_actions_rejected_total counter
freezer_api_actions_rejected_total {rejected}

# HELP freezer_api_sessions_created_total Sessions created since startup
# TYPE freezer_api_sessions_created_total counter
freezer_api_sessions_created_total {created}

# HELP freezer_api_sessions_stored Sessions currently in storage
# TYPE freezer_api_sessions_stored gauge
freezer_api_sessions_stored {stored_sessions}
"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}
