//! HTTP endpoints for freezer-api.
//!
//! Provides session CRUD, job attachment, the session action endpoint,
//! health checks and metrics.

mod actions;
pub mod health;
mod metrics;
mod sessions;

use crate::error::{ApiError, ApiResult};
use crate::server::FreezerApi;
use axum::http::HeaderMap;
use axum::{
    routing::{get, post, put},
    Extension, Router,
};
use freezer_types::is_valid_id;
use std::sync::Arc;

pub use actions::ActionResponse;
pub use health::HealthStatus;

/// Header carrying the owner identity of a request.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Build the HTTP router with all endpoints.
pub fn build_router(api: Arc<FreezerApi>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route(
            "/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/sessions/:session_id",
            get(sessions::get_session)
                .put(sessions::replace_session)
                .patch(sessions::patch_session)
                .delete(sessions::delete_session),
        )
        .route(
            "/sessions/:session_id/jobs/:job_id",
            put(sessions::attach_job).delete(sessions::detach_job),
        )
        .route(
            "/sessions/:session_id/action",
            post(actions::session_action),
        )
        .layer(Extension(api))
}

/// Owner of the request: the `X-User-Id` header, or the configured default.
fn owner(headers: &HeaderMap, api: &FreezerApi) -> String {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| api.config().api.default_user.clone())
}

fn check_id(kind: &str, id: &str) -> ApiResult<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid {kind}: {id:?}")))
    }
}
