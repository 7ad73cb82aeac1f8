//! Session action endpoint.
//!
//! `POST /sessions/{session_id}/action` with a body holding exactly one key,
//! the action name, mapped to its parameters:
//!
//! ```json
//! {"start": {"job_id": "job_id_2", "current_tag": 5}}
//! ```
//!
//! The handler loads the session, runs [`freezer_core::execute`] on an owned
//! copy and stores the result only when the state machine reports a change.
//! The write carries no version check, so two racing `start` events may both
//! advance from the same tag and the later write wins.

use super::{owner, sessions::load};
use crate::error::{ApiError, ApiResult};
use crate::server::{unix_now, FreezerApi};
use axum::body::Bytes;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use freezer_core::{execute, SessionAction};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Response body for an accepted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResponse {
    /// Outcome: "success", "hold-off" or "out-of-sync".
    pub result: String,
    /// Session tag after the action.
    pub session_tag: i64,
}

pub async fn session_action(
    Extension(api): Extension<Arc<FreezerApi>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ActionResponse>)> {
    api.metrics().actions_total.fetch_add(1, Ordering::Relaxed);
    let user_id = owner(&headers, &api);

    match apply_action(&api, &user_id, &session_id, &body).await {
        Ok(response) => Ok((StatusCode::ACCEPTED, Json(response))),
        Err(e) => {
            if matches!(e, ApiError::BadRequest(_) | ApiError::Action(_)) {
                api.metrics().action_rejected.fetch_add(1, Ordering::Relaxed);
            }
            Err(e)
        }
    }
}

async fn apply_action(
    api: &FreezerApi,
    user_id: &str,
    session_id: &str,
    body: &[u8],
) -> ApiResult<ActionResponse> {
    let (name, params) = split_action_body(body)?;
    let action = SessionAction::parse(&name, &params)?;

    let stored = load(api, user_id, session_id).await?;
    let (session, report) = execute(stored.session, &action, unix_now())?;

    if report.need_update {
        api.storage()
            .update_session(user_id, session_id, &session)
            .await?;
    }
    api.metrics().record_outcome(report.outcome);

    tracing::info!(
        session_id,
        action = action.name(),
        job_id = action.job_id(),
        outcome = report.outcome.as_str(),
        session_tag = report.session_tag,
        "Session action applied"
    );

    Ok(ActionResponse {
        result: report.outcome.as_str().to_string(),
        session_tag: report.session_tag,
    })
}

/// Split `{"<action>": {params}}` into the action name and its parameters.
fn split_action_body(body: &[u8]) -> ApiResult<(String, Map<String, Value>)> {
    let bad_format = || ApiError::BadRequest("Bad action request format".into());

    let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) else {
        return Err(bad_format());
    };
    if map.len() != 1 {
        return Err(bad_format());
    }
    match map.into_iter().next() {
        Some((name, Value::Object(params))) => Ok((name, params)),
        _ => Err(bad_format()),
    }
}
