//! Session CRUD and job attachment endpoints.

use super::{check_id, owner};
use crate::error::{ApiError, ApiResult, StorageError};
use crate::server::FreezerApi;
use crate::storage::StoredSession;
use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::{header::IF_MATCH, HeaderMap, StatusCode};
use axum::{Extension, Json};
use freezer_types::{hold_off_is_unset, parse_lenient_int, Session};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Page size used when a list request gives none.
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Attempts at a versioned read-modify-write before reporting a conflict.
const WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    session_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionWritten {
    session_id: String,
    version: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionList {
    sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    limit: Option<u32>,
    offset: Option<u32>,
}

/// Fields a PATCH may change. The round state belongs to the state machine.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionPatch {
    description: Option<String>,
    hold_off: Option<Value>,
    schedule: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttachRequest {
    client_id: Option<String>,
}

pub async fn create_session(
    Extension(api): Extension<Arc<FreezerApi>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<SessionCreated>)> {
    let user_id = owner(&headers, &api);
    let value = parse_json(&body)?;
    let hold_off_unset = hold_off_is_unset(value.get("hold_off"));

    let mut session = decode_session(value)?;
    session.reset_round_state();
    if hold_off_unset {
        session.hold_off = api.config().sessions.default_hold_off;
    }
    check_session(&session)?;

    let session_id = api.storage().add_session(&user_id, session).await?;
    api.metrics().sessions_created.fetch_add(1, Ordering::Relaxed);
    tracing::info!("Created session {} for user {}", session_id, user_id);

    Ok((StatusCode::CREATED, Json(SessionCreated { session_id })))
}

pub async fn list_sessions(
    Extension(api): Extension<Arc<FreezerApi>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<SessionList>> {
    let user_id = owner(&headers, &api);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(api.config().api.max_page_size);
    let offset = params.offset.unwrap_or(0);

    let sessions = api
        .storage()
        .search_sessions(&user_id, limit, offset)
        .await?
        .into_iter()
        .map(|stored| stored.session)
        .collect();

    Ok(Json(SessionList { sessions }))
}

pub async fn get_session(
    Extension(api): Extension<Arc<FreezerApi>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Session>> {
    let user_id = owner(&headers, &api);
    let stored = load(&api, &user_id, &session_id).await?;
    Ok(Json(stored.session))
}

pub async fn replace_session(
    Extension(api): Extension<Arc<FreezerApi>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<SessionWritten>> {
    let user_id = owner(&headers, &api);
    check_id("session_id", &session_id)?;
    let expected_version = if_match(&headers)?;

    let replacement = decode_session(parse_json(&body)?)?;
    check_session(&replacement)?;

    // The round state is never taken from the client.
    let version = match expected_version {
        Some(expected) => {
            let current = load(&api, &user_id, &session_id).await?.session;
            let mut session = replacement;
            session.keep_round_state(&current);
            api.storage()
                .replace_session(&user_id, &session_id, &session, Some(expected))
                .await?
        }
        None => {
            let (version, _) = modify(&api, &user_id, &session_id, |current| {
                let mut session = replacement.clone();
                session.keep_round_state(current);
                *current = session;
                Ok(true)
            })
            .await?;
            version
        }
    };
    tracing::info!("Replaced session {} (version {})", session_id, version);

    Ok(Json(SessionWritten {
        session_id,
        version,
    }))
}

pub async fn patch_session(
    Extension(api): Extension<Arc<FreezerApi>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<SessionWritten>> {
    let user_id = owner(&headers, &api);
    let patch: SessionPatch = serde_json::from_value(parse_json(&body)?)
        .map_err(|e| ApiError::BadRequest(format!("Bad session patch: {e}")))?;

    let hold_off = patch
        .hold_off
        .as_ref()
        .map(|raw| {
            parse_lenient_int(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("hold_off is not an integer: {raw}")))
        })
        .transpose()?;

    let (version, _) = modify(&api, &user_id, &session_id, |session| {
        if let Some(description) = &patch.description {
            session.description = description.clone();
        }
        if let Some(hold_off) = hold_off {
            session.hold_off = hold_off;
        }
        if let Some(schedule) = &patch.schedule {
            session.schedule = Some(schedule.clone());
        }
        check_session(session)?;
        Ok(true)
    })
    .await?;

    Ok(Json(SessionWritten {
        session_id,
        version,
    }))
}

pub async fn delete_session(
    Extension(api): Extension<Arc<FreezerApi>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    let user_id = owner(&headers, &api);
    if api.storage().delete_session(&user_id, &session_id).await? {
        tracing::info!("Deleted session {}", session_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(&session_id))
    }
}

pub async fn attach_job(
    Extension(api): Extension<Arc<FreezerApi>>,
    headers: HeaderMap,
    Path((session_id, job_id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let user_id = owner(&headers, &api);
    check_id("job_id", &job_id)?;
    let request: AttachRequest = if body.is_empty() {
        AttachRequest::default()
    } else {
        serde_json::from_value(parse_json(&body)?)
            .map_err(|e| ApiError::BadRequest(format!("Bad job attach request: {e}")))?
    };

    let (_, written) = modify(&api, &user_id, &session_id, |session| {
        Ok(session.attach_job(job_id.as_str(), request.client_id.clone()))
    })
    .await?;
    if written {
        tracing::info!("Attached job {} to session {}", job_id, session_id);
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn detach_job(
    Extension(api): Extension<Arc<FreezerApi>>,
    headers: HeaderMap,
    Path((session_id, job_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let user_id = owner(&headers, &api);

    modify(&api, &user_id, &session_id, |session| match session.detach_job(&job_id) {
        Some(_) => Ok(true),
        None => Err(ApiError::NotFound(format!(
            "job {job_id} is not attached to session {session_id}"
        ))),
    })
    .await?;
    tracing::info!("Detached job {} from session {}", job_id, session_id);

    Ok(StatusCode::NO_CONTENT)
}

/// Load a session or fail with 404.
pub(super) async fn load(
    api: &FreezerApi,
    user_id: &str,
    session_id: &str,
) -> ApiResult<StoredSession> {
    api.storage()
        .get_session(user_id, session_id)
        .await?
        .ok_or_else(|| session_not_found(session_id))
}

/// Apply `change` to the stored session and write it back under the version
/// it was read at.
///
/// `change` returns whether anything needs writing. When another write lands
/// in between (an action advancing the round, say), the store reports a
/// version conflict and `change` is applied again to the fresh document.
/// Returns the resulting version and whether a write happened.
async fn modify<F>(
    api: &FreezerApi,
    user_id: &str,
    session_id: &str,
    mut change: F,
) -> ApiResult<(u64, bool)>
where
    F: FnMut(&mut Session) -> ApiResult<bool>,
{
    let mut attempt = 1;
    loop {
        let stored = load(api, user_id, session_id).await?;
        let mut session = stored.session;
        if !change(&mut session)? {
            return Ok((stored.version, false));
        }

        match api
            .storage()
            .replace_session(user_id, session_id, &session, Some(stored.version))
            .await
        {
            Ok(version) => return Ok((version, true)),
            Err(StorageError::VersionConflict { .. }) if attempt < WRITE_ATTEMPTS => {
                tracing::debug!(
                    "Session {} changed during update, retrying ({}/{})",
                    session_id,
                    attempt,
                    WRITE_ATTEMPTS
                );
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn session_not_found(session_id: &str) -> ApiError {
    ApiError::NotFound(format!("session not found: {session_id}"))
}

fn parse_json(body: &[u8]) -> ApiResult<Value> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Bad JSON body: {e}")))
}

fn decode_session(value: Value) -> ApiResult<Session> {
    if !value.is_object() {
        return Err(ApiError::BadRequest(
            "Bad session document: expected a JSON object".into(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| ApiError::BadRequest(format!("Bad session document: {e}")))
}

fn check_session(session: &Session) -> ApiResult<()> {
    if session.hold_off < 0 {
        return Err(ApiError::BadRequest(format!(
            "hold_off must not be negative: {}",
            session.hold_off
        )));
    }
    for job_id in session.jobs.keys() {
        check_id("job_id", job_id)?;
    }
    Ok(())
}

fn if_match(headers: &HeaderMap) -> ApiResult<Option<u64>> {
    let Some(value) = headers.get(IF_MATCH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .map(|v| v.trim().trim_matches('"'))
        .and_then(|v| v.parse().ok())
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest("If-Match must hold a session version".into()))
}
