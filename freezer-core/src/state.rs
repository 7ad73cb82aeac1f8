//! Session action state machine.
//!
//! A session is idle, running or completed (its `status`). On top of that
//! there is an implicit hold-off sub-state: for `hold_off` seconds after a
//! round starts, further triggers for the same round are suppressed. It is
//! derived from `now - time_start` and never stored.
//!
//! [`execute`] is a pure function. The caller loads the session, hands over
//! an owned copy, and persists the returned session when
//! [`ActionReport::need_update`] is set. Two concurrent `start` events for
//! the same session may both read the same `session_tag` and both advance
//! it; the last write wins. Callers needing exactly-once advancement must
//! retry on a version conflict at the storage layer.

use freezer_types::{JobEntry, RunResult, RunStatus, Session};

use crate::{SessionAction, SessionActionError};

/// Outcome of an accepted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event was recorded.
    Success,
    /// A trigger for the current round arrived inside the hold-off window.
    HoldOff,
    /// The client's tag is behind the session and the window has expired.
    OutOfSync,
}

impl Outcome {
    /// The string reported to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::HoldOff => "hold-off",
            Self::OutOfSync => "out-of-sync",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What [`execute`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionReport {
    /// Outcome reported to the client.
    pub outcome: Outcome,
    /// Session tag after the action.
    pub session_tag: i64,
    /// Whether the returned session differs from the input and must be stored.
    pub need_update: bool,
}

/// Aggregate state of all jobs in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// At least one job has not completed.
    Running,
    /// Every job completed, at least one without success.
    Fail,
    /// Every job completed successfully.
    Success,
}

impl Aggregate {
    /// The session result for a finished aggregate.
    fn as_result(self) -> Option<RunResult> {
        match self {
            Self::Running => None,
            Self::Fail => Some(RunResult::Fail),
            Self::Success => Some(RunResult::Success),
        }
    }
}

/// Apply an action to a session at time `now` (Unix seconds).
///
/// Returns the next session state and a report. When the report says
/// `need_update == false` the returned session is identical to the input.
///
/// # Errors
///
/// [`SessionActionError::BadDataFormat`] if a `start` requests a tag ahead
/// of the session, or if the event must record a job that is not attached.
/// No mutation is applied when an error is returned.
pub fn execute(
    session: Session,
    action: &SessionAction,
    now: i64,
) -> Result<(Session, ActionReport), SessionActionError> {
    match action {
        SessionAction::Start {
            job_id,
            current_tag,
        } => start(session, job_id, *current_tag, now),
        SessionAction::End { job_id, result } => end(session, job_id, result, now),
    }
}

fn start(
    mut session: Session,
    job_id: &str,
    current_tag: i64,
    now: i64,
) -> Result<(Session, ActionReport), SessionActionError> {
    let elapsed = now.saturating_sub(session.time_start);
    let session_tag = session.session_tag;

    if current_tag > session_tag {
        return Err(SessionActionError::bad_data(format!(
            "requested tag value too high: requested {current_tag}, session is at {session_tag}"
        )));
    }

    // Inside the hold-off window (inclusive).
    if elapsed <= session.hold_off {
        if current_tag < session_tag {
            // Catching up with a round that already started.
            mark_job_started(&mut session, job_id, now)?;
            return Ok(report(session, Outcome::Success, true));
        }
        return Ok(report(session, Outcome::HoldOff, false));
    }

    if current_tag != session_tag {
        return Ok(report(session, Outcome::OutOfSync, false));
    }

    mark_job_started(&mut session, job_id, now)?;
    session.session_tag = session_tag.saturating_add(1);
    session.time_start = now;
    session.status = RunStatus::Running;
    session.result = RunResult::Pending;
    Ok(report(session, Outcome::Success, true))
}

fn end(
    mut session: Session,
    job_id: &str,
    result: &RunResult,
    now: i64,
) -> Result<(Session, ActionReport), SessionActionError> {
    let job = job_entry(&mut session, job_id)?;
    job.status = RunStatus::Completed;
    job.result = result.clone();
    job.time_ended = now;

    if session.status != RunStatus::Completed {
        if let Some(result) = overall_result(&session).as_result() {
            session.time_end = now;
            session.result = result;
            session.status = RunStatus::Completed;
        }
    }

    Ok(report(session, Outcome::Success, true))
}

/// Compute the aggregate state over every job in the session.
///
/// Any job that has not completed makes the session `Running`. Otherwise a
/// single completed job without a success result makes it `Fail`. An empty
/// job map counts as `Success`.
pub fn overall_result(session: &Session) -> Aggregate {
    let mut aggregate = Aggregate::Success;
    for job in session.jobs.values() {
        if !job.is_completed() {
            return Aggregate::Running;
        }
        if !job.result.is_success() {
            aggregate = Aggregate::Fail;
        }
    }
    aggregate
}

fn job_entry<'a>(
    session: &'a mut Session,
    job_id: &str,
) -> Result<&'a mut JobEntry, SessionActionError> {
    session.jobs.get_mut(job_id).ok_or_else(|| {
        SessionActionError::bad_data(format!("job_id not found in session: {job_id}"))
    })
}

fn mark_job_started(
    session: &mut Session,
    job_id: &str,
    now: i64,
) -> Result<(), SessionActionError> {
    let job = job_entry(session, job_id)?;
    job.status = RunStatus::Running;
    job.result = RunResult::Pending;
    job.time_started = now;
    Ok(())
}

fn report(session: Session, outcome: Outcome, need_update: bool) -> (Session, ActionReport) {
    let session_tag = session.session_tag;
    (
        session,
        ActionReport {
            outcome,
            session_tag,
            need_update,
        },
    )
}
