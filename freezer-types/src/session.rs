//! Session documents.
//!
//! A session groups backup jobs that are triggered together in rounds. The
//! document is stored as JSON; integer fields written by older clients as
//! strings are normalized to integers when the document is decoded.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::TypesError;

/// Default hold-off window in seconds.
pub const DEFAULT_HOLD_OFF: i64 = 60;

/// Status of a session or of one of its jobs.
///
/// Stored as a plain string. Values other than the ones the state machine
/// understands are preserved in [`RunStatus::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    /// Not started yet (`""`).
    #[default]
    Idle,
    /// A round is in progress (`"running"`).
    Running,
    /// Finished (`"completed"`).
    Completed,
    /// Any caller-defined value.
    Other(String),
}

impl RunStatus {
    /// The string stored in documents.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" => Self::Idle,
            "running" => Self::Running,
            "completed" => Self::Completed,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for RunStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a session or of one of its jobs.
///
/// Stored as a plain string. Clients may report results other than
/// `"success"` and `"fail"` (for example `"aborted"`); those are kept in
/// [`RunResult::Other`] and count as failures when aggregating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunResult {
    /// No result yet (`""`).
    #[default]
    Pending,
    /// `"success"`
    Success,
    /// `"fail"`
    Fail,
    /// Any other reported value.
    Other(String),
}

impl RunResult {
    /// The string stored in documents.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "",
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Other(s) => s,
        }
    }

    /// Check if this is a success result.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<String> for RunResult {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" => Self::Pending,
            "success" => Self::Success,
            "fail" => Self::Fail,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for RunResult {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<RunResult> for String {
    fn from(result: RunResult) -> Self {
        match result {
            RunResult::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job's participation in the current session round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEntry {
    /// Client that runs the job, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Job status for the current round.
    #[serde(default)]
    pub status: RunStatus,
    /// Job result for the current round.
    #[serde(default)]
    pub result: RunResult,
    /// Unix timestamp of the last `start` event.
    #[serde(default, deserialize_with = "lenient_int")]
    pub time_started: i64,
    /// Unix timestamp of the last `end` event.
    #[serde(default, deserialize_with = "lenient_int")]
    pub time_ended: i64,
}

impl JobEntry {
    /// Create an idle job entry.
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client_id,
            ..Self::default()
        }
    }

    /// Check if the job finished the current round.
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// A session document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Identifier assigned on creation.
    #[serde(default)]
    pub session_id: String,
    /// Owner of the document.
    #[serde(default)]
    pub user_id: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Minimum spacing in seconds between tag-advancing triggers.
    #[serde(default = "default_hold_off", deserialize_with = "lenient_hold_off")]
    pub hold_off: i64,
    /// Round counter. Never decreases.
    #[serde(default, deserialize_with = "lenient_int")]
    pub session_tag: i64,
    /// Unix timestamp of the most recent trigger (0 if never triggered).
    #[serde(default, deserialize_with = "lenient_int")]
    pub time_start: i64,
    /// Unix timestamp of the last completion.
    #[serde(default, deserialize_with = "lenient_int")]
    pub time_end: i64,
    /// Session status.
    #[serde(default)]
    pub status: RunStatus,
    /// Aggregate result, set on completion.
    #[serde(default)]
    pub result: RunResult,
    /// Scheduling information, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<serde_json::Value>,
    /// Attached jobs keyed by job id.
    #[serde(default)]
    pub jobs: BTreeMap<String, JobEntry>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            user_id: String::new(),
            description: String::new(),
            hold_off: DEFAULT_HOLD_OFF,
            session_tag: 0,
            time_start: 0,
            time_end: 0,
            status: RunStatus::Idle,
            result: RunResult::Pending,
            schedule: None,
            jobs: BTreeMap::new(),
        }
    }
}

impl Session {
    /// Create an empty session with the given description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Get a job entry.
    pub fn job(&self, job_id: &str) -> Option<&JobEntry> {
        self.jobs.get(job_id)
    }

    /// Attach a job to the session.
    ///
    /// Returns `false` if the job was already attached, in which case the
    /// existing entry is left as it is.
    pub fn attach_job(&mut self, job_id: impl Into<String>, client_id: Option<String>) -> bool {
        let job_id = job_id.into();
        if self.jobs.contains_key(&job_id) {
            return false;
        }
        self.jobs.insert(job_id, JobEntry::new(client_id));
        true
    }

    /// Detach a job from the session.
    pub fn detach_job(&mut self, job_id: &str) -> Option<JobEntry> {
        self.jobs.remove(job_id)
    }

    /// Clear the round state (tag, timestamps, status, result).
    ///
    /// Used when a session is created from a client-supplied body.
    pub fn reset_round_state(&mut self) {
        self.session_tag = 0;
        self.time_start = 0;
        self.time_end = 0;
        self.status = RunStatus::Idle;
        self.result = RunResult::Pending;
    }

    /// Copy the round state (tag, timestamps, status, result) from `current`.
    ///
    /// Used when a client replaces a stored document: the round state stays
    /// owned by the action state machine.
    pub fn keep_round_state(&mut self, current: &Session) {
        self.session_tag = current.session_tag;
        self.time_start = current.time_start;
        self.time_end = current.time_end;
        self.status = current.status.clone();
        self.result = current.result.clone();
    }

    /// Decode a session from JSON.
    pub fn from_json(json: &str) -> Result<Self, TypesError> {
        serde_json::from_str(json).map_err(TypesError::Deserialization)
    }

    /// Encode the session as JSON.
    pub fn to_json(&self) -> Result<String, TypesError> {
        serde_json::to_string(self).map_err(TypesError::Serialization)
    }
}

fn default_hold_off() -> i64 {
    DEFAULT_HOLD_OFF
}

/// Interpret a JSON value as an integer.
///
/// Accepts integers and strings holding an integer (surrounding whitespace is
/// ignored). Returns `None` for anything else.
pub fn parse_lenient_int(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whether a raw `hold_off` value counts as unset (absent, null or blank).
pub fn hold_off_is_unset(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_int_or_unset(deserializer)?.unwrap_or(0))
}

/// Like `lenient_int`, but an unset value falls back to [`DEFAULT_HOLD_OFF`].
fn lenient_hold_off<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_int_or_unset(deserializer)?.unwrap_or(DEFAULT_HOLD_OFF))
}

fn lenient_int_or_unset<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match Option::<IntOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrString::Int(v)) => Ok(Some(v)),
        Some(IntOrString::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(IntOrString::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_uses_defaults() {
        let session = Session::from_json("{}").unwrap();
        assert_eq!(session.hold_off, DEFAULT_HOLD_OFF);
        assert_eq!(session.session_tag, 0);
        assert_eq!(session.time_start, 0);
        assert_eq!(session.status, RunStatus::Idle);
        assert_eq!(session.result, RunResult::Pending);
        assert!(session.jobs.is_empty());
    }

    #[test]
    fn string_integers_are_normalized() {
        let session = Session::from_json(
            r#"{"session_tag": "5", "hold_off": " 30 ", "time_start": "", "time_end": null}"#,
        )
        .unwrap();
        assert_eq!(session.session_tag, 5);
        assert_eq!(session.hold_off, 30);
        assert_eq!(session.time_start, 0);
        assert_eq!(session.time_end, 0);
    }

    #[test]
    fn keep_round_state_copies_only_round_fields() {
        let mut current = Session::new("stored");
        current.session_tag = 7;
        current.time_start = 100;
        current.time_end = 90;
        current.status = RunStatus::Running;
        current.result = RunResult::Fail;

        let mut replacement = Session::new("replacement");
        replacement.session_tag = 2;
        replacement.hold_off = 5;
        replacement.keep_round_state(&current);

        assert_eq!(replacement.session_tag, 7);
        assert_eq!(replacement.time_start, 100);
        assert_eq!(replacement.time_end, 90);
        assert_eq!(replacement.status, RunStatus::Running);
        assert_eq!(replacement.result, RunResult::Fail);
        assert_eq!(replacement.description, "replacement");
        assert_eq!(replacement.hold_off, 5);
    }

    #[test]
    fn unset_hold_off_falls_back_to_default() {
        for raw in [r#"{"hold_off": null}"#, r#"{"hold_off": ""}"#, r#"{"hold_off": "  "}"#] {
            let session = Session::from_json(raw).unwrap();
            assert_eq!(session.hold_off, DEFAULT_HOLD_OFF, "document: {raw}");
        }

        let session = Session::from_json(r#"{"hold_off": 0}"#).unwrap();
        assert_eq!(session.hold_off, 0);
    }

    #[test]
    fn hold_off_unset_detection() {
        assert!(hold_off_is_unset(None));
        assert!(hold_off_is_unset(Some(&json!(null))));
        assert!(hold_off_is_unset(Some(&json!(" "))));
        assert!(!hold_off_is_unset(Some(&json!(0))));
        assert!(!hold_off_is_unset(Some(&json!("15"))));
    }

    #[test]
    fn non_integer_tag_is_rejected() {
        let err = Session::from_json(r#"{"session_tag": "five"}"#).unwrap_err();
        assert!(matches!(err, TypesError::Deserialization(_)));
    }

    #[test]
    fn status_strings_map_to_variants() {
        assert_eq!(RunStatus::from(""), RunStatus::Idle);
        assert_eq!(RunStatus::from("running"), RunStatus::Running);
        assert_eq!(RunStatus::from("completed"), RunStatus::Completed);
        assert_eq!(RunStatus::from("active"), RunStatus::Other("active".into()));
        assert_eq!(RunStatus::Other("active".into()).as_str(), "active");
    }

    #[test]
    fn result_strings_map_to_variants() {
        assert_eq!(RunResult::from(""), RunResult::Pending);
        assert_eq!(RunResult::from("success"), RunResult::Success);
        assert_eq!(RunResult::from("fail"), RunResult::Fail);
        assert_eq!(RunResult::from("aborted"), RunResult::Other("aborted".into()));
        assert!(RunResult::Success.is_success());
        assert!(!RunResult::Other("aborted".into()).is_success());
    }

    #[test]
    fn document_serializes_with_plain_strings() {
        let mut session = Session::new("nightly");
        session.status = RunStatus::Running;
        session.attach_job("job_id_2", Some("client-a".into()));

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["status"], json!("running"));
        assert_eq!(value["result"], json!(""));
        assert_eq!(value["hold_off"], json!(60));
        assert_eq!(value["jobs"]["job_id_2"]["client_id"], json!("client-a"));
        assert_eq!(value["jobs"]["job_id_2"]["status"], json!(""));
        assert!(value.get("schedule").is_none());
    }

    #[test]
    fn attach_is_idempotent() {
        let mut session = Session::default();
        assert!(session.attach_job("a", None));
        session.jobs.get_mut("a").unwrap().status = RunStatus::Running;

        assert!(!session.attach_job("a", Some("other".into())));
        assert_eq!(session.job("a").unwrap().status, RunStatus::Running);
        assert_eq!(session.job("a").unwrap().client_id, None);
    }

    #[test]
    fn detach_removes_entry() {
        let mut session = Session::default();
        session.attach_job("a", None);
        assert!(session.detach_job("a").is_some());
        assert!(session.detach_job("a").is_none());
        assert!(session.job("a").is_none());
    }

    #[test]
    fn reset_clears_round_state_but_keeps_jobs() {
        let mut session = Session::default();
        session.session_tag = 9;
        session.time_start = 100;
        session.time_end = 200;
        session.status = RunStatus::Completed;
        session.result = RunResult::Fail;
        session.attach_job("a", None);

        session.reset_round_state();

        assert_eq!(session.session_tag, 0);
        assert_eq!(session.time_start, 0);
        assert_eq!(session.time_end, 0);
        assert_eq!(session.status, RunStatus::Idle);
        assert_eq!(session.result, RunResult::Pending);
        assert!(session.job("a").is_some());
    }

    #[test]
    fn lenient_int_values() {
        assert_eq!(parse_lenient_int(&json!(4)), Some(4));
        assert_eq!(parse_lenient_int(&json!("4")), Some(4));
        assert_eq!(parse_lenient_int(&json!(" -2 ")), Some(-2));
        assert_eq!(parse_lenient_int(&json!("x")), None);
        assert_eq!(parse_lenient_int(&json!(1.5)), None);
        assert_eq!(parse_lenient_int(&json!(null)), None);
    }
}
