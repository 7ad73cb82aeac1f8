//! Session actions and their parameters.
//!
//! Clients send an action name with a JSON map of parameters:
//!
//! ```text
//! start: {"job_id": "...", "current_tag": 5}
//! end:   {"job_id": "...", "result": "success"}
//! ```
//!
//! `current_tag` may be sent as an integer or as a string holding one.

use freezer_types::{parse_lenient_int, RunResult};
use serde_json::{Map, Value};

use crate::SessionActionError;

/// HTTP methods reported to callers that request an unknown action.
pub const ALLOWED_METHODS: &str = "GET, POST, HEAD, PATCH, DELETE";

/// A validated session action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// A job is starting; may advance the session round.
    Start {
        /// Job reporting the event.
        job_id: String,
        /// Round the client believes is current.
        current_tag: i64,
    },
    /// A job has finished the current round.
    End {
        /// Job reporting the event.
        job_id: String,
        /// Result reported by the job.
        result: RunResult,
    },
}

impl SessionAction {
    /// Build an action from its name and parameter map.
    ///
    /// # Errors
    ///
    /// - [`SessionActionError::MethodNotImplemented`] for an unknown name
    /// - [`SessionActionError::BadDataFormat`] for a missing or mistyped parameter
    pub fn parse(action: &str, params: &Map<String, Value>) -> Result<Self, SessionActionError> {
        match action {
            "start" => {
                let job_id = job_id_param(params)?;
                let raw_tag = required(params, "current_tag")?;
                let current_tag = parse_lenient_int(raw_tag).ok_or_else(|| {
                    SessionActionError::bad_data(format!(
                        "current_tag is not an integer: {raw_tag}"
                    ))
                })?;
                Ok(Self::Start {
                    job_id,
                    current_tag,
                })
            }
            "end" => {
                let job_id = job_id_param(params)?;
                let result = match required(params, "result")? {
                    Value::String(s) => RunResult::from(s.as_str()),
                    other => {
                        return Err(SessionActionError::bad_data(format!(
                            "result is not a string: {other}"
                        )))
                    }
                };
                Ok(Self::End { job_id, result })
            }
            other => Err(SessionActionError::MethodNotImplemented {
                action: other.to_string(),
            }),
        }
    }

    /// The action name as sent on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::End { .. } => "end",
        }
    }

    /// The job the action refers to.
    pub fn job_id(&self) -> &str {
        match self {
            Self::Start { job_id, .. } | Self::End { job_id, .. } => job_id,
        }
    }
}

fn required<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a Value, SessionActionError> {
    params
        .get(key)
        .ok_or_else(|| SessionActionError::bad_data(format!("missing parameter: {key}")))
}

fn job_id_param(params: &Map<String, Value>) -> Result<String, SessionActionError> {
    match required(params, "job_id")? {
        Value::String(s) => Ok(s.clone()),
        // Numeric job ids are accepted and compared in their decimal form.
        Value::Number(n) => Ok(n.to_string()),
        other => Err(SessionActionError::bad_data(format!(
            "job_id is not a string: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test params must be an object"),
        }
    }

    #[test]
    fn parse_start() {
        let action =
            SessionAction::parse("start", &params(json!({"job_id": "j1", "current_tag": 5})))
                .unwrap();
        assert_eq!(
            action,
            SessionAction::Start {
                job_id: "j1".into(),
                current_tag: 5
            }
        );
        assert_eq!(action.name(), "start");
        assert_eq!(action.job_id(), "j1");
    }

    #[test]
    fn parse_start_with_string_tag() {
        let action =
            SessionAction::parse("start", &params(json!({"job_id": "j1", "current_tag": "7"})))
                .unwrap();
        assert!(matches!(action, SessionAction::Start { current_tag: 7, .. }));
    }

    #[test]
    fn parse_end() {
        let action =
            SessionAction::parse("end", &params(json!({"job_id": "j1", "result": "fail"})))
                .unwrap();
        assert_eq!(
            action,
            SessionAction::End {
                job_id: "j1".into(),
                result: RunResult::Fail
            }
        );
    }

    #[test]
    fn numeric_job_id_is_accepted() {
        let action =
            SessionAction::parse("start", &params(json!({"job_id": 12, "current_tag": 0})))
                .unwrap();
        assert_eq!(action.job_id(), "12");
    }

    #[test]
    fn missing_parameters_are_bad_data() {
        let err = SessionAction::parse("start", &params(json!({"job_id": "j1"}))).unwrap_err();
        assert_eq!(
            err,
            SessionActionError::BadDataFormat {
                reason: "missing parameter: current_tag".into()
            }
        );

        let err = SessionAction::parse("start", &params(json!({"current_tag": 1}))).unwrap_err();
        assert!(matches!(err, SessionActionError::BadDataFormat { .. }));

        let err = SessionAction::parse("end", &params(json!({"job_id": "j1"}))).unwrap_err();
        assert!(matches!(err, SessionActionError::BadDataFormat { .. }));
    }

    #[test]
    fn non_integer_tag_is_bad_data() {
        let err =
            SessionAction::parse("start", &params(json!({"job_id": "j1", "current_tag": "x"})))
                .unwrap_err();
        assert!(matches!(err, SessionActionError::BadDataFormat { .. }));
    }

    #[test]
    fn unknown_action_is_not_implemented() {
        let err = SessionAction::parse("pause", &Map::new()).unwrap_err();
        assert_eq!(
            err,
            SessionActionError::MethodNotImplemented {
                action: "pause".into()
            }
        );
    }
}
