//! Errors raised while applying a session action.

use thiserror::Error;

/// Caller-visible validation errors for session actions.
///
/// None of these are transient: retrying the same request yields the same
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionActionError {
    /// Malformed request: missing parameter, unknown job, tag ahead of schedule.
    #[error("bad data format: {reason}")]
    BadDataFormat {
        /// What was wrong with the request.
        reason: String,
    },

    /// The action name is not one the session understands.
    #[error("bad action method: {action:?}")]
    MethodNotImplemented {
        /// The action name that was requested.
        action: String,
    },
}

impl SessionActionError {
    pub(crate) fn bad_data(reason: impl Into<String>) -> Self {
        Self::BadDataFormat {
            reason: reason.into(),
        }
    }
}
