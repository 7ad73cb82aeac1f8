//! # freezer-types
//!
//! Document types for the Freezer backup API.
//!
//! This crate provides the types shared by every Freezer crate:
//! - [`Session`], [`JobEntry`] - Session documents and per-job bookkeeping
//! - [`RunStatus`], [`RunResult`] - Status and result values stored in documents
//! - [`generate_session_id`], [`is_valid_id`] - Identifier helpers
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod session;

pub use error::TypesError;
pub use ids::{generate_session_id, is_valid_id, MAX_ID_LEN};
pub use session::{
    hold_off_is_unset, parse_lenient_int, JobEntry, RunResult, RunStatus, Session,
    DEFAULT_HOLD_OFF,
};
