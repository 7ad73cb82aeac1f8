//! # freezer-core
//!
//! Session action state machine for Freezer (no I/O, instant tests).
//!
//! Backup clients report `start` and `end` events against a session. This
//! crate decides how each event changes the session document:
//! - when the session's round counter (`session_tag`) advances
//! - when a duplicate trigger falls inside the hold-off window
//! - when a client is out of sync with the current round
//! - when the whole session is completed and with which result
//!
//! ## Design Philosophy
//!
//! Everything here is **pure**. [`execute`] takes an owned session, an
//! action and the current time, and returns the next session plus a
//! report saying whether it must be persisted. Loading and storing the
//! document, and reading the clock, are the caller's job (`freezer-api`).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod error;
pub mod state;

pub use action::{SessionAction, ALLOWED_METHODS};
pub use error::SessionActionError;
pub use state::{execute, overall_result, ActionReport, Aggregate, Outcome};
