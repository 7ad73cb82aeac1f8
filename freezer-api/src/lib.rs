//! # freezer-api
//!
//! REST API server for Freezer backup sessions.
//!
//! This crate implements the HTTP front-end that:
//! - Stores session documents per owner (SQLite)
//! - Exposes CRUD endpoints for sessions and their attached jobs
//! - Accepts `start`/`end` events from backup clients and applies them with
//!   the `freezer-core` state machine
//!
//! ## Architecture
//!
//! ```text
//! backup client ──┐
//!                 │  POST /sessions/{id}/action
//!                 ▼
//!        ┌────────────────────────────┐
//!        │        freezer-api         │
//!        │  load ─► execute ─► store  │
//!        │  ┌─────────────────────┐   │
//!        │  │ SQLite (documents)  │   │
//!        │  └─────────────────────┘   │
//!        └────────────────────────────┘
//! ```
//!
//! The state machine never touches storage. The action handler loads the
//! document, passes an owned copy to [`freezer_core::execute`], and writes
//! the result back only when the machine reports a change.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod storage;
