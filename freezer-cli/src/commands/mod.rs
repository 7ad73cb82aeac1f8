//! CLI command implementations.

pub mod action;
pub mod job;
pub mod session;
