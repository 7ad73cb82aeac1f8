//! Storage layer for freezer-api.
//!
//! Provides owner-scoped session document storage with versioning.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StorageError;
use async_trait::async_trait;
use freezer_types::Session;

/// A session document together with its stored version.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    /// The document.
    pub session: Session,
    /// Version, starting at 1 and bumped by every write.
    pub version: u64,
}

/// Trait for session storage backends.
///
/// Every call is scoped by `user_id`: a session owned by another user is
/// reported as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session.
    ///
    /// Assigns a fresh session id and the owner, and returns the id.
    async fn add_session(&self, user_id: &str, session: Session) -> Result<String, StorageError>;

    /// Get a session by id.
    async fn get_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<StoredSession>, StorageError>;

    /// List sessions in creation order.
    async fn search_sessions(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<StoredSession>, StorageError>;

    /// Overwrite a session without a version check.
    ///
    /// Returns the new version. This is the write used after a session
    /// action: the last writer wins.
    async fn update_session(
        &self,
        user_id: &str,
        session_id: &str,
        session: &Session,
    ) -> Result<u64, StorageError>;

    /// Overwrite a session, optionally checking the stored version first.
    ///
    /// Returns the new version, or [`StorageError::VersionConflict`] if
    /// `expected_version` is given and does not match.
    async fn replace_session(
        &self,
        user_id: &str,
        session_id: &str,
        session: &Session,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError>;

    /// Delete a session.
    ///
    /// Returns `true` if a session was deleted.
    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<bool, StorageError>;

    /// Count stored sessions across all owners.
    async fn count_sessions(&self) -> Result<u64, StorageError>;
}
