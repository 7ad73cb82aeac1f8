//! SQLite storage backend for freezer-api.

use super::{SessionStore, StoredSession};
use crate::error::StorageError;
use crate::server::unix_now;
use async_trait::async_trait;
use freezer_types::{generate_session_id, Session};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// SQLite-based session storage.
///
/// Documents are stored as JSON text, one row per session, with a version
/// column bumped on every write. Uses WAL mode for concurrent reads/writes.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("connections", &self.pool.size())
            .finish()
    }
}

impl SqliteStore {
    /// Open (or create) a SQLite store at the given path.
    pub async fn new(path: &Path, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        tracing::info!("Opened session store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(":memory:")?;

        // A single connection that is never recycled: every connection to
        // ":memory:" is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                doc TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_user_created ON sessions(user_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn current_version(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<u64>, StorageError> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM sessions WHERE session_id = ?1 AND user_id = ?2",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(version.map(|v| v as u64))
    }
}

/// Copy of `session` carrying the ids it is stored under.
fn stamped(session: &Session, user_id: &str, session_id: &str) -> Session {
    let mut doc = session.clone();
    doc.session_id = session_id.to_string();
    doc.user_id = user_id.to_string();
    doc
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn add_session(&self, user_id: &str, session: Session) -> Result<String, StorageError> {
        let session_id = generate_session_id();
        let doc = stamped(&session, user_id, &session_id).to_json()?;
        let now = unix_now();

        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, user_id, version, doc, created_at, updated_at)
            VALUES (?1, ?2, 1, ?3, ?4, ?4)
            "#,
        )
        .bind(&session_id)
        .bind(user_id)
        .bind(&doc)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored session {} for user {}", session_id, user_id);
        Ok(session_id)
    }

    async fn get_session(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<StoredSession>, StorageError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT version, doc FROM sessions WHERE session_id = ?1 AND user_id = ?2",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredSession::try_from).transpose()
    }

    async fn search_sessions(
        &self,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<StoredSession>, StorageError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT version, doc
            FROM sessions
            WHERE user_id = ?1
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredSession::try_from).collect()
    }

    async fn update_session(
        &self,
        user_id: &str,
        session_id: &str,
        session: &Session,
    ) -> Result<u64, StorageError> {
        self.replace_session(user_id, session_id, session, None)
            .await
    }

    async fn replace_session(
        &self,
        user_id: &str,
        session_id: &str,
        session: &Session,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError> {
        let doc = stamped(session, user_id, session_id).to_json()?;
        let now = unix_now();

        let version: Option<i64> = match expected_version {
            Some(expected) => {
                sqlx::query_scalar(
                    r#"
                    UPDATE sessions SET doc = ?1, version = version + 1, updated_at = ?2
                    WHERE session_id = ?3 AND user_id = ?4 AND version = ?5
                    RETURNING version
                    "#,
                )
                .bind(&doc)
                .bind(now)
                .bind(session_id)
                .bind(user_id)
                .bind(expected as i64)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    UPDATE sessions SET doc = ?1, version = version + 1, updated_at = ?2
                    WHERE session_id = ?3 AND user_id = ?4
                    RETURNING version
                    "#,
                )
                .bind(&doc)
                .bind(now)
                .bind(session_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        if let Some(version) = version {
            return Ok(version as u64);
        }

        match (self.current_version(user_id, session_id).await?, expected_version) {
            (Some(actual), Some(expected)) => Err(StorageError::VersionConflict {
                session_id: session_id.to_string(),
                expected,
                actual,
            }),
            _ => Err(StorageError::NotFound {
                session_id: session_id.to_string(),
            }),
        }
    }

    async fn delete_session(&self, user_id: &str, session_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_id = ?1 AND user_id = ?2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_sessions(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct SessionRow {
    version: i64,
    doc: String,
}

impl TryFrom<SessionRow> for StoredSession {
    type Error = StorageError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(StoredSession {
            session: Session::from_json(&row.doc)?,
            version: row.version as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freezer_types::RunStatus;

    fn make_session(description: &str) -> Session {
        let mut session = Session::new(description);
        session.attach_job("job_id_1", None);
        session
    }

    #[tokio::test]
    async fn add_session_assigns_id_and_owner() {
        let store = SqliteStore::in_memory().await.unwrap();

        let id = store.add_session("alice", make_session("nightly")).await.unwrap();
        let stored = store.get_session("alice", &id).await.unwrap().unwrap();

        assert_eq!(stored.version, 1);
        assert_eq!(stored.session.session_id, id);
        assert_eq!(stored.session.user_id, "alice");
        assert_eq!(stored.session.description, "nightly");
        assert!(stored.session.job("job_id_1").is_some());
    }

    #[tokio::test]
    async fn sessions_are_scoped_by_owner() {
        let store = SqliteStore::in_memory().await.unwrap();

        let id = store.add_session("alice", make_session("a")).await.unwrap();

        assert!(store.get_session("bob", &id).await.unwrap().is_none());
        assert!(!store.delete_session("bob", &id).await.unwrap());
        let err = store
            .update_session("bob", &id, &make_session("b"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        assert!(store.search_sessions("bob", 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_bumps_version() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = store.add_session("alice", make_session("a")).await.unwrap();

        let mut session = store.get_session("alice", &id).await.unwrap().unwrap().session;
        session.session_tag = 4;
        session.status = RunStatus::Running;

        let v2 = store.update_session("alice", &id, &session).await.unwrap();
        let v3 = store.update_session("alice", &id, &session).await.unwrap();
        assert_eq!(v2, 2);
        assert_eq!(v3, 3);

        let stored = store.get_session("alice", &id).await.unwrap().unwrap();
        assert_eq!(stored.version, 3);
        assert_eq!(stored.session.session_tag, 4);
        assert_eq!(stored.session.status, RunStatus::Running);
    }

    #[tokio::test]
    async fn update_keeps_stored_ids() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = store.add_session("alice", make_session("a")).await.unwrap();

        let mut session = make_session("renamed");
        session.session_id = "something-else".into();
        session.user_id = "mallory".into();
        store.update_session("alice", &id, &session).await.unwrap();

        let stored = store.get_session("alice", &id).await.unwrap().unwrap();
        assert_eq!(stored.session.session_id, id);
        assert_eq!(stored.session.user_id, "alice");
        assert_eq!(stored.session.description, "renamed");
    }

    #[tokio::test]
    async fn replace_checks_expected_version() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = store.add_session("alice", make_session("a")).await.unwrap();

        let v2 = store
            .replace_session("alice", &id, &make_session("b"), Some(1))
            .await
            .unwrap();
        assert_eq!(v2, 2);

        let err = store
            .replace_session("alice", &id, &make_session("c"), Some(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            }
        ));

        let stored = store.get_session("alice", &id).await.unwrap().unwrap();
        assert_eq!(stored.session.description, "b");
    }

    #[tokio::test]
    async fn replace_missing_session_is_not_found() {
        let store = SqliteStore::in_memory().await.unwrap();

        let err = store
            .replace_session("alice", "missing", &make_session("x"), Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn search_pages_in_creation_order() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(
                store
                    .add_session("alice", make_session(&format!("s{i}")))
                    .await
                    .unwrap(),
            );
        }
        store.add_session("bob", make_session("other")).await.unwrap();

        let page = store.search_sessions("alice", 2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].session.session_id, ids[1]);
        assert_eq!(page[1].session.session_id, ids[2]);

        let all = store.search_sessions("alice", 100, 0).await.unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn delete_session() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = store.add_session("alice", make_session("a")).await.unwrap();

        assert!(store.delete_session("alice", &id).await.unwrap());
        assert!(!store.delete_session("alice", &id).await.unwrap());
        assert!(store.get_session("alice", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn count_sessions_spans_owners() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(store.count_sessions().await.unwrap(), 0);

        store.add_session("alice", make_session("a")).await.unwrap();
        store.add_session("bob", make_session("b")).await.unwrap();
        assert_eq!(store.count_sessions().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freezer.db");

        let id = {
            let store = SqliteStore::new(&path, 2).await.unwrap();
            store.add_session("alice", make_session("kept")).await.unwrap()
        };

        let store = SqliteStore::new(&path, 2).await.unwrap();
        let stored = store.get_session("alice", &id).await.unwrap().unwrap();
        assert_eq!(stored.session.description, "kept");
    }
}
