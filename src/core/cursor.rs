//! Feed cursor persistence.
//!
//! The cursor is the dedup boundary: the last episode id accepted for each
//! feed. The physical table keeps `(feed_id, episode_id)` pairs (the schema
//! the original deployment already has on disk), but the store only ever
//! exposes the current episode per feed via insert-if-absent-else-update.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use crate::error::StorageError;

/// Answers "is this episode new for this feed?" and records acceptance.
///
/// Implementations must make `upsert` idempotent: repeating the same
/// `(feed_id, episode_id)` pair is observationally a no-op.
pub trait CursorStore: Send + Sync {
    /// The currently recorded episode for the feed, or `None` if the feed
    /// has never been seen.
    fn get(&self, feed_id: i64) -> Result<Option<i64>, StorageError>;

    /// Insert the feed's cursor if absent, else overwrite it.
    fn upsert(&self, feed_id: i64, episode_id: i64) -> Result<(), StorageError>;
}

/// SQLite-backed cursor store.
///
/// The connection sits behind a mutex, which gives single-writer-per-feed
/// for free; feeds never contend on the same row since keys are disjoint.
pub struct SqliteCursorStore {
    conn: Mutex<Connection>,
}

impl SqliteCursorStore {
    /// Open (or create) the cursor database at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS podcast_episodes (
                feed_id INTEGER,
                episode_id INTEGER,
                PRIMARY KEY (feed_id, episode_id)
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl CursorStore for SqliteCursorStore {
    fn get(&self, feed_id: i64) -> Result<Option<i64>, StorageError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Unavailable("cursor store lock poisoned".to_string()))?;

        let episode_id = conn
            .query_row(
                "SELECT episode_id FROM podcast_episodes WHERE feed_id = ?1",
                [feed_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(episode_id)
    }

    fn upsert(&self, feed_id: i64, episode_id: i64) -> Result<(), StorageError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::Unavailable("cursor store lock poisoned".to_string()))?;

        let updated = conn.execute(
            "UPDATE podcast_episodes SET episode_id = ?2 WHERE feed_id = ?1",
            [feed_id, episode_id],
        )?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO podcast_episodes (feed_id, episode_id) VALUES (?1, ?2)",
                [feed_id, episode_id],
            )?;
        }

        Ok(())
    }
}
