use crate::config::StorageConfig;
use crate::error::{DilemmaError, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod types;
pub use types::{Choice, DilemmaOption, Session};

/// Storage-side clock, millisecond precision, RFC 3339 with a `Z` suffix
const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

const SESSION_COLUMNS: &str = "id, created_at, completed_at";
const CHOICE_COLUMNS: &str = "id, session_id, dilemma_id, choice, created_at";

fn storage_error(e: anyhow::Error) -> DilemmaError {
    DilemmaError::Storage(format!("{:#}", e))
}

/// Storage backend for sessions and choices
pub struct SqliteStorage {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStorage {
    /// Create a storage instance from configuration
    ///
    /// Uses `database_path` when set, otherwise `dilemma.db` in the user's
    /// data directory.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);

        if let Some(path) = &config.database_path {
            return Self::with_busy_timeout(path, busy_timeout);
        }

        let proj_dirs = ProjectDirs::from("com", "dilemma", "dilemma-machine")
            .ok_or_else(|| DilemmaError::Storage("Could not determine data directory".into()))?;

        Self::with_busy_timeout(proj_dirs.data_dir().join("dilemma.db"), busy_timeout)
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use dilemma_machine::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("dilemma.db")).unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        Self::with_busy_timeout(db_path, Duration::from_millis(5_000))
    }

    /// Create a storage instance with an explicit lock wait
    pub fn with_busy_timeout<P: Into<PathBuf>>(db_path: P, busy_timeout: Duration) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure parent directory exists so opening the DB file succeeds.
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(storage_error)?;
        }

        let storage = Self {
            db_path,
            busy_timeout,
        };
        storage.init()?;
        Ok(storage)
    }

    /// Location of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(storage_error)?;

        conn.busy_timeout(self.busy_timeout)
            .context("Failed to set busy timeout")
            .map_err(storage_error)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")
            .map_err(storage_error)?;

        Ok(conn)
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .context("Failed to enable WAL journal")
            .map_err(storage_error)?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS game_sessions (
                id TEXT PRIMARY KEY NOT NULL,
                created_at TEXT NOT NULL DEFAULT ({now}),
                completed_at TEXT
            );
            CREATE TABLE IF NOT EXISTS dilemma_choices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES game_sessions(id),
                dilemma_id TEXT NOT NULL,
                choice TEXT NOT NULL CHECK (choice IN ('A', 'B')),
                created_at TEXT NOT NULL DEFAULT ({now})
            );
            CREATE INDEX IF NOT EXISTS ix_dilemma_choices_dilemma_id
                ON dilemma_choices (dilemma_id);
            CREATE UNIQUE INDEX IF NOT EXISTS ux_dilemma_choices_session_dilemma
                ON dilemma_choices (session_id, dilemma_id);",
            now = NOW
        ))
        .context("Failed to create tables")
        .map_err(storage_error)?;

        Ok(())
    }

    /// Begin a read-write unit of work
    ///
    /// Takes the database write lock up front (`BEGIN IMMEDIATE`) so the
    /// precondition checks and the following write see the same state.
    pub fn scope(&self) -> Result<StorageScope> {
        self.begin("BEGIN IMMEDIATE")
    }

    /// Begin a read-only unit of work
    pub fn read_scope(&self) -> Result<StorageScope> {
        self.begin("BEGIN DEFERRED")
    }

    fn begin(&self, statement: &str) -> Result<StorageScope> {
        let conn = self.open()?;
        conn.execute_batch(statement)
            .context("Failed to start transaction")
            .map_err(storage_error)?;
        Ok(StorageScope {
            conn,
            finished: false,
        })
    }

    /// Check that the database answers queries
    pub fn ping(&self) -> Result<()> {
        let conn = self.open()?;
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))
            .context("Failed to ping database")
            .map_err(storage_error)?;
        Ok(())
    }
}

/// One logical operation's handle on storage
///
/// Owns a connection with an open transaction. Dropping the scope without
/// calling [`StorageScope::commit`] rolls the transaction back, so every
/// early return through `?` leaves no partial writes behind.
pub struct StorageScope {
    conn: Connection,
    finished: bool,
}

impl StorageScope {
    /// Commit the unit of work
    pub fn commit(mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .context("Failed to commit transaction")
            .map_err(storage_error)?;
        self.finished = true;
        Ok(())
    }

    /// Insert a session row; timestamps are assigned by the database
    pub fn insert_session(&self, id: &str) -> Result<Session> {
        let sql = format!(
            "INSERT INTO game_sessions (id) VALUES (?1) RETURNING {}",
            SESSION_COLUMNS
        );
        let session = self
            .conn
            .query_row(&sql, params![id], session_from_row)
            .context("Failed to insert session")
            .map_err(storage_error)?;
        Ok(session)
    }

    pub fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let sql = format!("SELECT {} FROM game_sessions WHERE id = ?1", SESSION_COLUMNS);
        let session = self
            .conn
            .query_row(&sql, params![id], session_from_row)
            .optional()
            .context("Failed to query session")
            .map_err(storage_error)?;
        Ok(session)
    }

    /// Stamp the completion time; returns `None` if the session is unknown
    ///
    /// The stored value only moves forward: re-completing keeps whichever of
    /// the existing and current timestamps is later.
    pub fn mark_completed(&self, id: &str) -> Result<Option<Session>> {
        let sql = format!(
            "UPDATE game_sessions
                SET completed_at = MAX(COALESCE(completed_at, ''), {now})
              WHERE id = ?1
          RETURNING {cols}",
            now = NOW,
            cols = SESSION_COLUMNS
        );
        let session = self
            .conn
            .query_row(&sql, params![id], session_from_row)
            .optional()
            .context("Failed to update session")
            .map_err(storage_error)?;
        Ok(session)
    }

    /// Insert a choice row
    ///
    /// A violation of the (session, dilemma) unique index surfaces as
    /// [`DilemmaError::Conflict`]; a dangling session reference as
    /// [`DilemmaError::NotFound`].
    pub fn insert_choice(
        &self,
        session_id: &str,
        dilemma_id: &str,
        option: DilemmaOption,
    ) -> Result<Choice> {
        let sql = format!(
            "INSERT INTO dilemma_choices (session_id, dilemma_id, choice)
             VALUES (?1, ?2, ?3)
             RETURNING {}",
            CHOICE_COLUMNS
        );
        let result = self.conn.query_row(
            &sql,
            params![session_id, dilemma_id, option.as_str()],
            choice_from_row,
        );

        match result {
            Ok(choice) => Ok(choice),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(DilemmaError::Conflict(
                    "Choice already recorded for this dilemma".to_string(),
                )
                .into())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Err(DilemmaError::NotFound("Session not found".to_string()).into())
            }
            Err(e) => {
                Err(storage_error(anyhow::Error::new(e).context("Failed to insert choice")).into())
            }
        }
    }

    /// Look up the choice for a (session, dilemma) pair
    pub fn find_choice(&self, session_id: &str, dilemma_id: &str) -> Result<Option<Choice>> {
        let sql = format!(
            "SELECT {} FROM dilemma_choices WHERE session_id = ?1 AND dilemma_id = ?2",
            CHOICE_COLUMNS
        );
        let choice = self
            .conn
            .query_row(&sql, params![session_id, dilemma_id], choice_from_row)
            .optional()
            .context("Failed to query choice")
            .map_err(storage_error)?;
        Ok(choice)
    }

    /// Count choices for a dilemma, optionally only those picking `option`
    pub fn count_choices(&self, dilemma_id: &str, option: Option<DilemmaOption>) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(id) FROM dilemma_choices
                  WHERE dilemma_id = ?1 AND (?2 IS NULL OR choice = ?2)",
                params![dilemma_id, option.map(|o| o.as_str())],
                |r| r.get(0),
            )
            .context("Failed to count choices")
            .map_err(storage_error)?;
        Ok(count.max(0) as u64)
    }

    /// All choices recorded by a session, in insertion order
    pub fn session_choices(&self, session_id: &str) -> Result<Vec<Choice>> {
        let sql = format!(
            "SELECT {} FROM dilemma_choices WHERE session_id = ?1 ORDER BY id",
            CHOICE_COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare statement")
            .map_err(storage_error)?;

        let choices = stmt
            .query_map(params![session_id], choice_from_row)
            .context("Failed to query session choices")
            .map_err(storage_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read session choices")
            .map_err(storage_error)?;

        Ok(choices)
    }
}

impl Drop for StorageScope {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!("Failed to roll back storage scope: {}", e);
            }
        }
    }
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(1)?;
    let completed_at: Option<String> = row.get(2)?;

    Ok(Session {
        id,
        created_at: parse_timestamp(1, &created_at)?,
        completed_at: completed_at
            .as_deref()
            .map(|raw| parse_timestamp(2, raw))
            .transpose()?,
    })
}

fn choice_from_row(row: &Row<'_>) -> rusqlite::Result<Choice> {
    let raw_option: String = row.get(3)?;
    let option = raw_option
        .parse::<DilemmaOption>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let created_at: String = row.get(4)?;

    Ok(Choice {
        id: row.get(0)?,
        session_id: row.get(1)?,
        dilemma_id: row.get(2)?,
        option,
        created_at: parse_timestamp(4, &created_at)?,
    })
}
