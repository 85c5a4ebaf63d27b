//! SQLite-based session storage and statistics.
//!
//! Provides persistent storage for:
//! - Completed study sessions (the local session log)
//! - Session statistics (daily and all-time)
//! - Key-value store for application state (the persisted timer engine)

use std::path::Path;

use chrono::{Local, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::sessions::{SessionRecorder, StudySessionRecord};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_minutes: u64,
    pub today_sessions: u64,
    pub today_minutes: u64,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/studyplan.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("studyplan.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS study_sessions (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                discipline_id    TEXT NOT NULL,
                date             TEXT NOT NULL,
                start_time       TEXT NOT NULL,
                end_time         TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                topic            TEXT,
                notes            TEXT,
                completed        INTEGER NOT NULL DEFAULT 0,
                recorded_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_study_sessions_date ON study_sessions(date, start_time);
            CREATE INDEX IF NOT EXISTS idx_study_sessions_discipline ON study_sessions(discipline_id);",
        )?;
        Ok(())
    }

    /// Record a completed session to the database.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, session: &StudySessionRecord) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO study_sessions
             (discipline_id, date, start_time, end_time, duration_minutes, topic, notes, completed, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session.discipline_id,
                session.date,
                session.start_time,
                session.end_time,
                session.duration_minutes,
                session.topic,
                session.notes,
                session.completed,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Sessions newest first, optionally restricted to one discipline.
    pub fn list_sessions(
        &self,
        discipline_id: Option<&str>,
    ) -> Result<Vec<StudySessionRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, discipline_id, date, start_time, end_time, duration_minutes, topic, notes, completed
             FROM study_sessions
             WHERE ?1 IS NULL OR discipline_id = ?1
             ORDER BY date DESC, start_time DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![discipline_id], |row| {
            Ok(StudySessionRecord {
                id: Some(row.get(0)?),
                discipline_id: row.get(1)?,
                date: row.get(2)?,
                start_time: row.get(3)?,
                end_time: row.get(4)?,
                duration_minutes: row.get(5)?,
                topic: row.get(6)?,
                notes: row.get(7)?,
                completed: row.get(8)?,
            })
        })?;
        rows.collect()
    }

    pub fn last_discipline(&self) -> Result<Option<String>, rusqlite::Error> {
        let result = self.conn.query_row(
            "SELECT discipline_id FROM study_sessions
             ORDER BY date DESC, start_time DESC, id DESC LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn stats_today(&self) -> Result<Stats, rusqlite::Error> {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let (count, minutes) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_minutes), 0)
             FROM study_sessions
             WHERE completed = 1 AND date = ?1",
            params![today],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        Ok(Stats {
            total_sessions: count,
            total_minutes: minutes,
            today_sessions: count,
            today_minutes: minutes,
        })
    }

    pub fn stats_all(&self) -> Result<Stats, rusqlite::Error> {
        let (total_sessions, total_minutes) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_minutes), 0)
             FROM study_sessions
             WHERE completed = 1",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        let today = self.stats_today()?;
        Ok(Stats {
            total_sessions,
            total_minutes,
            today_sessions: today.today_sessions,
            today_minutes: today.today_minutes,
        })
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SessionRecorder for Database {
    fn name(&self) -> &str {
        "local"
    }

    async fn record(&self, session: &StudySessionRecord) -> Result<i64> {
        Ok(self.record_session(session)?)
    }

    async fn last_discipline(&self) -> Result<Option<String>> {
        Ok(Database::last_discipline(self)?)
    }
}
