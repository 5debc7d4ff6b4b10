pub mod models;
pub mod queries;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration failed: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        // WAL mode for better concurrent read performance
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.migrate()?;
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if version < 1 {
            self.migrate_v1()?;
        }

        self.conn.pragma_update(None, "user_version", 1)?;
        Ok(())
    }

    /// V1: the append-only attempt log.
    ///
    /// One row per guess. All attempts of one guessing round share a
    /// task_id; the single is_correct row of a round is always its last.
    fn migrate_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS attempts (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id        TEXT NOT NULL,
                task_id           TEXT NOT NULL,
                timestamp         TEXT NOT NULL,

                -- The note that was played
                correct_note_name TEXT NOT NULL,
                correct_octave    INTEGER NOT NULL,
                correct_midi      INTEGER NOT NULL,

                -- The guess
                guessed_note_name TEXT NOT NULL,
                guessed_octave    INTEGER NOT NULL,
                guessed_midi      INTEGER NOT NULL,

                is_correct        INTEGER NOT NULL,
                attempt_number    INTEGER NOT NULL,
                play_again_count  INTEGER NOT NULL,

                -- Pool configuration at the time of the attempt
                note_group        TEXT NOT NULL,
                octave_range_low  INTEGER NOT NULL,
                octave_range_high INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_attempts_session ON attempts(session_id);
            CREATE INDEX IF NOT EXISTS idx_attempts_task ON attempts(task_id);
            CREATE INDEX IF NOT EXISTS idx_attempts_group ON attempts(note_group);
            ",
        )?;
        Ok(())
    }
}
