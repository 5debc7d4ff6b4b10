use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db::models::AttemptRecord;
use crate::db::{Database, DbError};
use crate::notes::NoteIdentity;

/// Everything the engine knows about one guess, ready to be stamped and
/// persisted.
#[derive(Debug, Clone)]
pub struct AttemptContext<'a> {
    pub task_id: Uuid,
    pub target: NoteIdentity,
    pub guessed: NoteIdentity,
    pub is_correct: bool,
    pub attempt_number: i32,
    pub play_again_count: i32,
    pub note_group: &'a str,
    pub octave_range_low: i32,
    pub octave_range_high: i32,
}

/// Derived per-session aggregate. Never stored; recomputed from the
/// record log on every call so it cannot drift from persisted data.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionStats {
    /// Distinct tasks with a correct record.
    pub completed_tasks: u64,
    /// Correct records whose attempt_number is 1.
    pub first_try_correct: u64,
    /// Every recorded guess, right or wrong.
    pub total_attempts: u64,
    /// first_try_correct / completed_tasks, or 0 with nothing completed.
    pub accuracy: f64,
}

impl SessionStats {
    /// Fold a record set (already filtered to one session) into stats.
    pub fn from_records(records: &[AttemptRecord]) -> Self {
        let mut completed: HashSet<&str> = HashSet::new();
        let mut first_try_correct = 0u64;

        for r in records {
            if r.is_correct {
                completed.insert(r.task_id.as_str());
                if r.attempt_number == 1 {
                    first_try_correct += 1;
                }
            }
        }

        let completed_tasks = completed.len() as u64;
        let accuracy = if completed_tasks > 0 {
            first_try_correct as f64 / completed_tasks as f64
        } else {
            0.0
        };

        Self {
            completed_tasks,
            first_try_correct,
            total_attempts: records.len() as u64,
            accuracy,
        }
    }
}

/// Appends attempt records for one session and computes its running
/// statistics. Owns the open database; the session id is fixed for the
/// recorder's lifetime.
pub struct SessionRecorder {
    db: Database,
    session_id: Uuid,
}

impl SessionRecorder {
    pub fn new(db: Database) -> Self {
        let session_id = Uuid::new_v4();
        log::info!("Session {}", session_id);
        Self { db, session_id }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Stamp and append one attempt. Returns the stored record. The append
    /// is all-or-nothing; on failure nothing was written.
    pub fn record(&self, ctx: &AttemptContext<'_>) -> Result<AttemptRecord, DbError> {
        let record = AttemptRecord {
            session_id: self.session_id.to_string(),
            task_id: ctx.task_id.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            correct_note_name: ctx.target.name.to_string(),
            correct_octave: ctx.target.octave,
            correct_midi: ctx.target.pitch_number(),
            guessed_note_name: ctx.guessed.name.to_string(),
            guessed_octave: ctx.guessed.octave,
            guessed_midi: ctx.guessed.pitch_number(),
            is_correct: ctx.is_correct,
            attempt_number: ctx.attempt_number,
            play_again_count: ctx.play_again_count,
            note_group: ctx.note_group.to_string(),
            octave_range_low: ctx.octave_range_low,
            octave_range_high: ctx.octave_range_high,
        };
        self.db.append_attempt(&record)?;
        Ok(record)
    }

    /// Stats for the active session.
    pub fn stats(&self) -> Result<SessionStats, DbError> {
        self.stats_for(&self.session_id.to_string())
    }

    /// Stats for any recorded session (including ones from previous runs).
    pub fn stats_for(&self, session_id: &str) -> Result<SessionStats, DbError> {
        let records = self.db.session_attempts(session_id)?;
        Ok(SessionStats::from_records(&records))
    }
}
