use super::models::{
    AttemptRecord, GroupPerformance, NoteDifficulty, OverallTotals, SessionSummary,
};
use super::{Database, Result};
use rusqlite::params;

impl Database {
    /// Append one attempt to the log. Synchronous: returns only after the
    /// row is durable, so rows land in submission order.
    pub fn append_attempt(&self, r: &AttemptRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO attempts (
                session_id, task_id, timestamp,
                correct_note_name, correct_octave, correct_midi,
                guessed_note_name, guessed_octave, guessed_midi,
                is_correct, attempt_number, play_again_count,
                note_group, octave_range_low, octave_range_high
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15
            )",
            params![
                r.session_id, r.task_id, r.timestamp,
                r.correct_note_name, r.correct_octave, r.correct_midi,
                r.guessed_note_name, r.guessed_octave, r.guessed_midi,
                r.is_correct, r.attempt_number, r.play_again_count,
                r.note_group, r.octave_range_low, r.octave_range_high,
            ],
        )?;
        Ok(())
    }

    /// All attempts of one session, in the order they were submitted.
    pub fn session_attempts(&self, session_id: &str) -> Result<Vec<AttemptRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id, task_id, timestamp,
                    correct_note_name, correct_octave, correct_midi,
                    guessed_note_name, guessed_octave, guessed_midi,
                    is_correct, attempt_number, play_again_count,
                    note_group, octave_range_low, octave_range_high
             FROM attempts
             WHERE session_id = ?1
             ORDER BY id",
        )?;

        let records = stmt
            .query_map(params![session_id], |row| {
                Ok(AttemptRecord {
                    session_id: row.get(0)?,
                    task_id: row.get(1)?,
                    timestamp: row.get(2)?,
                    correct_note_name: row.get(3)?,
                    correct_octave: row.get(4)?,
                    correct_midi: row.get(5)?,
                    guessed_note_name: row.get(6)?,
                    guessed_octave: row.get(7)?,
                    guessed_midi: row.get(8)?,
                    is_correct: row.get(9)?,
                    attempt_number: row.get(10)?,
                    play_again_count: row.get(11)?,
                    note_group: row.get(12)?,
                    octave_range_low: row.get(13)?,
                    octave_range_high: row.get(14)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// The session that recorded most recently, if any.
    pub fn latest_session_id(&self) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT session_id FROM attempts ORDER BY id DESC LIMIT 1")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// One summary row per recorded session, oldest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id,
                    MIN(timestamp),
                    COUNT(*),
                    COUNT(DISTINCT CASE WHEN is_correct = 1 THEN task_id END),
                    SUM(CASE WHEN is_correct = 1 AND attempt_number = 1 THEN 1 ELSE 0 END)
             FROM attempts
             GROUP BY session_id
             ORDER BY MIN(id)",
        )?;

        let sessions = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    session_id: row.get(0)?,
                    started_at: row.get(1)?,
                    total_attempts: row.get(2)?,
                    completed_tasks: row.get(3)?,
                    first_try_correct: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Library-wide totals across every session.
    pub fn overall_totals(&self) -> Result<OverallTotals> {
        let totals = self.conn.query_row(
            "SELECT COUNT(DISTINCT session_id),
                    COUNT(DISTINCT CASE WHEN is_correct = 1 THEN task_id END),
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN is_correct = 1 AND attempt_number = 1
                                      THEN 1 ELSE 0 END), 0)
             FROM attempts",
            [],
            |row| {
                Ok(OverallTotals {
                    sessions: row.get(0)?,
                    completed_tasks: row.get(1)?,
                    total_attempts: row.get(2)?,
                    first_try_correct: row.get(3)?,
                })
            },
        )?;
        Ok(totals)
    }

    /// Per-note-group performance, most-drilled group first.
    pub fn group_performance(&self) -> Result<Vec<GroupPerformance>> {
        let mut stmt = self.conn.prepare(
            "SELECT note_group,
                    COUNT(DISTINCT CASE WHEN is_correct = 1 THEN task_id END),
                    COUNT(*),
                    SUM(CASE WHEN is_correct = 1 AND attempt_number = 1 THEN 1 ELSE 0 END),
                    AVG(CASE WHEN is_correct = 1 THEN attempt_number END)
             FROM attempts
             GROUP BY note_group
             ORDER BY COUNT(*) DESC",
        )?;

        let groups = stmt
            .query_map([], |row| {
                Ok(GroupPerformance {
                    note_group: row.get(0)?,
                    completed_tasks: row.get(1)?,
                    total_attempts: row.get(2)?,
                    first_try_correct: row.get(3)?,
                    avg_attempts: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(groups)
    }

    /// Notes ranked hardest-first by guess success rate. Notes with fewer
    /// than `min_attempts` guesses are left out (too noisy to rank).
    pub fn hardest_notes(&self, min_attempts: i64, limit: usize) -> Result<Vec<NoteDifficulty>> {
        let mut stmt = self.conn.prepare(
            "SELECT correct_note_name, correct_octave,
                    COUNT(*),
                    AVG(is_correct),
                    AVG(CASE WHEN is_correct = 1 THEN attempt_number END)
             FROM attempts
             GROUP BY correct_note_name, correct_octave
             HAVING COUNT(*) >= ?1
             ORDER BY AVG(is_correct) ASC, COUNT(*) DESC
             LIMIT ?2",
        )?;

        let notes = stmt
            .query_map(params![min_attempts, limit as i64], |row| {
                Ok(NoteDifficulty {
                    note_name: row.get(0)?,
                    octave: row.get(1)?,
                    total_attempts: row.get(2)?,
                    success_rate: row.get(3)?,
                    avg_attempts: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        session: &str,
        task: &str,
        attempt: i32,
        is_correct: bool,
    ) -> AttemptRecord {
        AttemptRecord {
            session_id: session.to_string(),
            task_id: task.to_string(),
            timestamp: "2026-08-07T12:00:00+00:00".to_string(),
            correct_note_name: "E".to_string(),
            correct_octave: 4,
            correct_midi: 52,
            guessed_note_name: if is_correct { "E" } else { "C" }.to_string(),
            guessed_octave: 4,
            guessed_midi: if is_correct { 52 } else { 48 },
            is_correct,
            attempt_number: attempt,
            play_again_count: 0,
            note_group: "All".to_string(),
            octave_range_low: 2,
            octave_range_high: 7,
        }
    }

    #[test]
    fn test_append_and_read_back_in_order() {
        let db = Database::open_in_memory().unwrap();
        db.append_attempt(&record("s1", "t1", 1, false)).unwrap();
        db.append_attempt(&record("s1", "t1", 2, true)).unwrap();
        db.append_attempt(&record("s2", "t2", 1, true)).unwrap();

        let s1 = db.session_attempts("s1").unwrap();
        assert_eq!(s1.len(), 2);
        assert_eq!(s1[0].attempt_number, 1);
        assert!(!s1[0].is_correct);
        assert_eq!(s1[1].attempt_number, 2);
        assert!(s1[1].is_correct);

        // Round trip preserves every field
        assert_eq!(s1[0], record("s1", "t1", 1, false));

        assert!(db.session_attempts("missing").unwrap().is_empty());
    }

    #[test]
    fn test_latest_session_id() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.latest_session_id().unwrap().is_none());

        db.append_attempt(&record("s1", "t1", 1, true)).unwrap();
        db.append_attempt(&record("s2", "t2", 1, true)).unwrap();
        assert_eq!(db.latest_session_id().unwrap().as_deref(), Some("s2"));
    }

    #[test]
    fn test_list_sessions_aggregates() {
        let db = Database::open_in_memory().unwrap();
        // s1: one task solved on the second try
        db.append_attempt(&record("s1", "t1", 1, false)).unwrap();
        db.append_attempt(&record("s1", "t1", 2, true)).unwrap();
        // s2: one task solved first try
        db.append_attempt(&record("s2", "t2", 1, true)).unwrap();

        let sessions = db.list_sessions().unwrap();
        assert_eq!(sessions.len(), 2);

        assert_eq!(sessions[0].session_id, "s1");
        assert_eq!(sessions[0].total_attempts, 2);
        assert_eq!(sessions[0].completed_tasks, 1);
        assert_eq!(sessions[0].first_try_correct, 0);

        assert_eq!(sessions[1].session_id, "s2");
        assert_eq!(sessions[1].first_try_correct, 1);
    }

    #[test]
    fn test_overall_totals_empty_and_filled() {
        let db = Database::open_in_memory().unwrap();
        let empty = db.overall_totals().unwrap();
        assert_eq!(empty.sessions, 0);
        assert_eq!(empty.total_attempts, 0);

        db.append_attempt(&record("s1", "t1", 1, true)).unwrap();
        db.append_attempt(&record("s2", "t2", 1, false)).unwrap();
        db.append_attempt(&record("s2", "t2", 2, true)).unwrap();

        let totals = db.overall_totals().unwrap();
        assert_eq!(totals.sessions, 2);
        assert_eq!(totals.completed_tasks, 2);
        assert_eq!(totals.total_attempts, 3);
        assert_eq!(totals.first_try_correct, 1);
    }

    #[test]
    fn test_hardest_notes_ranking() {
        let db = Database::open_in_memory().unwrap();
        // E4 guessed wrong once then right; C4-target solved first try
        db.append_attempt(&record("s1", "t1", 1, false)).unwrap();
        db.append_attempt(&record("s1", "t1", 2, true)).unwrap();
        let mut easy = record("s1", "t2", 1, true);
        easy.correct_note_name = "C".to_string();
        easy.correct_midi = 48;
        db.append_attempt(&easy).unwrap();

        let notes = db.hardest_notes(1, 10).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].note_name, "E");
        assert!(notes[0].success_rate < notes[1].success_rate);

        // min_attempts filter drops the single-guess note
        let filtered = db.hardest_notes(2, 10).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].note_name, "E");
    }
}
