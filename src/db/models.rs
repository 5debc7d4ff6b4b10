/// One persisted guess. Immutable once written; field order matches the
/// durable record schema used by the CSV export.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub session_id: String,
    pub task_id: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub correct_note_name: String,
    pub correct_octave: i32,
    pub correct_midi: i32,
    pub guessed_note_name: String,
    pub guessed_octave: i32,
    pub guessed_midi: i32,
    pub is_correct: bool,
    /// 1-based ordinal of this guess within its task.
    pub attempt_number: i32,
    /// Play-again presses so far in this task.
    pub play_again_count: i32,
    pub note_group: String,
    pub octave_range_low: i32,
    pub octave_range_high: i32,
}

impl AttemptRecord {
    /// Column names in stable schema order (header row of exports).
    pub const FIELDS: [&'static str; 15] = [
        "session_id",
        "task_id",
        "timestamp",
        "correct_note_name",
        "correct_octave",
        "correct_midi",
        "guessed_note_name",
        "guessed_octave",
        "guessed_midi",
        "is_correct",
        "attempt_number",
        "play_again_count",
        "note_group",
        "octave_range_low",
        "octave_range_high",
    ];
}

/// Per-session aggregate row (for the `stats` listing).
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: String,
    pub total_attempts: i64,
    pub completed_tasks: i64,
    pub first_try_correct: i64,
}

/// Per-note-group aggregate row (for the `report` command).
#[derive(Debug, Clone)]
pub struct GroupPerformance {
    pub note_group: String,
    pub completed_tasks: i64,
    pub total_attempts: i64,
    pub first_try_correct: i64,
    /// Mean guesses needed to solve a task, over completed tasks.
    pub avg_attempts: Option<f64>,
}

/// Per-note aggregate row, lowest success rate first.
#[derive(Debug, Clone)]
pub struct NoteDifficulty {
    pub note_name: String,
    pub octave: i64,
    pub total_attempts: i64,
    /// Fraction of guesses at this note that were correct.
    pub success_rate: f64,
    pub avg_attempts: Option<f64>,
}

/// Library-wide totals (for the `report` header).
#[derive(Debug, Clone, Default)]
pub struct OverallTotals {
    pub sessions: i64,
    pub completed_tasks: i64,
    pub total_attempts: i64,
    pub first_try_correct: i64,
}
