use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::db::models::AttemptRecord;
use crate::db::{Database, DbError};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write one session's attempts to `path` as CSV, header first, rows in
/// submission order, columns in the stable record-schema order. Returns
/// the number of data rows written.
pub fn export_session(
    db: &Database,
    session_id: &str,
    path: &Path,
) -> Result<usize, ExportError> {
    let records = db.session_attempts(session_id)?;

    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    writeln!(w, "{}", AttemptRecord::FIELDS.join(","))?;
    for r in &records {
        write_row(&mut w, r)?;
    }
    w.flush()?;

    Ok(records.len())
}

fn write_row<W: Write>(w: &mut W, r: &AttemptRecord) -> std::io::Result<()> {
    let fields = [
        csv_field(&r.session_id),
        csv_field(&r.task_id),
        csv_field(&r.timestamp),
        csv_field(&r.correct_note_name),
        r.correct_octave.to_string(),
        r.correct_midi.to_string(),
        csv_field(&r.guessed_note_name),
        r.guessed_octave.to_string(),
        r.guessed_midi.to_string(),
        r.is_correct.to_string(),
        r.attempt_number.to_string(),
        r.play_again_count.to_string(),
        csv_field(&r.note_group),
        r.octave_range_low.to_string(),
        r.octave_range_high.to_string(),
    ];
    writeln!(w, "{}", fields.join(","))
}

/// Quote a field when it would break the row (custom group names are
/// free-form text).
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
