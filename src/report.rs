//! Cross-session text analytics: the `report` command body.

use crate::db::{Database, DbError};

/// Notes guessed fewer times than this are too noisy to rank.
const MIN_ATTEMPTS_TO_RANK: i64 = 3;
/// How many hardest notes to show.
const HARDEST_NOTES_LIMIT: usize = 10;

/// Build the full report as printable text.
pub fn render_summary(db: &Database) -> Result<String, DbError> {
    let totals = db.overall_totals()?;
    let mut out = String::new();

    if totals.total_attempts == 0 {
        out.push_str("No training data recorded yet. Run `pitchdrill train` first.\n");
        return Ok(out);
    }

    let accuracy = if totals.completed_tasks > 0 {
        totals.first_try_correct as f64 / totals.completed_tasks as f64
    } else {
        0.0
    };

    out.push_str("=== Training Summary ===\n\n");
    out.push_str(&format!("Sessions:           {}\n", totals.sessions));
    out.push_str(&format!("Completed tasks:    {}\n", totals.completed_tasks));
    out.push_str(&format!("Total attempts:     {}\n", totals.total_attempts));
    out.push_str(&format!(
        "First-try accuracy: {:.1}%\n",
        accuracy * 100.0
    ));

    let groups = db.group_performance()?;
    if !groups.is_empty() {
        out.push_str("\n=== Performance by Note Group ===\n\n");
        out.push_str(&format!(
            "{:<18} {:>7} {:>9} {:>10} {:>7} {:>10}\n",
            "Group", "Tasks", "Attempts", "First-try", "Acc", "Avg tries"
        ));
        out.push_str(&format!("{}\n", "-".repeat(66)));
        for g in &groups {
            let acc = if g.completed_tasks > 0 {
                g.first_try_correct as f64 / g.completed_tasks as f64 * 100.0
            } else {
                0.0
            };
            out.push_str(&format!(
                "{:<18} {:>7} {:>9} {:>10} {:>6.1}% {:>10}\n",
                truncate(&g.note_group, 18),
                g.completed_tasks,
                g.total_attempts,
                g.first_try_correct,
                acc,
                g.avg_attempts
                    .map(|a| format!("{:.2}", a))
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
    }

    let hardest = db.hardest_notes(MIN_ATTEMPTS_TO_RANK, HARDEST_NOTES_LIMIT)?;
    if !hardest.is_empty() {
        out.push_str("\n=== Hardest Notes ===\n\n");
        out.push_str(&format!(
            "{:<6} {:>9} {:>9} {:>10}\n",
            "Note", "Attempts", "Success", "Avg tries"
        ));
        out.push_str(&format!("{}\n", "-".repeat(38)));
        for n in &hardest {
            out.push_str(&format!(
                "{:<6} {:>9} {:>8.1}% {:>10}\n",
                format!("{}{}", n.note_name, n.octave),
                n.total_attempts,
                n.success_rate * 100.0,
                n.avg_attempts
                    .map(|a| format!("{:.2}", a))
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
    }

    Ok(out)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        format!("{}...", &s[..max.saturating_sub(3)])
    } else {
        s.to_string()
    }
}
