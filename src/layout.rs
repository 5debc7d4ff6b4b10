//! Choice-grid sizing: how many rows and columns to arrange `n` controls
//! into, given rough width/height budgets.

/// Smallest usable control width, in the same units as the width hint.
pub const MIN_CONTROL_WIDTH: u32 = 70;
/// Smallest usable control height.
pub const MIN_CONTROL_HEIGHT: u32 = 50;

/// Acceptable cols/rows aspect band: no skyscrapers, no ribbons.
const ASPECT_MIN: f64 = 0.5;
const ASPECT_MAX: f64 = 3.0;

/// Pick a `(rows, cols)` rectangle for `n` controls.
///
/// Guarantees `rows * cols >= n` and caps `cols` at what the width hint
/// can fit. Among candidates whose aspect falls inside the band the
/// smallest rectangle wins, ties going to fewer rows (wider layouts).
/// When no candidate satisfies the aspect band, the nearest one is used;
/// this function never fails. The height hint only expresses a
/// preference; it is abandoned before the aspect band is.
pub fn grid_layout(n: usize, max_width_hint: u32, max_height_hint: u32) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }

    let max_cols = ((max_width_hint / MIN_CONTROL_WIDTH).max(1) as usize).min(n);
    let max_rows = (max_height_hint / MIN_CONTROL_HEIGHT).max(1) as usize;

    let candidates: Vec<(usize, usize)> = (1..=max_cols)
        .map(|cols| (n.div_ceil(cols), cols))
        .collect();

    let in_band = |&(rows, cols): &(usize, usize)| {
        let aspect = cols as f64 / rows as f64;
        (ASPECT_MIN..=ASPECT_MAX).contains(&aspect)
    };
    // Smallest rectangle first, then the wider of equals
    let preference = |&(rows, cols): &(usize, usize)| (rows * cols, rows);

    // Aspect band plus height budget
    if let Some(best) = candidates
        .iter()
        .copied()
        .filter(|c| in_band(c) && c.0 <= max_rows)
        .min_by_key(preference)
    {
        return best;
    }

    // Aspect band alone
    if let Some(best) = candidates
        .iter()
        .copied()
        .filter(in_band)
        .min_by_key(preference)
    {
        return best;
    }

    // Nothing fits the band (e.g. one-column budgets): take the closest
    let distance = |&(rows, cols): &(usize, usize)| {
        let aspect = cols as f64 / rows as f64;
        if aspect < ASPECT_MIN {
            ASPECT_MIN - aspect
        } else if aspect > ASPECT_MAX {
            aspect - ASPECT_MAX
        } else {
            0.0
        }
    };
    candidates
        .iter()
        .copied()
        .min_by(|a, b| {
            distance(a)
                .total_cmp(&distance(b))
                .then_with(|| preference(a).cmp(&preference(b)))
        })
        .unwrap_or((n, 1))
}
