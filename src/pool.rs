use thiserror::Error;

use crate::notes::{NoteIdentity, PitchClass};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("note selection is empty")]
    EmptySelection,
    #[error("inverted octave range: {low} > {high}")]
    InvertedOctaveRange { low: i32, high: i32 },
    #[error("{note} has pitch number {pitch}, outside the playable 0-127 range")]
    PitchOutOfRange { note: NoteIdentity, pitch: i32 },
}

/// The set of eligible guessing targets: a pitch-class selection crossed
/// with an inclusive octave range.
///
/// Candidates are materialized once, in octave-major order (octave
/// ascending, then selection order), and the pool is replaced, never
/// mutated in place, when configuration changes.
#[derive(Debug, Clone)]
pub struct NotePool {
    selected: Vec<PitchClass>,
    octave_low: i32,
    octave_high: i32,
    candidates: Vec<NoteIdentity>,
}

impl NotePool {
    /// Validate the configuration and materialize the candidate list.
    /// No state is touched anywhere on failure.
    pub fn build(
        selected: &[PitchClass],
        octave_low: i32,
        octave_high: i32,
    ) -> Result<Self, ConfigurationError> {
        // Ordered set: drop duplicates, keep first occurrence.
        let mut names: Vec<PitchClass> = Vec::with_capacity(selected.len());
        for &pc in selected {
            if !names.contains(&pc) {
                names.push(pc);
            }
        }

        if names.is_empty() {
            return Err(ConfigurationError::EmptySelection);
        }
        if octave_low > octave_high {
            return Err(ConfigurationError::InvertedOctaveRange {
                low: octave_low,
                high: octave_high,
            });
        }

        let mut candidates =
            Vec::with_capacity(names.len() * (octave_high - octave_low + 1) as usize);
        for octave in octave_low..=octave_high {
            for &name in &names {
                let note = NoteIdentity::new(name, octave);
                let pitch = note.pitch_number();
                if !(0..=127).contains(&pitch) {
                    return Err(ConfigurationError::PitchOutOfRange { note, pitch });
                }
                candidates.push(note);
            }
        }

        Ok(Self {
            selected: names,
            octave_low,
            octave_high,
            candidates,
        })
    }

    pub fn candidates(&self) -> &[NoteIdentity] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn contains(&self, note: &NoteIdentity) -> bool {
        self.candidates.contains(note)
    }

    pub fn selected_names(&self) -> &[PitchClass] {
        &self.selected
    }

    pub fn octave_low(&self) -> i32 {
        self.octave_low
    }

    pub fn octave_high(&self) -> i32 {
        self.octave_high
    }
}
