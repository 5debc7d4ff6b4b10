use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseNoteError {
    #[error("unknown pitch class: {0:?}")]
    UnknownPitchClass(String),
    #[error("missing octave in note: {0:?}")]
    MissingOctave(String),
    #[error("bad octave in note: {0:?}")]
    BadOctave(String),
}

/// One of the 12 chromatic pitch classes, C through B.
///
/// Display always uses the sharp spelling ("C#"); parsing also accepts
/// flat spellings ("Db") and the Unicode accidentals ♯/♭.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    /// All 12 pitch classes in chromatic order from C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Chromatic index from C (C = 0 .. B = 11).
    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn label(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PitchClass {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Normalize accidentals: unicode sharp/flat and lowercase letters.
        let mut name = String::with_capacity(2);
        for c in s.trim().chars() {
            match c {
                '♯' => name.push('#'),
                '♭' => name.push('b'),
                _ => name.extend(c.to_uppercase()),
            }
        }

        let class = match name.as_str() {
            "C" => PitchClass::C,
            "C#" | "DB" => PitchClass::Cs,
            "D" => PitchClass::D,
            "D#" | "EB" => PitchClass::Ds,
            "E" => PitchClass::E,
            "F" => PitchClass::F,
            "F#" | "GB" => PitchClass::Fs,
            "G" => PitchClass::G,
            "G#" | "AB" => PitchClass::Gs,
            "A" => PitchClass::A,
            "A#" | "BB" => PitchClass::As,
            "B" => PitchClass::B,
            _ => return Err(ParseNoteError::UnknownPitchClass(s.to_string())),
        };
        Ok(class)
    }
}

/// A concrete note: pitch class plus octave.
///
/// Guess correctness is full-identity equality on name and octave. The
/// pitch number (`index + 12 * octave`) is only the playback address,
/// never the comparison key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteIdentity {
    pub name: PitchClass,
    pub octave: i32,
}

impl NoteIdentity {
    pub fn new(name: PitchClass, octave: i32) -> Self {
        Self { name, octave }
    }

    /// MIDI-style pitch number. May fall outside 0–127 for extreme
    /// octaves; `NotePool::build` rejects those configurations.
    pub fn pitch_number(&self) -> i32 {
        self.name.index() + 12 * self.octave
    }
}

impl fmt::Display for NoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

impl FromStr for NoteIdentity {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let digits_at = t
            .char_indices()
            .find(|(i, c)| c.is_ascii_digit() || (*c == '-' && *i > 0))
            .map(|(i, _)| i)
            .ok_or_else(|| ParseNoteError::MissingOctave(s.to_string()))?;

        let (name_part, octave_part) = t.split_at(digits_at);
        let name = name_part.parse::<PitchClass>()?;
        let octave = octave_part
            .parse::<i32>()
            .map_err(|_| ParseNoteError::BadOctave(s.to_string()))?;
        Ok(NoteIdentity { name, octave })
    }
}
