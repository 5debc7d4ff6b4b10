use std::collections::HashMap;

use serde::Deserialize;

use crate::notes::PitchClass;

/// A named selection of pitch classes to drill on.
#[derive(Debug, Clone)]
pub struct NoteGroup {
    pub name: String,
    /// Ordered, duplicate-free.
    pub notes: Vec<PitchClass>,
}

/// Config file group definition (deserialized from TOML).
#[derive(Debug, Deserialize, Clone)]
pub struct CustomGroupConfig {
    pub name: String,
    pub notes: Vec<String>,
}

/// The note-group registry: builtin groups merged with custom definitions
/// from the config file. Built once at startup and passed to whoever needs
/// it; there is no global state.
#[derive(Debug)]
pub struct GroupRegistry {
    groups: Vec<NoteGroup>,
    /// Maps lowercase group name → index in `groups`
    name_to_index: HashMap<String, usize>,
}

impl GroupRegistry {
    pub fn new(custom_groups: &[CustomGroupConfig]) -> Self {
        let mut groups = builtin_groups();

        for custom in custom_groups {
            let notes = parse_custom_notes(custom);
            if notes.is_empty() {
                log::warn!(
                    "Ignoring custom group {:?}: no valid notes",
                    custom.name
                );
                continue;
            }

            let existing = groups
                .iter_mut()
                .find(|g| g.name.eq_ignore_ascii_case(&custom.name));
            match existing {
                // A custom group with a builtin's name replaces it
                Some(group) => group.notes = notes,
                None => groups.push(NoteGroup {
                    name: custom.name.clone(),
                    notes,
                }),
            }
        }

        let name_to_index = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.name.to_lowercase(), i))
            .collect();

        Self {
            groups,
            name_to_index,
        }
    }

    /// Look up a group by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&NoteGroup> {
        self.name_to_index
            .get(&name.to_lowercase())
            .map(|&i| &self.groups[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &NoteGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new(&[])
    }
}

/// Parse a custom group's note labels, dropping duplicates and warning on
/// anything unparseable.
fn parse_custom_notes(custom: &CustomGroupConfig) -> Vec<PitchClass> {
    let mut notes = Vec::new();
    for label in &custom.notes {
        match label.parse::<PitchClass>() {
            Ok(pc) => {
                if !notes.contains(&pc) {
                    notes.push(pc);
                }
            }
            Err(e) => {
                log::warn!("Custom group {:?}: {}", custom.name, e);
            }
        }
    }
    notes
}

fn builtin_groups() -> Vec<NoteGroup> {
    use PitchClass::*;

    let group = |name: &str, notes: &[PitchClass]| NoteGroup {
        name: name.to_string(),
        notes: notes.to_vec(),
    };

    vec![
        group("All", &PitchClass::ALL),
        group("C Major", &[C, D, E, F, G, A, B]),
        group("G Major", &[G, A, B, C, D, E, Fs]),
        group("F Major", &[F, G, A, As, C, D, E]),
        group("Standard Tuning", &[E, A, D, G, B]),
        group("Sharps", &[Cs, Ds, Fs, Gs, As]),
        // Historically spelled with flats; same five black keys.
        group("Flats", &[Cs, Ds, Fs, Gs, As]),
        group("Pentatonic", &[C, D, E, G, A]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_case_insensitive() {
        let reg = GroupRegistry::default();
        assert!(reg.get("All").is_some());
        assert!(reg.get("c major").is_some());
        assert!(reg.get("STANDARD TUNING").is_some());
        assert!(reg.get("Dorian").is_none());

        assert_eq!(reg.get("all").unwrap().notes.len(), 12);
        assert_eq!(reg.get("pentatonic").unwrap().notes.len(), 5);
    }

    #[test]
    fn test_g_major_membership_and_order() {
        use PitchClass::*;
        let reg = GroupRegistry::default();
        assert_eq!(
            reg.get("G Major").unwrap().notes,
            vec![G, A, B, C, D, E, Fs]
        );
    }

    #[test]
    fn test_custom_group_added() {
        let reg = GroupRegistry::new(&[CustomGroupConfig {
            name: "Tritone".to_string(),
            notes: vec!["C".to_string(), "F#".to_string()],
        }]);
        let g = reg.get("tritone").unwrap();
        assert_eq!(g.notes, vec![PitchClass::C, PitchClass::Fs]);
    }

    #[test]
    fn test_custom_group_replaces_builtin() {
        let reg = GroupRegistry::new(&[CustomGroupConfig {
            name: "Pentatonic".to_string(),
            notes: vec!["A".to_string(), "C".to_string(), "D".to_string()],
        }]);
        let g = reg.get("Pentatonic").unwrap();
        assert_eq!(
            g.notes,
            vec![PitchClass::A, PitchClass::C, PitchClass::D]
        );
        // No duplicate entry appeared
        assert_eq!(
            reg.iter().filter(|g| g.name == "Pentatonic").count(),
            1
        );
    }

    #[test]
    fn test_invalid_notes_skipped() {
        let reg = GroupRegistry::new(&[CustomGroupConfig {
            name: "Broken".to_string(),
            notes: vec!["C".to_string(), "X".to_string(), "C".to_string()],
        }]);
        assert_eq!(reg.get("Broken").unwrap().notes, vec![PitchClass::C]);

        let empty = GroupRegistry::new(&[CustomGroupConfig {
            name: "Nothing".to_string(),
            notes: vec!["?".to_string()],
        }]);
        assert!(empty.get("Nothing").is_none());
    }
}
