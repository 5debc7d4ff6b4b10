use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::audio::DEFAULT_NOTE_DURATION_MS;
use crate::groups::CustomGroupConfig;

/// Application configuration loaded from TOML config file.
/// All fields have sensible defaults; the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Custom database path (overrides XDG default).
    pub db_path: Option<PathBuf>,
    /// Note group to drill when `train` has no --group.
    pub note_group: String,
    /// Inclusive octave range for the note pool.
    pub octave_low: i32,
    pub octave_high: i32,
    /// MIDI output settings.
    pub audio: AudioConfig,
    /// Custom note-group definitions (merged with the builtin registry).
    #[serde(rename = "groups")]
    pub custom_groups: Vec<CustomGroupConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            note_group: "All".to_string(),
            octave_low: 2,
            octave_high: 7,
            audio: AudioConfig::default(),
            custom_groups: Vec::new(),
        }
    }
}

/// MIDI output configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Instrument program (1-128).
    pub instrument: u8,
    /// Substring of the output port name to connect to. Unset = first port.
    pub port: Option<String>,
    /// How long each tone sounds before auto note-off.
    pub note_duration_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            instrument: 1,
            port: None,
            note_duration_ms: DEFAULT_NOTE_DURATION_MS,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/pitchdrill/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!(
                            "Failed to parse {}: {}. Using defaults.",
                            path.display(),
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!(
                        "Failed to read {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default database path using XDG data directory.
pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.join("pitchdrill.db")
    } else {
        // Fallback: current directory
        PathBuf::from("pitchdrill.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.note_group, "All");
        assert_eq!(config.octave_low, 2);
        assert_eq!(config.octave_high, 7);
        assert_eq!(config.audio.instrument, 1);
        assert_eq!(config.audio.note_duration_ms, 3000);
        assert!(config.custom_groups.is_empty());
    }

    #[test]
    fn test_parse_with_custom_group() {
        let raw = r#"
            note_group = "Pentatonic"
            octave_low = 3
            octave_high = 5

            [audio]
            instrument = 25

            [[groups]]
            name = "Tritone"
            notes = ["C", "F#"]
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.note_group, "Pentatonic");
        assert_eq!(config.octave_low, 3);
        assert_eq!(config.audio.instrument, 25);
        // Unset audio fields keep their defaults
        assert_eq!(config.audio.note_duration_ms, 3000);
        assert_eq!(config.custom_groups.len(), 1);
        assert_eq!(config.custom_groups[0].name, "Tritone");
    }
}
