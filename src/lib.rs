pub mod audio;
pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod export;
pub mod groups;
pub mod layout;
pub mod notes;
pub mod pool;
pub mod recorder;
pub mod report;

/// Application name for XDG paths
pub const APP_NAME: &str = "pitchdrill";
