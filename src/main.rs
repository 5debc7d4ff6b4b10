use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use pitchdrill::audio::{MidiTone, SilentTone, ToneSink};
use pitchdrill::db::models::SessionSummary;
use pitchdrill::db::Database;
use pitchdrill::engine::TrainingEngine;
use pitchdrill::groups::GroupRegistry;
use pitchdrill::recorder::{SessionRecorder, SessionStats};

#[derive(Parser)]
#[command(name = "pitchdrill", version, about = "Ear-training drill: guess the note you hear")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive training session
    Train {
        /// Note group to drill (see `groups`)
        #[arg(short, long)]
        group: Option<String>,

        /// Lowest octave in the pool
        #[arg(long)]
        octave_low: Option<i32>,

        /// Highest octave in the pool
        #[arg(long)]
        octave_high: Option<i32>,

        /// MIDI instrument program (1-128)
        #[arg(short, long)]
        instrument: Option<u8>,

        /// Substring of the MIDI output port name to play through
        #[arg(long)]
        port: Option<String>,

        /// Train without MIDI output
        #[arg(long)]
        silent: bool,

        /// Seed the target sequence (reproducible drills)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show recorded sessions and their accuracy
    Stats {
        /// Show a single session instead of the listing
        #[arg(long)]
        session: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export one session's attempts as CSV
    Export {
        /// Session id (defaults to the most recent)
        #[arg(long)]
        session: Option<String>,

        /// Output file (defaults to session_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Cross-session analytics: group performance and hardest notes
    Report,

    /// List note groups available for training
    Groups,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = pitchdrill::config::AppConfig::load();

    // Note-group registry: builtins merged with config-defined groups
    let registry = GroupRegistry::new(&config.custom_groups);

    // Resolve database path: CLI > config > XDG default
    let db_path = cli
        .db_path
        .or(config.db_path.clone())
        .unwrap_or_else(pitchdrill::config::default_db_path);
    log::info!("Database: {}", db_path.display());

    let db = Database::open(&db_path).context("Failed to open database")?;

    match cli.command {
        Commands::Train {
            group,
            octave_low,
            octave_high,
            instrument,
            port,
            silent,
            seed,
        } => {
            let group_name = group.unwrap_or_else(|| config.note_group.clone());
            let group = registry.get(&group_name).with_context(|| {
                let names: Vec<&str> = registry.iter().map(|g| g.name.as_str()).collect();
                format!(
                    "Unknown note group {:?}. Available: {}",
                    group_name,
                    names.join(", ")
                )
            })?;

            let octave_low = octave_low.unwrap_or(config.octave_low);
            let octave_high = octave_high.unwrap_or(config.octave_high);
            let instrument = instrument.unwrap_or(config.audio.instrument);
            let port = port.or(config.audio.port.clone());

            let tone = make_tone_sink(
                silent,
                port.as_deref(),
                instrument,
                Duration::from_millis(config.audio.note_duration_ms),
            );

            let recorder = SessionRecorder::new(db);
            let mut engine = TrainingEngine::new(
                &group.name,
                &group.notes,
                octave_low,
                octave_high,
                recorder,
                tone,
                seed,
            )
            .context("Invalid training configuration")?;

            println!(
                "Training on {} ({} notes, octaves {}-{}, {} candidates)",
                group.name,
                group.notes.len(),
                octave_low,
                octave_high,
                engine.pool().len()
            );
            pitchdrill::cli::run(&mut engine, &registry)?;
        }

        Commands::Stats { session, json } => match session {
            Some(session_id) => {
                let records = db
                    .session_attempts(&session_id)
                    .context("Query failed")?;
                if records.is_empty() {
                    println!("No attempts recorded for session {}.", session_id);
                    return Ok(());
                }
                let stats = SessionStats::from_records(&records);
                if json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    print_session_stats(&session_id, &stats);
                }
            }
            None => {
                let sessions = db.list_sessions().context("Query failed")?;
                if sessions.is_empty() {
                    println!("No sessions recorded yet. Run `pitchdrill train` first.");
                    return Ok(());
                }
                if json {
                    println!("{}", serde_json::to_string_pretty(&sessions)?);
                } else {
                    print_session_table(&sessions);
                }
            }
        },

        Commands::Export { session, output } => {
            let session_id = match session {
                Some(s) => s,
                None => db
                    .latest_session_id()
                    .context("Query failed")?
                    .context("No sessions recorded yet")?,
            };

            let path = output.unwrap_or_else(|| {
                let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
                PathBuf::from(format!("session_{}.csv", stamp))
            });

            let rows = pitchdrill::export::export_session(&db, &session_id, &path)
                .context("Export failed")?;
            if rows == 0 {
                println!("No attempts recorded for session {}.", session_id);
            } else {
                println!("Exported {} attempts to {}", rows, path.display());
            }
        }

        Commands::Report => {
            let text = pitchdrill::report::render_summary(&db).context("Report failed")?;
            print!("{}", text);
        }

        Commands::Groups => {
            for group in registry.iter() {
                let notes: Vec<String> =
                    group.notes.iter().map(|n| n.to_string()).collect();
                println!("{:<18} {}", group.name, notes.join(" "));
            }
        }
    }

    Ok(())
}

/// Pick the tone sink: silent when asked for, otherwise live MIDI with a
/// silent fallback so a missing synth never blocks training (matching the
/// original trainer, which kept running without audio).
fn make_tone_sink(
    silent: bool,
    port: Option<&str>,
    instrument: u8,
    note_duration: Duration,
) -> Box<dyn ToneSink> {
    if silent {
        return Box::new(SilentTone::default());
    }
    match MidiTone::connect(port, instrument, note_duration) {
        Ok(tone) => Box::new(tone),
        Err(e) => {
            log::warn!("MIDI unavailable ({}); continuing without audio", e);
            Box::new(SilentTone::default())
        }
    }
}

fn print_session_stats(session_id: &str, stats: &SessionStats) {
    println!("Session {}", session_id);
    println!("  Attempts:        {}", stats.total_attempts);
    println!("  Completed tasks: {}", stats.completed_tasks);
    println!("  First-try:       {}", stats.first_try_correct);
    println!("  Accuracy:        {:.1}%", stats.accuracy * 100.0);
}

fn print_session_table(sessions: &[SessionSummary]) {
    println!(
        "{:<36} {:>19} {:>9} {:>7} {:>7}",
        "Session", "Started", "Attempts", "Tasks", "Acc"
    );
    println!("{}", "-".repeat(83));
    for s in sessions {
        let accuracy = if s.completed_tasks > 0 {
            s.first_try_correct as f64 / s.completed_tasks as f64 * 100.0
        } else {
            0.0
        };
        // RFC 3339 down to seconds is plenty for a listing
        let started: String = s.started_at.chars().take(19).collect();
        println!(
            "{:<36} {:>19} {:>9} {:>7} {:>6.1}%",
            s.session_id, started, s.total_attempts, s.completed_tasks, accuracy
        );
    }
}
