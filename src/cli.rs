//! Interactive training loop: terminal presentation over the engine.
//! All training state lives in the engine; this module only renders it
//! and translates typed input into engine calls.

use std::io::{self, BufRead, Write};

use crate::audio::ToneSink;
use crate::engine::{TrainingEngine, Verdict};
use crate::groups::GroupRegistry;
use crate::layout::grid_layout;
use crate::notes::NoteIdentity;

/// Budget hints for the choice grid.
const GRID_WIDTH_HINT: u32 = 800;
const GRID_HEIGHT_HINT: u32 = 600;

/// One line of user input, decoded.
#[derive(Debug, PartialEq)]
enum Input {
    Quit,
    Replay,
    NewNote,
    Stats,
    Group(String),
    Octaves(i32, i32),
    Instrument(u8),
    Guess(NoteIdentity),
    Unknown,
}

fn parse_input(line: &str) -> Input {
    let input = line.trim();
    match input {
        "q" | "quit" => return Input::Quit,
        "r" => return Input::Replay,
        "n" => return Input::NewNote,
        "s" => return Input::Stats,
        _ => {}
    }

    if let Some(rest) = input.strip_prefix("g ") {
        return Input::Group(rest.trim().to_string());
    }
    if let Some(rest) = input.strip_prefix("o ") {
        let parts: Vec<&str> = rest.split_whitespace().collect();
        if let [low, high] = parts.as_slice() {
            if let (Ok(low), Ok(high)) = (low.parse(), high.parse()) {
                return Input::Octaves(low, high);
            }
        }
        return Input::Unknown;
    }
    if let Some(rest) = input.strip_prefix("i ") {
        if let Ok(program @ 1..=128) = rest.trim().parse::<u8>() {
            return Input::Instrument(program);
        }
        return Input::Unknown;
    }

    match input.parse::<NoteIdentity>() {
        Ok(note) => Input::Guess(note),
        Err(_) => Input::Unknown,
    }
}

/// Run the drill until the user quits or stdin closes.
pub fn run<S: ToneSink>(
    engine: &mut TrainingEngine<S>,
    registry: &GroupRegistry,
) -> io::Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout();

    println!("Listen to the note, then type your guess (e.g. C#4).");
    println!(
        "Commands: r replay | n new note | s stats | g <group> | o <low> <high> | i <instrument> | q quit"
    );
    println!();

    if let Err(e) = engine.start() {
        println!("Cannot start training: {}", e);
        return Ok(());
    }
    print_pool(engine);

    let mut lines = stdin.lock().lines();
    loop {
        print!("guess> ");
        out.flush()?;
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_input(&line) {
            Input::Quit => break,
            Input::Replay => {
                if let Err(e) = engine.replay() {
                    println!("{}", e);
                }
            }
            Input::NewNote => {
                match engine.start() {
                    Ok(_) => println!("New note."),
                    Err(e) => println!("{}", e),
                }
                print_pool(engine);
            }
            Input::Stats => print_stats_line(engine),
            Input::Group(name) => match registry.get(&name) {
                Some(group) => {
                    let label = group.name.clone();
                    let notes = group.notes.clone();
                    let (low, high) =
                        (engine.pool().octave_low(), engine.pool().octave_high());
                    match engine.reconfigure(&label, &notes, low, high) {
                        Ok(_) => {
                            println!("Now drilling: {}", label);
                            print_pool(engine);
                        }
                        Err(e) => println!("{}", e),
                    }
                }
                None => {
                    let names: Vec<&str> =
                        registry.iter().map(|g| g.name.as_str()).collect();
                    println!("Unknown group {:?}. Available: {}", name, names.join(", "));
                }
            },
            Input::Octaves(low, high) => {
                let label = engine.note_group().to_string();
                let notes = engine.pool().selected_names().to_vec();
                match engine.reconfigure(&label, &notes, low, high) {
                    Ok(_) => {
                        println!("Octave range: {}-{}", low, high);
                        print_pool(engine);
                    }
                    Err(e) => println!("{}", e),
                }
            }
            Input::Instrument(program) => {
                engine.set_instrument(program);
                println!("Instrument program: {}", program);
            }
            Input::Guess(note) => match engine.submit_guess(note) {
                Ok(outcome) => {
                    if let Some(e) = outcome.record_error {
                        println!("warning: attempt not saved: {}", e);
                    }
                    match outcome.verdict {
                        Verdict::Correct(target) => {
                            println!("Correct! The note was {}. Here comes the next one.", target);
                            print_stats_line(engine);
                            print_pool(engine);
                        }
                        Verdict::Incorrect(guessed) => {
                            println!("Not {}. Listen again (r to replay).", guessed);
                            print_pool(engine);
                        }
                    }
                }
                Err(e) => println!("{}", e),
            },
            Input::Unknown => {
                println!("Didn't understand that. Guess like C#4, or q to quit.");
            }
        }
    }

    println!();
    print_stats_line(engine);
    println!("Session id: {}", engine.recorder().session_id());
    Ok(())
}

fn print_pool<S: ToneSink>(engine: &TrainingEngine<S>) {
    let wrong: Vec<NoteIdentity> = engine
        .current_task()
        .map(|t| t.wrong_guesses.iter().copied().collect())
        .unwrap_or_default();
    print!("{}", format_pool(engine.pool().candidates(), &wrong));
}

/// Lay the candidates out as a grid; guesses already rejected this round
/// are parenthesized.
fn format_pool(candidates: &[NoteIdentity], wrong: &[NoteIdentity]) -> String {
    let (rows, cols) = grid_layout(candidates.len(), GRID_WIDTH_HINT, GRID_HEIGHT_HINT);
    let mut out = String::new();

    for row in 0..rows {
        let mut line = String::new();
        for col in 0..cols {
            let idx = row * cols + col;
            if idx >= candidates.len() {
                break;
            }
            let note = candidates[idx];
            let label = if wrong.contains(&note) {
                format!("({})", note)
            } else {
                note.to_string()
            };
            line.push_str(&format!("{:<7}", label));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn print_stats_line<S: ToneSink>(engine: &TrainingEngine<S>) {
    match engine.stats() {
        Ok(stats) => println!(
            "Tasks: {} | First-try correct: {} | Accuracy: {:.1}%",
            stats.completed_tasks,
            stats.first_try_correct,
            stats.accuracy * 100.0
        ),
        Err(e) => println!("warning: stats unavailable: {}", e),
    }
}
