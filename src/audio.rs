use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use midir::{MidiOutput, MidiOutputConnection};
use thiserror::Error;

/// MIDI channel notes are sent on (low nibble of the status byte).
const MIDI_CHANNEL: u8 = 1;
/// Note-on velocity.
const MIDI_VELOCITY: u8 = 127;
/// How long a tone sounds before the scheduled note-off.
pub const DEFAULT_NOTE_DURATION_MS: u64 = 3000;

#[derive(Error, Debug)]
pub enum MidiError {
    #[error("Failed to initialize MIDI: {0}")]
    InitFailed(String),
    #[error("No MIDI output ports available")]
    NoPorts,
    #[error("No MIDI output port matching {0:?}")]
    PortNotFound(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

/// Where tones go. The engine fires and forgets: `play` must return
/// immediately and no result flows back.
pub trait ToneSink {
    /// Start sounding a pitch (0–127). Non-blocking; the sink schedules
    /// its own note-off.
    fn play(&mut self, pitch: u8);

    /// Select the instrument program (1–128) for subsequent tones.
    fn set_instrument(&mut self, program: u8);
}

impl<T: ToneSink + ?Sized> ToneSink for Box<T> {
    fn play(&mut self, pitch: u8) {
        (**self).play(pitch);
    }

    fn set_instrument(&mut self, program: u8) {
        (**self).set_instrument(program);
    }
}

/// Live MIDI output. The note-off is scheduled on a detached timer thread,
/// so a replay while a tone is still sounding just overlaps it.
pub struct MidiTone {
    conn: Arc<Mutex<MidiOutputConnection>>,
    port_name: String,
    program: u8,
    note_duration: Duration,
}

impl MidiTone {
    /// Connect to a MIDI output port. With `port_filter` set, the first
    /// port whose name contains the filter is used; otherwise the first
    /// available port (the original's device 0).
    pub fn connect(
        port_filter: Option<&str>,
        instrument: u8,
        note_duration: Duration,
    ) -> Result<Self, MidiError> {
        let out = MidiOutput::new(crate::APP_NAME)
            .map_err(|e| MidiError::InitFailed(e.to_string()))?;

        let ports = out.ports();
        if ports.is_empty() {
            return Err(MidiError::NoPorts);
        }

        let port = match port_filter {
            Some(filter) => ports
                .iter()
                .find(|p| {
                    out.port_name(p)
                        .map(|name| name.contains(filter))
                        .unwrap_or(false)
                })
                .ok_or_else(|| MidiError::PortNotFound(filter.to_string()))?,
            None => &ports[0],
        };

        let port_name = out.port_name(port).unwrap_or_else(|_| "unknown".to_string());
        let conn = out
            .connect(port, "pitchdrill-output")
            .map_err(|e| MidiError::ConnectionFailed(e.to_string()))?;
        log::info!("MIDI output: {}", port_name);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            port_name,
            program: clamp_program(instrument),
            note_duration,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn send(conn: &Arc<Mutex<MidiOutputConnection>>, bytes: &[u8]) {
        let mut guard = conn.lock().expect("midi output mutex poisoned");
        if let Err(e) = guard.send(bytes) {
            log::warn!("MIDI send failed: {}", e);
        }
    }
}

impl ToneSink for MidiTone {
    fn play(&mut self, pitch: u8) {
        let pitch = pitch & 0x7F;

        // Program change before every note-on, so an instrument switch
        // takes effect without reconnecting
        Self::send(&self.conn, &[0xC0 | MIDI_CHANNEL, self.program]);
        Self::send(&self.conn, &[0x90 | MIDI_CHANNEL, pitch, MIDI_VELOCITY]);

        // Auto note-off after the fixed duration, off the caller's thread
        let conn = Arc::clone(&self.conn);
        let duration = self.note_duration;
        thread::spawn(move || {
            thread::sleep(duration);
            Self::send(&conn, &[0x80 | MIDI_CHANNEL, pitch, 0]);
        });
    }

    fn set_instrument(&mut self, program: u8) {
        self.program = clamp_program(program);
    }
}

/// No-audio sink for `--silent` runs, headless environments, and tests.
#[derive(Debug, Default)]
pub struct SilentTone {
    pub played: Vec<u8>,
}

impl ToneSink for SilentTone {
    fn play(&mut self, pitch: u8) {
        log::debug!("(silent) play pitch {}", pitch);
        self.played.push(pitch);
    }

    fn set_instrument(&mut self, program: u8) {
        log::debug!("(silent) instrument {}", program);
    }
}

/// External program ids are 1–128; the wire byte is 0–127.
fn clamp_program(program: u8) -> u8 {
    program.clamp(1, 128) - 1
}
