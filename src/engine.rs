use std::collections::HashSet;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use uuid::Uuid;

use crate::audio::ToneSink;
use crate::db::DbError;
use crate::notes::{NoteIdentity, PitchClass};
use crate::pool::{ConfigurationError, NotePool};
use crate::recorder::{AttemptContext, SessionRecorder, SessionStats};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("the note pool has no candidates to draw from")]
    NoCandidates,
    #[error("no active task to act on")]
    NoActiveTask,
}

/// One guessing round: a target was played and guesses are being taken
/// until one matches. Replaced the moment a correct guess is recorded.
#[derive(Debug)]
pub struct Task {
    pub id: Uuid,
    pub target: NoteIdentity,
    /// 1-based ordinal of the NEXT guess.
    pub attempt_number: i32,
    pub play_again_count: i32,
    /// Guesses already rejected this round, so the presentation layer can
    /// disable them without asking the engine again.
    pub wrong_guesses: HashSet<NoteIdentity>,
}

impl Task {
    fn new(target: NoteIdentity) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            attempt_number: 1,
            play_again_count: 0,
            wrong_guesses: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The round is solved; carries the target so the caller can show it.
    Correct(NoteIdentity),
    /// The guess was rejected; the round continues with the same target.
    Incorrect(NoteIdentity),
}

/// Result of one guess. A persistence failure does not block the round:
/// the verdict stands, the task advanced, and the append error rides
/// along for the caller to report.
#[derive(Debug)]
pub struct GuessOutcome {
    pub verdict: Verdict,
    pub record_error: Option<DbError>,
}

/// Orchestrates pool, active task, tone playback, and attempt recording
/// for the lifetime of one session. Processes one event at a time; each
/// call runs to completion.
pub struct TrainingEngine<S: ToneSink> {
    pool: NotePool,
    note_group: String,
    task: Option<Task>,
    recorder: SessionRecorder,
    tone: S,
    rng: SmallRng,
}

impl<S: ToneSink> TrainingEngine<S> {
    /// Validate the configuration and set up an idle engine. No task is
    /// started and no tone is played until `start()`.
    pub fn new(
        note_group: &str,
        selection: &[PitchClass],
        octave_low: i32,
        octave_high: i32,
        recorder: SessionRecorder,
        tone: S,
        seed: Option<u64>,
    ) -> Result<Self, ConfigurationError> {
        let pool = NotePool::build(selection, octave_low, octave_high)?;
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Ok(Self {
            pool,
            note_group: note_group.to_string(),
            task: None,
            recorder,
            tone,
            rng,
        })
    }

    pub fn pool(&self) -> &NotePool {
        &self.pool
    }

    pub fn note_group(&self) -> &str {
        &self.note_group
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn target(&self) -> Option<NoteIdentity> {
        self.task.as_ref().map(|t| t.target)
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn tone(&self) -> &S {
        &self.tone
    }

    /// Stats for the active session, recomputed from the record store.
    pub fn stats(&self) -> Result<SessionStats, DbError> {
        self.recorder.stats()
    }

    /// Begin a round: draw a target uniformly from the pool, play its
    /// tone, and wait for guesses. Starting over an unfinished round
    /// abandons it; its recorded attempts stay in the store.
    pub fn start(&mut self) -> Result<&Task, EngineError> {
        if self.pool.is_empty() {
            return Err(EngineError::NoCandidates);
        }
        let idx = self.rng.gen_range(0..self.pool.len());
        let target = self.pool.candidates()[idx];

        let task = Task::new(target);
        log::debug!("Task {}: target {}", task.id, target);
        self.tone.play(target.pitch_number() as u8);
        self.task = Some(task);
        self.task.as_ref().ok_or(EngineError::NoActiveTask)
    }

    /// Judge one guess. The attempt is recorded before anything else;
    /// a correct guess resolves the round and immediately starts the
    /// next one from the same pool.
    pub fn submit_guess(&mut self, guessed: NoteIdentity) -> Result<GuessOutcome, EngineError> {
        let (task_id, target, attempt_number, play_again_count) = match &self.task {
            Some(t) => (t.id, t.target, t.attempt_number, t.play_again_count),
            None => return Err(EngineError::NoActiveTask),
        };

        // Full-identity comparison: name AND octave. An octave miss on the
        // right pitch class is still wrong.
        let is_correct = guessed == target;

        let ctx = AttemptContext {
            task_id,
            target,
            guessed,
            is_correct,
            attempt_number,
            play_again_count,
            note_group: &self.note_group,
            octave_range_low: self.pool.octave_low(),
            octave_range_high: self.pool.octave_high(),
        };
        let record_error = match self.recorder.record(&ctx) {
            Ok(_) => None,
            Err(e) => {
                log::error!("Failed to record attempt: {}", e);
                Some(e)
            }
        };

        let verdict = if is_correct {
            self.task = None;
            self.start()?;
            Verdict::Correct(target)
        } else {
            if let Some(task) = self.task.as_mut() {
                task.attempt_number += 1;
                task.wrong_guesses.insert(guessed);
            }
            Verdict::Incorrect(guessed)
        };

        Ok(GuessOutcome {
            verdict,
            record_error,
        })
    }

    /// Sound the current target again. Counts toward the task's
    /// play-again tally; no state transition.
    pub fn replay(&mut self) -> Result<(), EngineError> {
        let target = match self.task.as_mut() {
            Some(task) => {
                task.play_again_count += 1;
                task.target
            }
            None => return Err(EngineError::NoActiveTask),
        };
        self.tone.play(target.pitch_number() as u8);
        Ok(())
    }

    /// Swap in a new pool configuration and start a fresh round from it.
    /// Validation failures leave the engine untouched; on success any
    /// pending round is abandoned (its attempts remain recorded).
    pub fn reconfigure(
        &mut self,
        note_group: &str,
        selection: &[PitchClass],
        octave_low: i32,
        octave_high: i32,
    ) -> Result<&Task, EngineError> {
        let pool = NotePool::build(selection, octave_low, octave_high)?;
        self.pool = pool;
        self.note_group = note_group.to_string();
        self.task = None;
        self.start()
    }

    /// Forwarded to the tone sink; takes effect on the next tone.
    pub fn set_instrument(&mut self, program: u8) {
        self.tone.set_instrument(program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentTone;
    use crate::db::Database;
    use PitchClass::*;

    fn engine(
        selection: &[PitchClass],
        low: i32,
        high: i32,
        seed: u64,
    ) -> TrainingEngine<SilentTone> {
        let recorder = SessionRecorder::new(Database::open_in_memory().unwrap());
        TrainingEngine::new(
            "All",
            selection,
            low,
            high,
            recorder,
            SilentTone::default(),
            Some(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_target_always_drawn_from_pool() {
        let mut eng = engine(&[C, E, G], 3, 5, 7);
        for _ in 0..50 {
            eng.start().unwrap();
            let target = eng.target().unwrap();
            assert!(eng.pool().contains(&target));
        }
    }

    #[test]
    fn test_start_plays_target_tone() {
        let mut eng = engine(&[C, E, G], 4, 4, 1);
        eng.start().unwrap();
        let target = eng.target().unwrap();
        assert_eq!(eng.tone().played, vec![target.pitch_number() as u8]);
    }

    #[test]
    fn test_guess_before_start_fails() {
        let mut eng = engine(&[C], 4, 4, 0);
        let err = eng.submit_guess(NoteIdentity::new(C, 4)).unwrap_err();
        assert!(matches!(err, EngineError::NoActiveTask));
        assert!(matches!(eng.replay().unwrap_err(), EngineError::NoActiveTask));
    }

    #[test]
    fn test_correct_guess_resolves_and_chains() {
        let mut eng = engine(&[C, E, G], 4, 4, 3);
        eng.start().unwrap();
        let target = eng.target().unwrap();
        let first_task_id = eng.current_task().unwrap().id;

        let outcome = eng.submit_guess(target).unwrap();
        assert_eq!(outcome.verdict, Verdict::Correct(target));
        assert!(outcome.record_error.is_none());

        // A fresh task is already awaiting guesses, drawn from the same pool
        let next = eng.current_task().unwrap();
        assert_ne!(next.id, first_task_id);
        assert_eq!(next.attempt_number, 1);
        assert_eq!(next.play_again_count, 0);
        assert!(next.wrong_guesses.is_empty());
        assert!(eng.pool().contains(&next.target));
        assert_eq!(eng.pool().len(), 3);
    }

    #[test]
    fn test_incorrect_guess_keeps_target() {
        let mut eng = engine(&[C, E, G], 4, 4, 3);
        eng.start().unwrap();
        let target = eng.target().unwrap();
        let wrong = eng
            .pool()
            .candidates()
            .iter()
            .copied()
            .find(|n| *n != target)
            .unwrap();

        let outcome = eng.submit_guess(wrong).unwrap();
        assert_eq!(outcome.verdict, Verdict::Incorrect(wrong));

        let task = eng.current_task().unwrap();
        assert_eq!(task.target, target);
        assert_eq!(task.attempt_number, 2);
        assert!(task.wrong_guesses.contains(&wrong));

        let stats = eng.stats().unwrap();
        assert_eq!(stats.total_attempts, 1);
        assert_eq!(stats.completed_tasks, 0);
    }

    #[test]
    fn test_out_of_pool_guess_is_ordinary_incorrect() {
        let mut eng = engine(&[C], 4, 4, 0);
        eng.start().unwrap();
        let outside = NoteIdentity::new(B, 9);
        let outcome = eng.submit_guess(outside).unwrap();
        assert_eq!(outcome.verdict, Verdict::Incorrect(outside));
        assert_eq!(eng.current_task().unwrap().attempt_number, 2);
    }

    #[test]
    fn test_wrong_then_right_record_trail() {
        // Miss once, then solve, on a 3-candidate pool
        let mut eng = engine(&[C, E, G], 4, 4, 11);
        eng.start().unwrap();
        let target = eng.target().unwrap();
        let wrong = eng
            .pool()
            .candidates()
            .iter()
            .copied()
            .find(|n| *n != target)
            .unwrap();

        eng.submit_guess(wrong).unwrap();
        eng.submit_guess(target).unwrap();

        let session = eng.recorder().session_id().to_string();
        let records = eng.recorder().db().session_attempts(&session).unwrap();
        assert_eq!(records.len(), 2);

        // The recorded attempt_number is the ordinal of that guess
        assert_eq!(records[0].attempt_number, 1);
        assert!(!records[0].is_correct);
        assert_eq!(records[0].guessed_note_name, wrong.name.to_string());
        assert_eq!(records[1].attempt_number, 2);
        assert!(records[1].is_correct);
        assert_eq!(records[0].task_id, records[1].task_id);

        let stats = eng.stats().unwrap();
        assert_eq!(stats.total_attempts, 2);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.first_try_correct, 0);
        assert_eq!(stats.accuracy, 0.0);
    }

    #[test]
    fn test_first_try_accuracy() {
        let mut eng = engine(&[C, E, G], 4, 4, 5);
        eng.start().unwrap();
        let target = eng.target().unwrap();
        eng.submit_guess(target).unwrap();

        let stats = eng.stats().unwrap();
        assert_eq!(stats.first_try_correct, 1);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.accuracy, 1.0);
    }

    #[test]
    fn test_replay_counts_per_task() {
        let mut eng = engine(&[C, E], 4, 4, 9);
        eng.start().unwrap();
        eng.replay().unwrap();
        eng.replay().unwrap();
        assert_eq!(eng.current_task().unwrap().play_again_count, 2);
        // Two replays plus the starting tone
        assert_eq!(eng.tone().played.len(), 3);

        let target = eng.target().unwrap();
        eng.submit_guess(target).unwrap();

        let session = eng.recorder().session_id().to_string();
        let records = eng.recorder().db().session_attempts(&session).unwrap();
        assert_eq!(records[0].play_again_count, 2);

        // The tally resets with the new task
        assert_eq!(eng.current_task().unwrap().play_again_count, 0);
    }

    #[test]
    fn test_seeded_engines_are_reproducible() {
        let run = |seed: u64| -> Vec<NoteIdentity> {
            let mut eng = engine(&PitchClass::ALL, 2, 7, seed);
            let mut targets = Vec::new();
            eng.start().unwrap();
            for _ in 0..10 {
                let t = eng.target().unwrap();
                targets.push(t);
                eng.submit_guess(t).unwrap();
            }
            targets
        };

        assert_eq!(run(42), run(42));
        // Practically certain to differ over 10 draws from 72 candidates
        assert_ne!(run(42), run(43));
    }

    #[test]
    fn test_reconfigure_swaps_pool_and_restarts() {
        let mut eng = engine(&[C, E, G], 4, 4, 2);
        eng.start().unwrap();

        eng.reconfigure("Pentatonic", &[C, D, E, G, A], 5, 5).unwrap();
        assert_eq!(eng.note_group(), "Pentatonic");
        assert_eq!(eng.pool().len(), 5);
        let task = eng.current_task().unwrap();
        assert_eq!(task.target.octave, 5);

        // Records now carry the new configuration
        let new_target = eng.target().unwrap();
        eng.submit_guess(new_target).unwrap();
        let session = eng.recorder().session_id().to_string();
        let records = eng.recorder().db().session_attempts(&session).unwrap();
        let last = records.last().unwrap();
        assert_eq!(last.note_group, "Pentatonic");
        assert_eq!(last.octave_range_low, 5);
        assert_eq!(last.octave_range_high, 5);
    }

    #[test]
    fn test_invalid_reconfigure_leaves_engine_untouched() {
        let mut eng = engine(&[C, E, G], 4, 4, 2);
        eng.start().unwrap();
        let target = eng.target().unwrap();

        let err = eng.reconfigure("All", &[C], 6, 5).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Configuration(ConfigurationError::InvertedOctaveRange { .. })
        ));

        // Old pool and pending task both intact
        assert_eq!(eng.pool().len(), 3);
        assert_eq!(eng.target().unwrap(), target);
        assert_eq!(eng.note_group(), "All");
    }

    #[test]
    fn test_persistence_failure_surfaces_but_does_not_block() {
        let mut eng = engine(&[C, E, G], 4, 4, 8);
        eng.start().unwrap();
        let target = eng.target().unwrap();

        // Break the store out from under the engine
        eng.recorder()
            .db()
            .conn
            .execute("DROP TABLE attempts", [])
            .unwrap();

        let outcome = eng.submit_guess(target).unwrap();
        assert_eq!(outcome.verdict, Verdict::Correct(target));
        assert!(outcome.record_error.is_some());

        // The round resolved and the next one started anyway
        assert!(eng.current_task().is_some());
    }
}
