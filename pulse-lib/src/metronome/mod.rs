//! Background metronome gated by the playback phase.
//!
//! [`MetronomeScheduler`] keeps the user's tempo and on/off intent and runs
//! one long-lived worker thread. Beats are only produced while the metronome
//! is enabled *and* the shared [`PhaseCell`] reads `Playing`.

mod tone;
mod worker;

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::ConfigError;
use crate::playback::PhaseCell;
use crate::tools::timer::Clock;

pub use tone::{Beat, Tone, ToneSink, BEATS_PER_BAR};

use worker::{run_metronome_thread, Command, WorkerContext};

pub const MIN_BPM: u32 = 30;
pub const MAX_BPM: u32 = 240;
pub const DEFAULT_BPM: u32 = 120;

/// Seconds between beats at `bpm`.
pub fn beat_interval_for(bpm: u32) -> f64 {
    60.0 / bpm as f64
}

/// Parse user tempo input, clamping numeric values into range.
pub fn parse_bpm(input: &str) -> Result<u32, ConfigError> {
    let value = input
        .trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidBpm(input.to_string()))?;
    Ok(value.clamp(MIN_BPM as i64, MAX_BPM as i64) as u32)
}

/// Snapshot of the metronome's settings and progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetronomeConfig {
    pub bpm: u32,
    pub beat_interval: f64,
    /// User intent: metronome switched on.
    pub running: bool,
    /// Worker is emitting beats right now.
    pub ticking: bool,
    pub beat_counter: u64,
}

pub(crate) struct Shared {
    bpm: AtomicU32,
    running: AtomicBool,
    ticking: AtomicBool,
    beat_counter: AtomicU64,
}

impl Shared {
    fn beat_interval(&self) -> f64 {
        beat_interval_for(self.bpm.load(Ordering::SeqCst))
    }
}

pub struct MetronomeScheduler {
    shared: Arc<Shared>,
    phase: PhaseCell,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl MetronomeScheduler {
    /// Spawn the worker thread. The metronome starts disabled at 120 bpm.
    ///
    /// Beat deadlines are measured on `clock`.
    pub fn new(tones: Arc<dyn ToneSink>, phase: PhaseCell, clock: Arc<dyn Clock>) -> Self {
        let shared = Arc::new(Shared {
            bpm: AtomicU32::new(DEFAULT_BPM),
            running: AtomicBool::new(false),
            ticking: AtomicBool::new(false),
            beat_counter: AtomicU64::new(0),
        });
        let (commands, receiver) = mpsc::channel();
        let context = WorkerContext {
            commands: receiver,
            shared: shared.clone(),
            phase: phase.clone(),
            tones,
            clock,
        };
        let worker = thread::spawn(move || run_metronome_thread(context));

        Self {
            shared,
            phase,
            commands,
            worker: Some(worker),
        }
    }

    /// Set the tempo, clamped to 30..=240. Returns the applied value.
    pub fn set_bpm(&self, bpm: u32) -> u32 {
        let bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.shared.bpm.store(bpm, Ordering::SeqCst);
        debug!("metronome bpm set to {}", bpm);
        bpm
    }

    /// Apply raw tempo input. Non-numeric input is ignored and the previous
    /// tempo kept. Returns the tempo in effect afterwards.
    pub fn set_bpm_input(&self, input: &str) -> u32 {
        match parse_bpm(input) {
            Ok(bpm) => self.set_bpm(bpm),
            Err(err) => {
                debug!("ignoring {}", err);
                self.bpm()
            }
        }
    }

    pub fn bpm(&self) -> u32 {
        self.shared.bpm.load(Ordering::SeqCst)
    }

    /// Seconds between beats.
    pub fn beat_interval(&self) -> f64 {
        self.shared.beat_interval()
    }

    /// Switch the metronome on; ticking begins at once if playback is running.
    ///
    /// Enabling an already ticking metronome keeps its beat grid.
    pub fn enable(&self) {
        let was_enabled = self.shared.running.swap(true, Ordering::SeqCst);
        if !was_enabled {
            info!("metronome enabled at {} bpm", self.bpm());
        }
        if self.phase.is_playing() && !(was_enabled && self.is_ticking()) {
            self.start();
        }
    }

    /// Switch the metronome off. Safe to call repeatedly.
    pub fn disable(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.stop();
    }

    /// Flip the on/off intent. Returns the new state.
    pub fn toggle(&self) -> bool {
        if self.is_enabled() {
            self.disable();
            false
        } else {
            self.enable();
            true
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// True while the worker is producing beats.
    pub fn is_ticking(&self) -> bool {
        self.shared.ticking.load(Ordering::SeqCst)
    }

    /// Begin ticking from beat zero. Invoked when playback enters `Playing`.
    pub fn start(&self) {
        self.shared.ticking.store(true, Ordering::SeqCst);
        if self.commands.send(Command::Start).is_err() {
            self.shared.ticking.store(false, Ordering::SeqCst);
            warn!("metronome worker is gone; cannot start");
        }
    }

    /// Stop ticking.
    ///
    /// Waits up to one beat interval for the worker to confirm; after a
    /// confirmed stop no further beats are emitted.
    pub fn stop(&self) {
        let (ack, confirmed) = mpsc::channel();
        if self.commands.send(Command::Stop(ack)).is_err() {
            return;
        }
        let bound = Duration::from_secs_f64(self.beat_interval());
        if confirmed.recv_timeout(bound).is_err() {
            warn!("metronome did not confirm stop within {:?}", bound);
        }
    }

    /// Beats produced since the last start.
    pub fn beats_emitted(&self) -> u64 {
        self.shared.beat_counter.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> MetronomeConfig {
        MetronomeConfig {
            bpm: self.bpm(),
            beat_interval: self.beat_interval(),
            running: self.is_enabled(),
            ticking: self.is_ticking(),
            beat_counter: self.beats_emitted(),
        }
    }
}

impl Drop for MetronomeScheduler {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("metronome thread panicked during join");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::Phase;
    use crate::test_support::RecordingTones;
    use crate::tools::timer::ManualClock;
    use std::thread::sleep;

    const SETTLE: Duration = Duration::from_millis(60);
    const PATIENCE: Duration = Duration::from_secs(2);

    struct Rig {
        metronome: MetronomeScheduler,
        tones: RecordingTones,
        phase: PhaseCell,
        time: ManualClock,
    }

    fn rig(initial: Phase) -> Rig {
        let phase = PhaseCell::new();
        phase.store(initial);
        let time = ManualClock::starting_at(100.0);
        let tones = RecordingTones::new();
        let metronome =
            MetronomeScheduler::new(Arc::new(tones.clone()), phase.clone(), Arc::new(time.clone()));
        Rig {
            metronome,
            tones,
            phase,
            time,
        }
    }

    fn indices(tones: &RecordingTones) -> Vec<u64> {
        tones.beats().iter().map(|beat| beat.index).collect()
    }

    #[test]
    fn interval_is_exactly_sixty_over_bpm() {
        let rig = rig(Phase::Idle);
        for bpm in MIN_BPM..=MAX_BPM {
            assert_eq!(rig.metronome.set_bpm(bpm), bpm);
            assert_eq!(rig.metronome.beat_interval(), 60.0 / bpm as f64);
        }
    }

    #[test]
    fn numeric_input_is_clamped() {
        let rig = rig(Phase::Idle);
        assert_eq!(rig.metronome.set_bpm_input("10"), MIN_BPM);
        assert_eq!(rig.metronome.set_bpm_input("-5"), MIN_BPM);
        assert_eq!(rig.metronome.set_bpm_input(" 500 "), MAX_BPM);
        assert_eq!(rig.metronome.set_bpm(0), MIN_BPM);
    }

    #[test]
    fn invalid_input_keeps_previous_tempo() {
        let rig = rig(Phase::Idle);
        rig.metronome.set_bpm(96);
        for input in ["", "abc", "12.5", "1e3", "ninety"] {
            assert_eq!(rig.metronome.set_bpm_input(input), 96);
            assert_eq!(rig.metronome.bpm(), 96);
            assert_eq!(rig.metronome.beat_interval(), 60.0 / 96.0);
        }
        assert!(matches!(parse_bpm("abc"), Err(ConfigError::InvalidBpm(_))));
    }

    #[test]
    fn beats_follow_the_clock_with_accents_on_downbeats() {
        let rig = rig(Phase::Playing);
        rig.metronome.set_bpm(120);
        rig.metronome.enable();
        assert!(rig.tones.wait_for(1, PATIENCE));

        rig.time.advance_secs(0.25);
        sleep(SETTLE);
        assert_eq!(rig.tones.beats().len(), 1);

        for expected in 2..=9 {
            rig.time.advance_secs(0.25);
            rig.time.advance_secs(0.25);
            assert!(rig.tones.wait_for(expected, PATIENCE), "beat {}", expected);
        }
        rig.metronome.disable();

        let beats = rig.tones.beats();
        assert_eq!(indices(&rig.tones), (0..9).collect::<Vec<_>>());
        for beat in &beats {
            assert_eq!(beat.is_accented(), beat.index % 4 == 0, "beat {:?}", beat);
        }
    }

    #[test]
    fn enable_while_not_playing_stays_silent() {
        let rig = rig(Phase::Paused);
        rig.metronome.enable();
        rig.time.advance_secs(5.0);
        sleep(SETTLE);
        assert!(rig.metronome.is_enabled());
        assert!(rig.tones.beats().is_empty());
    }

    #[test]
    fn enabling_twice_keeps_the_beat_grid() {
        let rig = rig(Phase::Playing);
        rig.metronome.set_bpm(240);
        rig.metronome.enable();
        assert!(rig.tones.wait_for(1, PATIENCE));
        rig.time.advance_secs(0.25);
        assert!(rig.tones.wait_for(2, PATIENCE));

        rig.metronome.enable();
        sleep(SETTLE);
        assert_eq!(rig.tones.beats().len(), 2);

        rig.time.advance_secs(0.25);
        assert!(rig.tones.wait_for(3, PATIENCE));
        rig.metronome.disable();
        assert_eq!(indices(&rig.tones), vec![0, 1, 2]);
    }

    #[test]
    fn no_beats_after_stop_returns() {
        let rig = rig(Phase::Playing);
        rig.metronome.set_bpm(240);
        rig.metronome.enable();
        assert!(rig.tones.wait_for(1, PATIENCE));
        rig.metronome.stop();
        assert!(!rig.metronome.is_ticking());

        rig.time.advance_secs(10.0);
        sleep(SETTLE);
        assert_eq!(rig.tones.beats().len(), 1);
        assert!(rig.metronome.is_enabled());
    }

    #[test]
    fn leaving_playing_silences_worker_at_the_next_beat() {
        let rig = rig(Phase::Playing);
        rig.metronome.set_bpm(240);
        rig.metronome.enable();
        assert!(rig.tones.wait_for(1, PATIENCE));

        rig.phase.store(Phase::Paused);
        rig.time.advance_secs(0.25);
        sleep(SETTLE);
        assert!(!rig.metronome.is_ticking());
        rig.time.advance_secs(5.0);
        sleep(SETTLE);
        assert_eq!(rig.tones.beats().len(), 1);
    }

    #[test]
    fn tempo_change_lands_on_the_next_beat() {
        let rig = rig(Phase::Playing);
        rig.metronome.set_bpm(60);
        rig.metronome.enable();
        assert!(rig.tones.wait_for(1, PATIENCE));
        rig.metronome.set_bpm(240);

        // The pending beat still waits out the old interval.
        rig.time.advance_secs(0.5);
        sleep(SETTLE);
        assert_eq!(rig.tones.beats().len(), 1);
        rig.time.advance_secs(0.5);
        assert!(rig.tones.wait_for(2, PATIENCE));
        rig.time.advance_secs(0.25);
        assert!(rig.tones.wait_for(3, PATIENCE));
        rig.metronome.disable();
    }

    #[test]
    fn disable_is_idempotent() {
        let rig = rig(Phase::Idle);
        rig.metronome.disable();
        rig.metronome.disable();
        assert!(!rig.metronome.is_enabled());
        assert!(!rig.metronome.is_ticking());
    }

    #[test]
    fn restart_resets_beat_counter() {
        let rig = rig(Phase::Playing);
        rig.metronome.set_bpm(240);
        rig.metronome.enable();
        assert!(rig.tones.wait_for(1, PATIENCE));
        rig.time.advance_secs(0.25);
        assert!(rig.tones.wait_for(2, PATIENCE));

        rig.metronome.start();
        assert!(rig.tones.wait_for(3, PATIENCE));
        rig.metronome.disable();
        assert_eq!(indices(&rig.tones), vec![0, 1, 0]);
        assert_eq!(rig.metronome.beats_emitted(), 1);
    }

    #[test]
    fn config_snapshot_reflects_state() {
        let rig = rig(Phase::Idle);
        rig.metronome.set_bpm(150);
        rig.metronome.enable();
        let config = rig.metronome.config();
        assert_eq!(config.bpm, 150);
        assert_eq!(config.beat_interval, 0.4);
        assert!(config.running);
        assert!(!config.ticking);
        assert_eq!(config.beat_counter, 0);
    }
}
