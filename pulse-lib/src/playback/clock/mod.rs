//! The playback clock: state machine and position accounting.

mod controls;

use std::sync::Arc;

use log::{error, info};

use crate::backend::AudioBackend;
use crate::error::{BackendCommand, BackendError, PlaybackError};
use crate::metronome::{MetronomeScheduler, ToneSink};
use crate::tools::timer::Clock;
use crate::track::Track;

use super::events::{EventCallback, PlaybackEvent};
use super::state::{Phase, PhaseCell, PlaybackState};

/// Primary playback controller.
///
/// `PlaybackClock` owns the bound [`Track`], the timing state and the audio
/// backend handle. Position is never read back from the backend: while
/// playing it is `now() - start_timestamp`, and every resume, seek or restart
/// rebases `start_timestamp` so that expression stays correct.
///
/// Transitions into and out of `Playing` start and stop the attached
/// metronome before returning.
pub struct PlaybackClock {
    backend: Box<dyn AudioBackend>,
    clock: Arc<dyn Clock>,
    phase: PhaseCell,
    state: PlaybackState,
    track: Option<Track>,
    metronome: Option<MetronomeScheduler>,
    listener: Option<EventCallback>,
}

impl PlaybackClock {
    /// Create an idle clock driving `backend`.
    pub fn new(backend: impl AudioBackend + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend: Box::new(backend),
            clock,
            phase: PhaseCell::new(),
            state: PlaybackState::default(),
            track: None,
            metronome: None,
            listener: None,
        }
    }

    /// Create a metronome that follows this clock's phase and time source.
    ///
    /// Replaces (and shuts down) any previously attached metronome.
    pub fn attach_metronome(&mut self, tones: Arc<dyn ToneSink>) -> &MetronomeScheduler {
        let metronome = MetronomeScheduler::new(tones, self.phase.clone(), self.clock.clone());
        self.metronome.insert(metronome)
    }

    pub fn metronome(&self) -> Option<&MetronomeScheduler> {
        self.metronome.as_ref()
    }

    /// Register the UI sink for phase and position events.
    pub fn set_listener(&mut self, listener: EventCallback) {
        self.listener = Some(listener);
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Read-only phase handle for other threads.
    pub fn phase_cell(&self) -> PhaseCell {
        self.phase.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    /// Duration of the bound track in seconds, `0.0` when idle.
    pub fn duration(&self) -> f64 {
        self.track.as_ref().map(Track::duration).unwrap_or(0.0)
    }

    pub fn pause_offset(&self) -> f64 {
        self.state.pause_offset
    }

    pub fn is_repeat(&self) -> bool {
        self.state.repeat
    }

    pub(crate) fn now(&self) -> f64 {
        self.clock.now()
    }

    pub(crate) fn notify(&self, event: PlaybackEvent) {
        if let Some(listener) = &self.listener {
            listener(event);
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.state.phase == phase {
            return;
        }
        info!("playback {} -> {}", self.state.phase, phase);
        self.state.phase = phase;
        self.phase.store(phase);
        self.notify(PlaybackEvent::PhaseChanged(phase));
    }

    /// Clamp a position into `[0, duration]`. NaN maps to zero.
    fn clamp_offset(&self, seconds: f64) -> f64 {
        if seconds.is_nan() {
            return 0.0;
        }
        seconds.clamp(0.0, self.duration())
    }

    /// Rebase onto `offset`, enter `Playing` and start the metronome.
    fn enter_playing(&mut self, offset: f64) {
        self.state.pause_offset = offset;
        self.state.start_timestamp = self.now() - offset;
        self.set_phase(Phase::Playing);
        if let Some(metronome) = &self.metronome {
            if metronome.is_enabled() {
                metronome.start();
            }
        }
    }

    fn halt_metronome(&self) {
        if let Some(metronome) = &self.metronome {
            metronome.stop();
        }
    }

    /// Drop back to `Idle` with nothing bound.
    fn reset_idle(&mut self) {
        self.track = None;
        self.state.pause_offset = 0.0;
        self.state.start_timestamp = 0.0;
        self.state.repeat = false;
        self.set_phase(Phase::Idle);
        self.halt_metronome();
    }

    /// A rejected backend command ends the session rather than leaving the
    /// position accounting out of step with the audio.
    fn fall_back(&mut self, err: BackendError) -> PlaybackError {
        error!("{}; falling back to idle", err);
        if err.command != BackendCommand::Stop {
            let _ = self.backend.stop();
        }
        self.reset_idle();
        PlaybackError::Backend(err)
    }
}
