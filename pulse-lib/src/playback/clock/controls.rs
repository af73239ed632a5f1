//! Transport operations for `PlaybackClock`.
//!
//! Every operation leaves the clock in a consistent phase: on backend
//! failure the clock is already `Idle` when the error is returned.

use std::path::Path;

use log::{info, warn};

use crate::error::{BackendCommand, BackendError, Result};
use crate::playback::state::Phase;
use crate::track::Track;

use super::PlaybackClock;

impl PlaybackClock {
    /// Bind the audio source at `path` and enter `Loaded`.
    ///
    /// Loading while playing interrupts playback. On failure the clock is
    /// left `Idle` with no track bound.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<&Track> {
        let path = path.as_ref();
        match self.backend.open(path) {
            Ok(duration) => {
                let track = Track::from_probed(path, duration);
                info!(
                    "loaded {} ({}s)",
                    track.display_name(),
                    track.duration_seconds()
                );
                self.state.pause_offset = 0.0;
                self.state.start_timestamp = 0.0;
                self.set_phase(Phase::Loaded);
                self.halt_metronome();
                Ok(&*self.track.insert(track))
            }
            Err(err) => {
                warn!("failed to load {}: {}", path.display(), err);
                if self.track.is_some() {
                    let _ = self.backend.stop();
                }
                self.reset_idle();
                Err(err.into())
            }
        }
    }

    /// Play from `Loaded`/`Paused`, pause from `Playing`, ignore when idle.
    pub fn toggle_play_pause(&mut self) -> Result<()> {
        match self.phase() {
            Phase::Idle => Ok(()),
            Phase::Loaded => {
                let offset = self.state.pause_offset;
                if let Err(err) = self.backend.play(offset) {
                    return Err(self.fall_back(err));
                }
                self.enter_playing(offset);
                Ok(())
            }
            Phase::Paused => {
                if let Err(err) = self.backend.unpause() {
                    return Err(self.fall_back(err));
                }
                let offset = self.state.pause_offset;
                self.enter_playing(offset);
                Ok(())
            }
            Phase::Playing => {
                if let Err(err) = self.backend.pause() {
                    return Err(self.fall_back(err));
                }
                let elapsed = self.now() - self.state.start_timestamp;
                self.state.pause_offset = self.clamp_offset(elapsed);
                self.set_phase(Phase::Paused);
                self.halt_metronome();
                Ok(())
            }
        }
    }

    /// Stop playback and unbind the track. Calling it again is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        if self.track.is_none() && self.phase() == Phase::Idle {
            return Ok(());
        }
        let result = self.backend.stop();
        self.reset_idle();
        result.map_err(|err| {
            warn!("{} while stopping", err);
            err.into()
        })
    }

    /// Play the bound track again from the beginning.
    pub fn restart(&mut self) -> Result<()> {
        if self.track.is_none() {
            return Ok(());
        }
        self.relaunch(0.0)
    }

    /// Jump to `target` seconds, clamped to the track.
    ///
    /// Seeking always leaves the clock `Playing`, even when it was paused.
    pub fn seek(&mut self, target: f64) -> Result<()> {
        if self.track.is_none() {
            return Ok(());
        }
        let offset = self.clamp_offset(target);
        self.relaunch(offset)
    }

    /// Current position in seconds.
    ///
    /// Not clamped to the duration; running past the end is how the poller
    /// detects end of track.
    pub fn current_position(&self) -> f64 {
        match self.phase() {
            Phase::Playing => self.now() - self.state.start_timestamp,
            _ => self.state.pause_offset,
        }
    }

    /// Flip repeat mode. Returns the new value.
    pub fn toggle_repeat(&mut self) -> bool {
        self.set_repeat(!self.state.repeat)
    }

    pub fn set_repeat(&mut self, repeat: bool) -> bool {
        self.state.repeat = repeat;
        info!("repeat {}", if repeat { "on" } else { "off" });
        repeat
    }

    /// Stop, reload and play from `offset`, then rebase.
    fn relaunch(&mut self, offset: f64) -> Result<()> {
        let path = match &self.track {
            Some(track) => track.path().to_path_buf(),
            None => return Ok(()),
        };
        if let Err(err) = self.reload_and_play(&path, offset) {
            return Err(self.fall_back(err));
        }
        self.enter_playing(offset);
        Ok(())
    }

    fn reload_and_play(&mut self, path: &Path, offset: f64) -> std::result::Result<(), BackendError> {
        self.backend.stop()?;
        self.backend
            .reopen(path)
            .map_err(|err| BackendError::new(BackendCommand::Reload, err.to_string()))?;
        self.backend.play(offset)
    }
}
