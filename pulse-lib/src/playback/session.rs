//! A playback clock paired with its position poller.

use std::sync::Arc;
use std::time::Duration;

use log::error;

use crate::error::Result;
use crate::settings::EngineSettings;
use crate::tools::schedule::{PeriodicScheduler, TaskId};
use crate::tools::timer::Clock;

use super::clock::PlaybackClock;
use super::poller::{PollOutcome, PositionPoller};

pub struct Session {
    playback: PlaybackClock,
    poller: PositionPoller,
}

impl Session {
    pub fn new(playback: PlaybackClock, poller: PositionPoller) -> Self {
        Self { playback, poller }
    }

    /// Build a session whose poller shares `clock` with `playback`.
    pub fn with_settings(
        playback: PlaybackClock,
        clock: Arc<dyn Clock>,
        settings: &EngineSettings,
    ) -> Self {
        Self::new(playback, PositionPoller::from_settings(clock, settings))
    }

    pub fn playback(&self) -> &PlaybackClock {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackClock {
        &mut self.playback
    }

    pub fn is_seeking(&self) -> bool {
        self.poller.is_seeking()
    }

    pub fn poll(&mut self) -> Result<PollOutcome> {
        self.poller.poll(&mut self.playback)
    }

    pub fn scrub(&mut self, target: f64) -> Result<()> {
        self.poller.scrub(&mut self.playback, target)
    }

    /// Register position polling on `scheduler` at `interval`.
    ///
    /// Poll failures are logged; the clock has already fallen back to idle.
    pub fn schedule_polling<Ctx>(scheduler: &mut PeriodicScheduler<Ctx>, interval: Duration) -> TaskId
    where
        Ctx: AsMut<Session> + 'static,
    {
        scheduler.schedule(interval, |ctx: &mut Ctx| {
            if let Err(err) = ctx.as_mut().poll() {
                error!("position poll failed: {}", err);
            }
        })
    }
}

impl AsMut<Session> for Session {
    fn as_mut(&mut self) -> &mut Session {
        self
    }
}
