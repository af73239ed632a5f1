//! Periodic position sampling and end-of-track handling.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::error::Result;
use crate::settings::EngineSettings;
use crate::tools::timer::Clock;

use super::clock::PlaybackClock;
use super::events::{format_time, PlaybackEvent};
use super::state::Phase;

/// What a single poll did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// Not playing, or a scrub is in progress.
    Skipped,
    /// Position sent to the listener.
    Reported { position: f64 },
    /// Track ended and was restarted.
    Repeated,
    /// Track ended and playback stopped.
    Stopped,
}

/// Samples the clock on each poll and reports position to the listener.
///
/// End of track is detected on the whole-second position: the track counts as
/// finished once the truncated position exceeds the truncated duration.
pub struct PositionPoller {
    clock: Arc<dyn Clock>,
    scrub_guard: f64,
    seeking_until: Option<f64>,
}

impl PositionPoller {
    pub fn new(clock: Arc<dyn Clock>, scrub_guard: Duration) -> Self {
        Self {
            clock,
            scrub_guard: scrub_guard.as_secs_f64(),
            seeking_until: None,
        }
    }

    pub fn from_settings(clock: Arc<dyn Clock>, settings: &EngineSettings) -> Self {
        Self::new(clock, settings.scrub_guard())
    }

    /// True while a recent scrub suppresses position reports.
    pub fn is_seeking(&self) -> bool {
        self.seeking_until
            .map_or(false, |until| self.clock.now() < until)
    }

    /// Seek on behalf of a user drag.
    ///
    /// Position reports are held back for the scrub guard so the UI does not
    /// snap back to a stale position mid-drag.
    pub fn scrub(&mut self, playback: &mut PlaybackClock, target: f64) -> Result<()> {
        if playback.track().is_none() {
            return Ok(());
        }
        self.seeking_until = Some(self.clock.now() + self.scrub_guard);
        debug!("scrubbing to {:.1}s", target);
        playback.seek(target)
    }

    /// Run one poll against `playback`.
    pub fn poll(&mut self, playback: &mut PlaybackClock) -> Result<PollOutcome> {
        if self.seeking_until.is_some() && !self.is_seeking() {
            self.seeking_until = None;
        }
        if playback.phase() != Phase::Playing || self.seeking_until.is_some() {
            return Ok(PollOutcome::Skipped);
        }

        let position = playback.current_position();
        let whole = position.max(0.0).floor();
        if whole <= playback.duration() {
            playback.notify(PlaybackEvent::Position {
                seconds: position,
                formatted: format_time(position),
            });
            return Ok(PollOutcome::Reported { position });
        }

        let repeated = playback.is_repeat();
        info!(
            "track ended at {}; {}",
            format_time(position),
            if repeated { "repeating" } else { "stopping" }
        );
        playback.notify(PlaybackEvent::TrackEnded { repeated });
        if repeated {
            playback.restart()?;
            Ok(PollOutcome::Repeated)
        } else {
            playback.stop()?;
            Ok(PollOutcome::Stopped)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::test_support::{BackendCall, RecordingBackend};
    use crate::tools::timer::ManualClock;

    const SONG: &str = "/music/long.flac";

    struct Rig {
        playback: PlaybackClock,
        poller: PositionPoller,
        time: ManualClock,
        backend: RecordingBackend,
        events: Arc<Mutex<Vec<PlaybackEvent>>>,
    }

    fn rig(duration: f64) -> Rig {
        let time = ManualClock::starting_at(50.0);
        let clock: Arc<dyn Clock> = Arc::new(time.clone());
        let backend = RecordingBackend::new().with_duration(SONG, duration);
        let mut playback = PlaybackClock::new(backend.clone(), clock.clone());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        playback.set_listener(Arc::new(move |event| sink.lock().unwrap().push(event)));
        playback.load(SONG).unwrap();
        Rig {
            playback,
            poller: PositionPoller::new(clock, Duration::from_millis(200)),
            time,
            backend,
            events,
        }
    }

    #[test]
    fn skips_unless_playing() {
        let mut rig = rig(185.0);
        assert_eq!(rig.poller.poll(&mut rig.playback).unwrap(), PollOutcome::Skipped);
        rig.playback.toggle_play_pause().unwrap();
        rig.playback.toggle_play_pause().unwrap();
        assert_eq!(rig.poller.poll(&mut rig.playback).unwrap(), PollOutcome::Skipped);
    }

    #[test]
    fn reports_position_while_playing() {
        let mut rig = rig(185.0);
        rig.playback.toggle_play_pause().unwrap();
        rig.time.advance_secs(65.5);
        let outcome = rig.poller.poll(&mut rig.playback).unwrap();
        assert!(matches!(outcome, PollOutcome::Reported { position } if (position - 65.5).abs() < 1e-6));
        assert!(rig.events.lock().unwrap().contains(&PlaybackEvent::Position {
            seconds: 65.5,
            formatted: "1:05".to_string(),
        }));
    }

    #[test]
    fn final_fractional_second_still_counts_as_playing() {
        let mut rig = rig(185.0);
        rig.playback.toggle_play_pause().unwrap();
        rig.time.advance_secs(185.9);
        assert!(matches!(
            rig.poller.poll(&mut rig.playback).unwrap(),
            PollOutcome::Reported { .. }
        ));
    }

    #[test]
    fn end_of_track_without_repeat_stops() {
        let mut rig = rig(185.0);
        rig.playback.toggle_play_pause().unwrap();
        rig.time.advance_secs(186.0);
        assert_eq!(rig.poller.poll(&mut rig.playback).unwrap(), PollOutcome::Stopped);
        assert_eq!(rig.playback.phase(), Phase::Idle);
        assert!(rig.playback.track().is_none());
        assert!(rig
            .events
            .lock()
            .unwrap()
            .contains(&PlaybackEvent::TrackEnded { repeated: false }));
    }

    #[test]
    fn end_of_track_with_repeat_restarts() {
        let mut rig = rig(185.0);
        rig.playback.toggle_repeat();
        rig.playback.toggle_play_pause().unwrap();
        rig.time.advance_secs(186.0);
        rig.backend.clear_calls();

        assert_eq!(rig.poller.poll(&mut rig.playback).unwrap(), PollOutcome::Repeated);
        assert_eq!(rig.playback.phase(), Phase::Playing);
        assert_eq!(rig.playback.current_position(), 0.0);
        assert!(rig.playback.is_repeat());
        assert_eq!(
            rig.backend.calls(),
            vec![
                BackendCall::Stop,
                BackendCall::Reopen(SONG.into()),
                BackendCall::Play(0.0)
            ]
        );

        rig.time.advance_secs(1.0);
        assert!(matches!(
            rig.poller.poll(&mut rig.playback).unwrap(),
            PollOutcome::Reported { .. }
        ));
    }

    #[test]
    fn scrub_suppresses_reports_for_the_guard() {
        let mut rig = rig(185.0);
        rig.playback.toggle_play_pause().unwrap();
        rig.poller.scrub(&mut rig.playback, 90.0).unwrap();
        assert!(rig.poller.is_seeking());
        assert_eq!(rig.poller.poll(&mut rig.playback).unwrap(), PollOutcome::Skipped);

        rig.time.advance(Duration::from_millis(250));
        assert!(!rig.poller.is_seeking());
        match rig.poller.poll(&mut rig.playback).unwrap() {
            PollOutcome::Reported { position } => assert!((position - 90.25).abs() < 1e-6),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn scrub_is_ignored_without_a_track() {
        let mut rig = rig(185.0);
        rig.playback.stop().unwrap();
        rig.poller.scrub(&mut rig.playback, 10.0).unwrap();
        assert!(!rig.poller.is_seeking());
    }
}
