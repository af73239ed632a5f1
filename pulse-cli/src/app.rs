//! Control-thread state: the playback session plus what the UI shows.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::info;
use pulse_lib::playback::{format_time, Phase, PlaybackClock, PlaybackEvent, Session};
use pulse_lib::settings::EngineSettings;
use pulse_lib::tools::timer::Clock;
use pulse_lib::Result;

/// Latest values delivered by the playback listener.
#[derive(Debug, Clone, Default)]
pub struct Readout {
    pub position: f64,
    pub formatted: String,
    pub phase: Phase,
    /// Track ran out with repeat off.
    pub finished: bool,
}

impl Readout {
    fn apply(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Position { seconds, formatted } => {
                self.position = seconds;
                self.formatted = formatted;
            }
            PlaybackEvent::PhaseChanged(phase) => {
                self.phase = phase;
                match phase {
                    Phase::Playing => self.finished = false,
                    Phase::Idle => {
                        self.position = 0.0;
                        self.formatted = format_time(0.0);
                    }
                    _ => {}
                }
            }
            PlaybackEvent::TrackEnded { repeated } => {
                self.finished = !repeated;
                self.position = 0.0;
                self.formatted = format_time(0.0);
            }
        }
    }
}

pub struct App {
    pub session: Session,
    pub input: PathBuf,
    pub readout: Arc<Mutex<Readout>>,
}

impl App {
    pub fn new(
        mut playback: PlaybackClock,
        clock: Arc<dyn Clock>,
        settings: &EngineSettings,
        input: impl Into<PathBuf>,
    ) -> Self {
        let readout = Arc::new(Mutex::new(Readout {
            formatted: format_time(0.0),
            ..Readout::default()
        }));
        let sink = readout.clone();
        playback.set_listener(Arc::new(move |event| {
            if let Ok(mut readout) = sink.lock() {
                readout.apply(event);
            }
        }));

        Self {
            session: Session::with_settings(playback, clock, settings),
            input: input.into(),
            readout,
        }
    }

    pub fn playback(&self) -> &PlaybackClock {
        self.session.playback()
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackClock {
        self.session.playback_mut()
    }

    /// Bind the input again and start playing it from the top.
    pub fn reload(&mut self) -> Result<()> {
        info!("reloading {}", self.input.display());
        let input = self.input.clone();
        self.playback_mut().load(&input)?;
        self.playback_mut().toggle_play_pause()
    }

    pub fn readout(&self) -> Readout {
        match self.readout.lock() {
            Ok(readout) => readout.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AsMut<Session> for App {
    fn as_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}
