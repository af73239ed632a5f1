//! rodio implementation of the playback backend and metronome tones.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, error, warn};
use rodio::mixer::Mixer;
use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::{BackendCommand, BackendError, LoadError, PlaybackError};
use crate::metronome::{Beat, Tone, ToneSink};
use crate::settings::{EngineSettings, ToneSettings};
use crate::track::probe_duration;

use super::AudioBackend;

/// Process-wide audio output handle.
///
/// Build it once with [`open_default`](Self::open_default), hand it to
/// `PlaybackClock::new`, and drop it at exit to release the device.
pub struct RodioBackend {
    stream: OutputStream,
    sink: Sink,
    source: Option<PathBuf>,
    volume: f32,
}

impl RodioBackend {
    /// Open the default output device, retrying while it is busy.
    pub fn open_default(settings: &EngineSettings) -> Result<Self, PlaybackError> {
        let attempts = settings.output_open_retries.max(1);
        let mut stream = None;
        for attempt in 1..=attempts {
            match OutputStreamBuilder::open_default_stream() {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(err) => {
                    if attempt == attempts {
                        error!(
                            "failed to open default output stream after {} attempts: {}",
                            attempts, err
                        );
                        return Err(PlaybackError::Output(err.to_string()));
                    }
                    warn!(
                        "open_default_stream attempt {}/{} failed: {}",
                        attempt, attempts, err
                    );
                    thread::sleep(settings.output_open_retry_delay());
                }
            }
        }
        let mut stream = stream.ok_or_else(|| PlaybackError::Output("no output stream".into()))?;
        stream.log_on_drop(false);

        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        sink.set_volume(settings.volume);

        Ok(Self {
            stream,
            sink,
            source: None,
            volume: settings.volume,
        })
    }

    /// Tone source that mixes metronome beats into the same output.
    pub fn tones(&self, settings: ToneSettings) -> RodioTones {
        RodioTones {
            mixer: self.stream.mixer().clone(),
            settings,
        }
    }

    fn decoder(path: &Path) -> Result<Decoder<BufReader<File>>, String> {
        let file = File::open(path).map_err(|err| err.to_string())?;
        Decoder::new(BufReader::new(file)).map_err(|err| err.to_string())
    }
}

impl AudioBackend for RodioBackend {
    fn open(&mut self, path: &Path) -> Result<f64, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|err| LoadError::Unsupported {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        let duration = match probe_duration(path) {
            Ok(seconds) => seconds,
            Err(err) => {
                debug!("probe failed for {}: {}", path.display(), err);
                decoder
                    .total_duration()
                    .map(|d| d.as_secs_f64())
                    .filter(|seconds| *seconds > 0.0)
                    .ok_or_else(|| LoadError::UnknownDuration(path.to_path_buf()))?
            }
        };

        self.sink.stop();
        self.source = Some(path.to_path_buf());
        Ok(duration)
    }

    fn reopen(&mut self, path: &Path) -> Result<(), LoadError> {
        // `play` decodes the file again, so existence is all that is checked.
        File::open(path).map_err(|source| LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        self.sink.stop();
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self, offset: f64) -> Result<(), BackendError> {
        let path = self
            .source
            .as_deref()
            .ok_or_else(|| BackendError::new(BackendCommand::Play, "no source opened"))?;
        let mut decoder =
            Self::decoder(path).map_err(|reason| BackendError::new(BackendCommand::Reload, reason))?;
        if offset > 0.0 {
            decoder
                .try_seek(Duration::from_secs_f64(offset))
                .map_err(|err| BackendError::new(BackendCommand::Play, err.to_string()))?;
        }

        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());
        self.sink.set_volume(self.volume);
        self.sink.append(decoder);
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.sink.pause();
        Ok(())
    }

    fn unpause(&mut self) -> Result<(), BackendError> {
        self.sink.play();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.sink.stop();
        Ok(())
    }
}

/// Metronome tones rendered as short sine bursts on the shared mixer.
#[derive(Clone)]
pub struct RodioTones {
    mixer: Mixer,
    settings: ToneSettings,
}

impl ToneSink for RodioTones {
    fn play(&self, beat: Beat) {
        let frequency = match beat.tone {
            Tone::Accent => self.settings.accent_hz,
            Tone::Regular => self.settings.regular_hz,
        };
        let source = SineWave::new(frequency)
            .take_duration(self.settings.duration())
            .amplify(self.settings.amplitude);
        self.mixer.add(source);
    }
}
