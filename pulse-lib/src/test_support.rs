//! Test doubles for the audio backend and tone source.
//!
//! Both doubles are cheap clones over shared state, so a test can move one
//! into the engine and keep another to inspect what happened.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::backend::AudioBackend;
use crate::error::{BackendCommand, BackendError, LoadError};
use crate::metronome::{Beat, ToneSink};

/// A backend call as seen by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Open(PathBuf),
    Reopen(PathBuf),
    Play(f64),
    Pause,
    Unpause,
    Stop,
}

#[derive(Default)]
struct BackendLog {
    calls: Vec<BackendCall>,
    durations: HashMap<PathBuf, f64>,
    unopenable: HashSet<PathBuf>,
    failures: HashSet<FailPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FailPoint {
    Play,
    Pause,
    Unpause,
    Stop,
}

/// In-memory backend that records every call.
///
/// Unknown paths open with [`RecordingBackend::DEFAULT_DURATION`].
#[derive(Clone, Default)]
pub struct RecordingBackend {
    log: Arc<Mutex<BackendLog>>,
}

impl RecordingBackend {
    pub const DEFAULT_DURATION: f64 = 180.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Report `seconds` as the duration of `path`.
    pub fn with_duration(self, path: impl Into<PathBuf>, seconds: f64) -> Self {
        self.log.lock().unwrap().durations.insert(path.into(), seconds);
        self
    }

    /// Make `open(path)` and `reopen(path)` fail as an unsupported source.
    pub fn with_unopenable(self, path: impl Into<PathBuf>) -> Self {
        self.log.lock().unwrap().unopenable.insert(path.into());
        self
    }

    /// Reject every future `command` until [`heal`](Self::heal) is called.
    pub fn fail_on(&self, command: BackendCommand) {
        if let Some(point) = Self::fail_point(command) {
            self.log.lock().unwrap().failures.insert(point);
        }
    }

    pub fn heal(&self) {
        self.log.lock().unwrap().failures.clear();
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().calls.clear();
    }

    fn fail_point(command: BackendCommand) -> Option<FailPoint> {
        match command {
            BackendCommand::Play => Some(FailPoint::Play),
            BackendCommand::Pause => Some(FailPoint::Pause),
            BackendCommand::Unpause => Some(FailPoint::Unpause),
            BackendCommand::Stop => Some(FailPoint::Stop),
            BackendCommand::Reload => None,
        }
    }

    fn check_openable(log: &BackendLog, path: &Path) -> Result<(), LoadError> {
        if log.unopenable.contains(path) {
            return Err(LoadError::Unsupported {
                path: path.to_path_buf(),
                reason: "unopenable test source".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, call: BackendCall, point: FailPoint, command: BackendCommand) -> Result<(), BackendError> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(call);
        if log.failures.contains(&point) {
            return Err(BackendError::new(command, "injected failure"));
        }
        Ok(())
    }
}

impl AudioBackend for RecordingBackend {
    fn open(&mut self, path: &Path) -> Result<f64, LoadError> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(BackendCall::Open(path.to_path_buf()));
        Self::check_openable(&log, path)?;
        Ok(log
            .durations
            .get(path)
            .copied()
            .unwrap_or(Self::DEFAULT_DURATION))
    }

    fn reopen(&mut self, path: &Path) -> Result<(), LoadError> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(BackendCall::Reopen(path.to_path_buf()));
        Self::check_openable(&log, path)
    }

    fn play(&mut self, offset: f64) -> Result<(), BackendError> {
        self.record(BackendCall::Play(offset), FailPoint::Play, BackendCommand::Play)
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.record(BackendCall::Pause, FailPoint::Pause, BackendCommand::Pause)
    }

    fn unpause(&mut self) -> Result<(), BackendError> {
        self.record(BackendCall::Unpause, FailPoint::Unpause, BackendCommand::Unpause)
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.record(BackendCall::Stop, FailPoint::Stop, BackendCommand::Stop)
    }
}

/// Tone sink that keeps every beat it is asked to play.
#[derive(Clone, Default)]
pub struct RecordingTones {
    beats: Arc<(Mutex<Vec<Beat>>, Condvar)>,
}

impl RecordingTones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beats(&self) -> Vec<Beat> {
        self.beats.0.lock().unwrap().clone()
    }

    /// Block until at least `count` beats arrived. Returns `false` on timeout.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let (beats, arrived) = &*self.beats;
        let guard = beats.lock().unwrap();
        let (guard, _) = arrived
            .wait_timeout_while(guard, timeout, |beats| beats.len() < count)
            .unwrap();
        guard.len() >= count
    }
}

impl ToneSink for RecordingTones {
    fn play(&self, beat: Beat) {
        let (beats, arrived) = &*self.beats;
        beats.lock().unwrap().push(beat);
        arrived.notify_all();
    }
}
