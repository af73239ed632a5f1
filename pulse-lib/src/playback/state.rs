//! Playback phase and the state snapshot handed to consumers.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Mode of the playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Phase {
    #[default]
    Idle = 0,
    Loaded = 1,
    Playing = 2,
    Paused = 3,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Loaded,
            2 => Self::Playing,
            3 => Self::Paused,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Playing => "playing",
            Self::Paused => "paused",
        };
        f.write_str(label)
    }
}

/// Phase shared with the metronome worker.
///
/// Only `PlaybackClock` stores into it; every other holder reads.
#[derive(Debug, Clone, Default)]
pub struct PhaseCell(Arc<AtomicU8>);

impl PhaseCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_playing(&self) -> bool {
        self.load() == Phase::Playing
    }

    pub(crate) fn store(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::Release);
    }
}

/// Timing state owned by `PlaybackClock`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub phase: Phase,
    pub pause_offset: f64,
    pub start_timestamp: f64,
    pub repeat: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            pause_offset: 0.0,
            start_timestamp: 0.0,
            repeat: false,
        }
    }
}
