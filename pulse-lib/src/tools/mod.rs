//! Timing utilities shared by the playback and metronome components.

pub mod schedule;
pub mod timer;
