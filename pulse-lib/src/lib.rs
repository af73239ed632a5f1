//! # Pulse Playback Library
//!
//! Timing core for a single-track audio player with a metronome.
//!
//! [`PlaybackClock`](playback::PlaybackClock) owns the play/pause/seek state
//! machine and derives position from a monotonic [`Clock`](tools::timer::Clock)
//! instead of asking the audio device. [`MetronomeScheduler`](metronome::MetronomeScheduler)
//! ticks on its own thread and only while playback is running, and
//! [`PositionPoller`](playback::PositionPoller) reports position and handles
//! end of track from the control loop.

pub mod backend;
pub mod error;
pub mod metronome;
pub mod playback;
pub mod settings;
pub mod test_support;
pub mod tools;
pub mod track;

pub use error::{PlaybackError, Result};
pub use playback::{Phase, PlaybackClock, PlaybackEvent, PositionPoller, Session};
pub use track::Track;
