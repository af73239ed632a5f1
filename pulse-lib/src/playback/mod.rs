//! Playback state machine, position polling and UI events.

mod clock;
mod events;
mod poller;
mod session;
mod state;

pub use clock::PlaybackClock;
pub use events::{format_time, EventCallback, PlaybackEvent};
pub use poller::{PollOutcome, PositionPoller};
pub use session::Session;
pub use state::{Phase, PhaseCell, PlaybackState};
