//! Notifications sent to the UI sink.

use std::sync::Arc;

use super::state::Phase;

/// Event delivered to the registered listener.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Periodic position sample from the poller.
    Position { seconds: f64, formatted: String },
    /// The state machine entered a new phase.
    PhaseChanged(Phase),
    /// Playback ran past the end of the track.
    TrackEnded { repeated: bool },
}

/// Listener callback. Invoked on the control thread.
pub type EventCallback = Arc<dyn Fn(PlaybackEvent) + Send + Sync>;

/// Format seconds as `m:ss`, truncating fractions.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
