//! Audio playback backend seam.
//!
//! `PlaybackClock` never touches an output device directly; it drives an
//! [`AudioBackend`]. [`device`] holds the rodio implementation and
//! `test_support` a recording double.

pub mod device;

use std::path::Path;

use crate::error::{BackendError, LoadError};

pub use self::device::{RodioBackend, RodioTones};

/// Transport commands the playback clock issues.
///
/// Implementations must be able to start playback at an arbitrary offset
/// into the opened source.
pub trait AudioBackend {
    /// Open `path` as the current source and return its duration in seconds.
    fn open(&mut self, path: &Path) -> Result<f64, LoadError>;

    /// Re-bind `path` ahead of a seek or restart.
    ///
    /// The duration is already known, so implementations may skip probing.
    fn reopen(&mut self, path: &Path) -> Result<(), LoadError> {
        self.open(path).map(|_| ())
    }

    /// Start the opened source from `offset` seconds.
    fn play(&mut self, offset: f64) -> Result<(), BackendError>;

    fn pause(&mut self) -> Result<(), BackendError>;

    fn unpause(&mut self) -> Result<(), BackendError>;

    fn stop(&mut self) -> Result<(), BackendError>;
}
