//! Error types for the playback engine.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to bind a new audio source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported audio format in {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("could not determine the duration of {0}")]
    UnknownDuration(PathBuf),
}

/// Backend operation that was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCommand {
    Play,
    Pause,
    Unpause,
    Stop,
    Reload,
}

impl fmt::Display for BackendCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Unpause => "unpause",
            Self::Stop => "stop",
            Self::Reload => "reload",
        };
        f.write_str(name)
    }
}

/// The audio backend refused a transport command.
#[derive(Debug, Clone, Error)]
#[error("backend rejected {command}: {reason}")]
pub struct BackendError {
    pub command: BackendCommand,
    pub reason: String,
}

impl BackendError {
    pub fn new(command: BackendCommand, reason: impl Into<String>) -> Self {
        Self {
            command,
            reason: reason.into(),
        }
    }
}

/// Malformed configuration input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bpm input {0:?}")]
    InvalidBpm(String),

    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed settings: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Errors surfaced by `PlaybackClock` operations.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("audio output unavailable: {0}")]
    Output(String),
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
