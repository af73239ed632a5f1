//! Engine configuration.
//!
//! Settings are plain serde structs so front ends can read them from JSON.
//! Every field has a default; a partial document only overrides what it
//! names.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metronome::{DEFAULT_BPM, MAX_BPM, MIN_BPM};

/// Metronome tone shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneSettings {
    pub regular_hz: f32,
    pub accent_hz: f32,
    pub duration_ms: u64,
    pub amplitude: f32,
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            regular_hz: 440.0,
            accent_hz: 660.0,
            duration_ms: 100,
            amplitude: 0.5,
        }
    }
}

impl ToneSettings {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Position sampling period.
    pub poll_interval_ms: u64,
    /// How long position reports are suppressed after a scrub.
    pub scrub_guard_ms: u64,
    pub bpm: u32,
    pub metronome_enabled: bool,
    pub repeat: bool,
    /// Linear output gain for the track.
    pub volume: f32,
    pub tones: ToneSettings,
    pub output_open_retries: usize,
    pub output_open_retry_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            scrub_guard_ms: 200,
            bpm: DEFAULT_BPM,
            metronome_enabled: false,
            repeat: false,
            volume: 1.0,
            tones: ToneSettings::default(),
            output_open_retries: 20,
            output_open_retry_ms: 100,
        }
    }
}

impl EngineSettings {
    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.normalized())
    }

    /// Read settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn scrub_guard(&self) -> Duration {
        Duration::from_millis(self.scrub_guard_ms)
    }

    pub fn output_open_retry_delay(&self) -> Duration {
        Duration::from_millis(self.output_open_retry_ms)
    }

    fn normalized(mut self) -> Self {
        self.bpm = self.bpm.clamp(MIN_BPM, MAX_BPM);
        self.poll_interval_ms = self.poll_interval_ms.max(1);
        self.volume = self.volume.max(0.0);
        self.tones.amplitude = self.tones.amplitude.clamp(0.0, 1.0);
        self.output_open_retries = self.output_open_retries.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_player_behavior() {
        let settings = EngineSettings::default();
        assert_eq!(settings.poll_interval(), Duration::from_millis(500));
        assert_eq!(settings.scrub_guard(), Duration::from_millis(200));
        assert_eq!(settings.bpm, 120);
        assert_eq!(settings.tones.regular_hz, 440.0);
        assert_eq!(settings.tones.accent_hz, 660.0);
        assert_eq!(settings.tones.duration(), Duration::from_millis(100));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = EngineSettings::from_json(r#"{"bpm":90,"tones":{"accent_hz":880.0}}"#)
            .expect("parse settings");
        assert_eq!(settings.bpm, 90);
        assert_eq!(settings.tones.accent_hz, 880.0);
        assert_eq!(settings.tones.regular_hz, 440.0);
        assert_eq!(settings.poll_interval_ms, 500);
    }

    #[test]
    fn out_of_range_values_are_normalized() {
        let settings = EngineSettings::from_json(r#"{"bpm":1000,"poll_interval_ms":0}"#).unwrap();
        assert_eq!(settings.bpm, 240);
        assert_eq!(settings.poll_interval_ms, 1);
    }

    #[test]
    fn malformed_json_is_a_settings_error() {
        let err = EngineSettings::from_json("{bpm:").unwrap_err();
        assert!(matches!(err, ConfigError::Settings(_)));
    }

    #[test]
    fn pretty_json_parses_back() {
        let settings = EngineSettings::default();
        let parsed = EngineSettings::from_json(&settings.to_json_pretty()).unwrap();
        assert_eq!(parsed, settings);
    }
}
