//! Loaded audio sources and duration probing.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;
use symphonia::core::codecs::{CodecParameters, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, ProbeResult};

use crate::error::LoadError;

/// An audio source bound to the playback clock.
///
/// The duration is kept in whole seconds; fractions are truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    path: PathBuf,
    duration_seconds: u64,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>, duration_seconds: u64) -> Self {
        Self {
            path: path.into(),
            duration_seconds,
        }
    }

    /// Build a track from a probed duration in seconds.
    pub fn from_probed(path: impl Into<PathBuf>, duration: f64) -> Self {
        let whole = if duration.is_finite() && duration > 0.0 {
            duration as u64
        } else {
            0
        };
        Self::new(path, whole)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    pub fn duration(&self) -> f64 {
        self.duration_seconds as f64
    }

    /// File name for display, falling back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Convert codec parameters to seconds using the time base and frame count.
pub fn time_from_frames(codec_params: &CodecParameters) -> Option<f64> {
    let tb = codec_params.time_base?;
    let frames = codec_params.n_frames?;
    let time = tb.calc_time(codec_params.start_ts + frames);
    Some(time.seconds as f64 + time.frac)
}

/// Probe `path` and return its playable duration in seconds.
///
/// Header metadata is used when present; otherwise every packet is scanned
/// for the last timestamp.
pub fn probe_duration(path: &Path) -> Result<f64, LoadError> {
    let mut probed = probe(path)?;

    let (track_id, params) = {
        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| LoadError::Unsupported {
                path: path.to_path_buf(),
                reason: "no decodable audio track".to_string(),
            })?;
        (track.id, track.codec_params.clone())
    };

    if let Some(seconds) = time_from_frames(&params).filter(|s| *s > 0.0) {
        return Ok(seconds);
    }

    debug!("no frame count in {}; scanning packets", path.display());
    let mut max_ts = 0u64;
    while let Ok(packet) = probed.format.next_packet() {
        if packet.track_id() == track_id {
            max_ts = max_ts.max(packet.ts() + packet.dur());
        }
    }

    let seconds = match (params.time_base, params.sample_rate) {
        (Some(tb), _) => {
            let time = tb.calc_time(max_ts);
            time.seconds as f64 + time.frac
        }
        (None, Some(rate)) if rate > 0 => max_ts as f64 / rate as f64,
        _ => 0.0,
    };

    if seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(LoadError::UnknownDuration(path.to_path_buf()))
    }
}

fn probe(path: &Path) -> Result<ProbeResult, LoadError> {
    let mut hints: Vec<Option<String>> = Vec::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hints.push(Some(ext.to_lowercase()));
    }
    // Always try without a hint as a fallback.
    hints.push(None);

    let mut last_error: Option<Error> = None;
    for hint in hints {
        let file = File::open(path).map_err(|source| LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        match probe_with_hint(Box::new(file), hint.as_deref()) {
            Ok(probed) => return Ok(probed),
            Err(err) => last_error = Some(err),
        }
    }

    Err(LoadError::Unsupported {
        path: path.to_path_buf(),
        reason: last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "probe failed".to_string()),
    })
}

fn probe_with_hint(
    source: Box<dyn MediaSource>,
    extension_hint: Option<&str>,
) -> Result<ProbeResult, Error> {
    let mut hint = Hint::new();
    if let Some(extension_str) = extension_hint {
        hint.with_extension(extension_str);
    }

    let mss = MediaSourceStream::new(source, Default::default());
    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();

    symphonia::default::get_probe().format(&hint, mss, &format_opts, &metadata_opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal 16-bit mono PCM WAV file.
    fn wav_bytes(sample_rate: u32, samples: u32) -> Vec<u8> {
        let data_len = samples * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(bytes.len() + data_len as usize, 0);
        bytes
    }

    #[test]
    fn probes_wav_duration() {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(&wav_bytes(8_000, 8_000 * 3)).unwrap();
        let seconds = probe_duration(file.path()).expect("probe wav");
        assert!((seconds - 3.0).abs() < 1e-6);
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = probe_duration(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, LoadError::Unreadable { .. }));
    }

    #[test]
    fn garbage_is_unsupported() {
        let mut file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        file.write_all(b"this is not audio at all").unwrap();
        let err = probe_duration(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Unsupported { .. }));
    }

    #[test]
    fn probed_duration_truncates_to_whole_seconds() {
        let track = Track::from_probed("/music/song.mp3", 180.97);
        assert_eq!(track.duration_seconds(), 180);
        assert_eq!(track.display_name(), "song.mp3");
        assert_eq!(Track::from_probed("x.wav", f64::NAN).duration_seconds(), 0);
    }
}
