//! Application settings structs, defaults and TOML persistence.
//!
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it wants to override.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::dsp::SpectrumConfig;

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Acquisition settings shared by live capture and file streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate delivered into the sample channel, in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count delivered into the sample channel.
    pub channels: u16,
    /// Sample channel capacity in frames; capacity in samples is
    /// `ring_frames * channels`.
    pub ring_frames: usize,
    /// Audio file to loop instead of opening the capture device.
    pub file: Option<PathBuf>,
    /// Frames decoded per file-stream write.
    pub chunk_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            ring_frames: 8192,
            file: None,
            chunk_frames: 512,
        }
    }
}

// ---------------------------------------------------------------------------
// LoopConfig
// ---------------------------------------------------------------------------

/// Consumer-side frame cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub fps: u32,
    /// Seconds between status log lines; `0` disables them.
    pub status_interval_secs: f32,
    /// Stop after this many seconds; `None` runs until the process is killed.
    pub run_secs: Option<f32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            status_interval_secs: 1.0,
            run_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use spectrum_tap::config::AppConfig;
///
/// // Returns Default when the file is missing
/// let config = AppConfig::load().unwrap();
/// println!("fft size {}", config.spectrum.fft_size);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub spectrum: SpectrumConfig,
    pub frame_loop: LoopConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::BandScale;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original, loaded);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.audio.sample_rate, 48_000);
        assert_eq!(cfg.audio.channels, 2);
        assert_eq!(cfg.audio.ring_frames, 8192);
        assert!(cfg.audio.file.is_none());
        assert_eq!(cfg.spectrum.fft_size, 1024);
        assert_eq!(cfg.spectrum.hop_size, 256);
        assert_eq!(cfg.spectrum.bands, 32);
        assert_eq!(cfg.spectrum.scale, BandScale::Logarithmic);
        assert_eq!(cfg.frame_loop.fps, 60);
        assert!(cfg.frame_loop.run_secs.is_none());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.audio.file = Some(PathBuf::from("/music/loop.flac"));
        cfg.audio.sample_rate = 44_100;
        cfg.audio.channels = 1;
        cfg.spectrum.fft_size = 2048;
        cfg.spectrum.scale = BandScale::Linear;
        cfg.spectrum.release = 0.05;
        cfg.frame_loop.run_secs = Some(2.5);

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.audio.file, Some(PathBuf::from("/music/loop.flac")));
        assert_eq!(loaded.audio.sample_rate, 44_100);
        assert_eq!(loaded.spectrum.fft_size, 2048);
        assert_eq!(loaded.spectrum.scale, BandScale::Linear);
        assert_eq!(loaded.spectrum.release, 0.05);
        assert_eq!(loaded.frame_loop.run_secs, Some(2.5));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[spectrum]\nbands = 16\n\n[audio]\nchannels = 1\n").expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.spectrum.bands, 16);
        assert_eq!(cfg.spectrum.fft_size, 1024);
        assert_eq!(cfg.audio.channels, 1);
        assert_eq!(cfg.audio.sample_rate, 48_000);
        assert_eq!(cfg.frame_loop, LoopConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[audio\nchannels = ").expect("write");

        assert!(AppConfig::load_from(&path).is_err());
    }
}
