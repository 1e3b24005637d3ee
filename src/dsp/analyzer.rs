//! Hop-based STFT analyzer producing smoothed band energies.
//!
//! ```text
//! interleaved ─▶ downmix ─▶ FIFO ──(≥ fft_size)──▶ × Hann ─▶ FFT ─▶ |X| ─▶ band mean ─▶ attack/release
//!                            ▲                                                              │
//!                            └──────────────── drain hop_size ◀─────────────────────────────┘
//! ```
//!
//! A single [`push_samples`](SpectralAnalyzer::push_samples) call may run
//! zero, one or several frames; [`band_energies`](SpectralAnalyzer::band_energies)
//! always reflects the last frame processed.

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use super::bands::{band_ranges, usable_bins, BandScale};
use super::smoothing::BandSmoother;
use super::window::hann;
use crate::audio::resample::downmix_to_mono;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Transform length in samples; must be a power of two.
    pub fft_size: usize,
    /// Samples discarded after every frame; `1..fft_size`.
    pub hop_size: usize,
    pub bands: usize,
    pub scale: BandScale,
    /// Smoothing coefficient for rising energy, `(0, 1]`.
    pub attack: f32,
    /// Smoothing coefficient for falling energy, `(0, 1]`.
    pub release: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            hop_size: 256,
            bands: 32,
            scale: BandScale::Logarithmic,
            attack: 0.5,
            release: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalyzerError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AnalyzerError {
    #[error("FFT size {0} is not a power of two >= 2")]
    InvalidFftSize(usize),

    #[error("hop size {hop} must be in 1..{fft}")]
    InvalidHopSize { hop: usize, fft: usize },

    #[error("band count must be at least 1")]
    ZeroBands,

    #[error("{bands} bands requested but only {usable} usable bins")]
    TooManyBands { bands: usize, usable: usize },

    #[error("channel count must be at least 1")]
    InvalidChannels,

    #[error("sample rate must be non-zero")]
    InvalidSampleRate,

    #[error("{name} coefficient {value} outside (0, 1]")]
    InvalidCoefficient { name: &'static str, value: f32 },
}

fn check_coefficient(name: &'static str, value: f32) -> Result<(), AnalyzerError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(AnalyzerError::InvalidCoefficient { name, value })
    }
}

// ---------------------------------------------------------------------------
// SpectralAnalyzer
// ---------------------------------------------------------------------------

pub struct SpectralAnalyzer {
    channels: u16,
    sample_rate: u32,
    fft_size: usize,
    hop_size: usize,

    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// `2 / sum(window)`: a full-scale sine at a bin centre reads 1.0.
    magnitude_scale: f32,
    ranges: Vec<Range<usize>>,

    fifo: VecDeque<f32>,
    mono: Vec<f32>,
    frame: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    raw: Vec<f32>,
    smoother: BandSmoother,
    frames: u64,
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("fft_size", &self.fft_size)
            .field("hop_size", &self.hop_size)
            .field("bands", &self.ranges.len())
            .field("buffered", &self.fifo.len())
            .finish_non_exhaustive()
    }
}

impl SpectralAnalyzer {
    /// Validate `config` and precompute the window, FFT plan and band map.
    pub fn new(sample_rate: u32, channels: u16, config: &SpectrumConfig) -> Result<Self, AnalyzerError> {
        let fft_size = config.fft_size;
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(AnalyzerError::InvalidFftSize(fft_size));
        }
        if config.hop_size == 0 || config.hop_size >= fft_size {
            return Err(AnalyzerError::InvalidHopSize {
                hop: config.hop_size,
                fft: fft_size,
            });
        }
        if config.bands == 0 {
            return Err(AnalyzerError::ZeroBands);
        }
        let usable = usable_bins(fft_size).len();
        if config.bands > usable {
            return Err(AnalyzerError::TooManyBands {
                bands: config.bands,
                usable,
            });
        }
        if channels == 0 {
            return Err(AnalyzerError::InvalidChannels);
        }
        if sample_rate == 0 {
            return Err(AnalyzerError::InvalidSampleRate);
        }
        check_coefficient("attack", config.attack)?;
        check_coefficient("release", config.release)?;

        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
        let window = hann(fft_size);
        let window_sum: f32 = window.iter().sum();
        let magnitude_scale = if window_sum > 0.0 { 2.0 / window_sum } else { 0.0 };
        let ranges = band_ranges(fft_size, sample_rate, config.bands, config.scale);

        log::debug!(
            "analyzer: fft={fft_size} hop={} bands={} scale={:?} @ {sample_rate} Hz",
            config.hop_size,
            config.bands,
            config.scale
        );

        Ok(Self {
            channels,
            sample_rate,
            fft_size,
            hop_size: config.hop_size,
            fft,
            window,
            magnitude_scale,
            ranges,
            fifo: VecDeque::with_capacity(fft_size * 2),
            mono: Vec::new(),
            frame: vec![Complex::default(); fft_size],
            scratch,
            raw: vec![0.0; config.bands],
            smoother: BandSmoother::new(config.bands, config.attack, config.release),
            frames: 0,
        })
    }

    /// Feed interleaved samples and run every frame that becomes available.
    ///
    /// A trailing partial frame (fewer than `channels` samples) is ignored.
    /// NaN and infinite samples enter the window as silence.
    pub fn push_samples(&mut self, interleaved: &[f32]) {
        downmix_to_mono(interleaved, self.channels, &mut self.mono);
        self.fifo
            .extend(self.mono.iter().map(|&s| if s.is_finite() { s } else { 0.0 }));

        while self.fifo.len() >= self.fft_size {
            self.process_frame();
            self.fifo.drain(..self.hop_size);
        }
    }

    fn process_frame(&mut self) {
        for ((slot, &sample), &w) in self.frame.iter_mut().zip(self.fifo.iter()).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.frame, &mut self.scratch);

        for (raw, range) in self.raw.iter_mut().zip(&self.ranges) {
            let sum: f32 = self.frame[range.clone()].iter().map(|c| c.norm()).sum();
            let mean = sum / range.len() as f32 * self.magnitude_scale;
            // Finite but huge input can still overflow the transform.
            *raw = if mean.is_finite() { mean } else { 0.0 };
        }
        self.smoother.update(&self.raw);
        self.frames += 1;
    }

    /// Current smoothed energy per band, lowest frequency first.
    pub fn band_energies(&self) -> &[f32] {
        self.smoother.values()
    }

    /// Bin range of each band.
    pub fn band_ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Index and energy of the loudest band.
    pub fn peak_band(&self) -> Option<(usize, f32)> {
        self.band_energies()
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Frames transformed since construction or the last [`reset`](Self::reset).
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Mono samples waiting for the next frame.
    pub fn buffered(&self) -> usize {
        self.fifo.len()
    }

    /// Forget buffered audio and decay state.
    pub fn reset(&mut self) {
        self.fifo.clear();
        self.smoother.reset();
        self.frames = 0;
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
