//! Spectral analysis: mono FIFO → Hann → FFT → bands → attack/release.

pub mod analyzer;
pub mod bands;
pub mod smoothing;
pub mod window;

pub use analyzer::{AnalyzerError, SpectralAnalyzer, SpectrumConfig};
pub use bands::{band_ranges, bin_frequency, usable_bins, BandScale};
pub use smoothing::BandSmoother;
pub use window::{hann, hann_window};
