//! Partition of FFT bins into display bands.
//!
//! Bins `1..=fft_size/2` (everything above DC up to and including Nyquist)
//! are split into `bands` contiguous, non-overlapping, non-empty ranges.
//! Edges are placed on a logarithmic or linear frequency scale and then
//! nudged so that every band keeps at least one bin while every usable bin
//! lands in exactly one band.

use std::ops::Range;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BandScale
// ---------------------------------------------------------------------------

/// Spacing of band edges along the frequency axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BandScale {
    /// Equal frequency ratio per band, so low bands are narrow and high bands wide.
    #[default]
    Logarithmic,
    /// Equal number of bins per band.
    Linear,
}

/// First bin included in any band (bin 0 is DC).
pub const FIRST_BIN: usize = 1;

/// Bins that take part in banding: `1..fft_size/2 + 1`.
pub fn usable_bins(fft_size: usize) -> Range<usize> {
    FIRST_BIN..fft_size / 2 + 1
}

/// Centre frequency of `bin` in Hz.
pub fn bin_frequency(bin: usize, fft_size: usize, sample_rate: u32) -> f32 {
    bin as f32 * sample_rate as f32 / fft_size as f32
}

/// Compute the bin range of every band.
///
/// Callers must ensure `1 <= bands <= usable_bins(fft_size).len()`; the
/// analyzer validates this at construction.
pub fn band_ranges(fft_size: usize, sample_rate: u32, bands: usize, scale: BandScale) -> Vec<Range<usize>> {
    let usable = usable_bins(fft_size);
    let (first, end) = (usable.start, usable.end);
    if bands == 0 || usable.len() < bands {
        return Vec::new();
    }

    // Work in Hz so the edges are meaningful as frequencies; the bin width
    // cancels out again when mapping back.
    let bin_hz = bin_frequency(1, fft_size, sample_rate).max(f32::MIN_POSITIVE) as f64;
    let lo_hz = first as f64 * bin_hz;
    let hi_hz = end as f64 * bin_hz;

    let mut edges = Vec::with_capacity(bands + 1);
    edges.push(first);
    for i in 1..bands {
        let t = i as f64 / bands as f64;
        let edge_hz = match scale {
            BandScale::Logarithmic => lo_hz * (hi_hz / lo_hz).powf(t),
            BandScale::Linear => lo_hz + (hi_hz - lo_hz) * t,
        };
        let ideal = (edge_hz / bin_hz).round() as usize;

        // At least one bin for this band, and one left for each band after it.
        let lower = edges[i - 1] + 1;
        let upper = end - (bands - i);
        edges.push(ideal.clamp(lower, upper));
    }
    edges.push(end);

    edges.windows(2).map(|w| w[0]..w[1]).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
