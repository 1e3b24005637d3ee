//! Channel mixing and sample-rate conversion for the file stream path.
//!
//! 1. [`downmix_to_mono`]: average any number of interleaved channels.
//! 2. [`LinearResampler`]: streaming linear-rate conversion of a mono
//!    signal, built on rubato's `FastFixedIn` with linear interpolation.
//! 3. [`fan_out`]: duplicate a mono signal into every target channel so the
//!    sample channel stays frame-aligned.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use thiserror::Error;

// ---------------------------------------------------------------------------
// downmix_to_mono / fan_out
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all
/// channels, replacing the contents of `out`.
///
/// A trailing partial frame is ignored.  `channels == 0` yields nothing.
///
/// ```rust
/// use spectrum_tap::audio::downmix_to_mono;
///
/// let mut mono = Vec::new();
/// downmix_to_mono(&[0.5, -0.5, 0.2, 0.4], 2, &mut mono);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: u16, out: &mut Vec<f32>) {
    out.clear();
    match channels {
        0 => {}
        1 => out.extend_from_slice(samples),
        n => {
            let n = n as usize;
            out.extend(
                samples
                    .chunks_exact(n)
                    .map(|frame| (frame.iter().map(|&s| s as f64).sum::<f64>() / n as f64) as f32),
            );
        }
    }
}

/// Write each mono sample into `channels` interleaved slots of `out`,
/// replacing its contents.
pub fn fan_out(mono: &[f32], channels: u16, out: &mut Vec<f32>) {
    out.clear();
    let channels = channels.max(1) as usize;
    if channels == 1 {
        out.extend_from_slice(mono);
        return;
    }
    out.reserve(mono.len() * channels);
    for &sample in mono {
        out.extend(std::iter::repeat(sample).take(channels));
    }
}

// ---------------------------------------------------------------------------
// ResampleError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("invalid resampling rates: {from} Hz -> {to} Hz")]
    InvalidRate { from: u32, to: u32 },

    #[error("failed to construct resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),

    #[error("resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

// ---------------------------------------------------------------------------
// LinearResampler
// ---------------------------------------------------------------------------

/// Streaming mono resampler with linear interpolation.
///
/// rubato's fixed-input resampler consumes exactly
/// `input_frames_next()` frames per call, so incoming blocks of any size
/// are staged in `pending` and converted whenever a full chunk is ready.
/// Output is therefore delayed by at most one chunk.
pub struct LinearResampler {
    inner: FastFixedIn<f32>,
    pending: Vec<f32>,
    from_rate: u32,
    to_rate: u32,
}

impl std::fmt::Debug for LinearResampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearResampler")
            .field("from_rate", &self.from_rate)
            .field("to_rate", &self.to_rate)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl LinearResampler {
    /// Create a resampler converting `from_rate` Hz to `to_rate` Hz,
    /// processing `chunk_frames` input frames at a time.
    pub fn new(from_rate: u32, to_rate: u32, chunk_frames: usize) -> Result<Self, ResampleError> {
        if from_rate == 0 || to_rate == 0 || chunk_frames == 0 {
            return Err(ResampleError::InvalidRate {
                from: from_rate,
                to: to_rate,
            });
        }

        let ratio = to_rate as f64 / from_rate as f64;
        let inner = FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Linear, chunk_frames, 1)?;

        Ok(Self {
            inner,
            pending: Vec::with_capacity(chunk_frames * 2),
            from_rate,
            to_rate,
        })
    }

    /// Feed `input` and append every converted sample that became available
    /// to `out` (which is cleared first).
    pub fn process(&mut self, input: &[f32], out: &mut Vec<f32>) -> Result<(), ResampleError> {
        out.clear();
        self.pending.extend_from_slice(input);

        loop {
            let needed = self.inner.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let converted = self.inner.process(&[&self.pending[..needed]], None)?;
            self.pending.drain(..needed);
            if let Some(channel) = converted.first() {
                out.extend_from_slice(channel);
            }
        }
        Ok(())
    }

    /// Output rate over input rate.
    pub fn ratio(&self) -> f64 {
        self.to_rate as f64 / self.from_rate as f64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- downmix_to_mono ---------------------------------------------------

    #[test]
    fn downmix_already_mono() {
        let mut out = Vec::new();
        downmix_to_mono(&[0.1, 0.2, 0.3], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn downmix_two_channel() {
        let mut out = Vec::new();
        downmix_to_mono(&[1.0, -1.0, 0.5, 0.5], 2, &mut out);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn downmix_ignores_partial_frame() {
        let mut out = Vec::new();
        downmix_to_mono(&[0.4, 0.4, 0.4, 0.4, 0.9], 4, &mut out);
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn downmix_zero_channels() {
        let mut out = vec![1.0];
        downmix_to_mono(&[1.0, 2.0], 0, &mut out);
        assert!(out.is_empty());
    }

    // ---- fan_out -----------------------------------------------------------

    #[test]
    fn fan_out_duplicates_into_each_channel() {
        let mut out = Vec::new();
        fan_out(&[0.1, 0.2], 3, &mut out);
        assert_eq!(out, vec![0.1, 0.1, 0.1, 0.2, 0.2, 0.2]);
    }

    #[test]
    fn fan_out_mono_is_copy() {
        let mut out = Vec::new();
        fan_out(&[0.7, 0.8], 1, &mut out);
        assert_eq!(out, vec![0.7, 0.8]);
    }

    // ---- LinearResampler ---------------------------------------------------

    #[test]
    fn zero_rate_is_rejected() {
        assert!(matches!(
            LinearResampler::new(0, 48_000, 512),
            Err(ResampleError::InvalidRate { from: 0, .. })
        ));
    }

    #[test]
    fn upsampling_doubles_length_over_many_chunks() {
        let mut rs = LinearResampler::new(24_000, 48_000, 256).unwrap();
        let input = vec![0.25_f32; 256];
        let mut out = Vec::new();
        let mut total = 0usize;
        for _ in 0..20 {
            rs.process(&input, &mut out).unwrap();
            total += out.len();
        }
        let expected = 20 * 256 * 2;
        assert!(
            total.abs_diff(expected) <= 2 * 256,
            "expected ~{expected}, got {total}"
        );
    }

    #[test]
    fn short_blocks_are_staged_until_a_chunk_is_ready() {
        let mut rs = LinearResampler::new(44_100, 48_000, 512).unwrap();
        let mut out = Vec::new();
        rs.process(&[0.0_f32; 100], &mut out).unwrap();
        assert!(out.is_empty());

        let mut produced = 0;
        for _ in 0..10 {
            rs.process(&[0.0_f32; 100], &mut out).unwrap();
            produced += out.len();
        }
        assert!(produced > 0);
    }

    #[test]
    fn ratio_reports_output_over_input() {
        let rs = LinearResampler::new(32_000, 48_000, 128).unwrap();
        assert!((rs.ratio() - 1.5).abs() < 1e-9);
    }
}
