//! Smoothed level meter for the raw sample stream.
//!
//! [`AudioMetrics`] is updated once per frame-loop tick with whatever raw
//! samples were read from the engine.  It keeps an exponentially smoothed
//! RMS, a peak that holds and decays, and the engine's dropped-sample count
//! for diagnostics.
//!
//! # Example
//!
//! ```rust
//! use spectrum_tap::audio::AudioMetrics;
//!
//! let mut metrics = AudioMetrics::new(true);
//! metrics.update(&[0.5, -0.5, 0.5, -0.5]);
//! assert!(metrics.rms > 0.0);
//! assert!((metrics.peak - 0.5).abs() < 1e-6);
//!
//! // A tick with no audio lets both readings fall back.
//! let before = metrics.peak;
//! metrics.update(&[]);
//! assert!(metrics.peak < before);
//! ```

/// Weight of the previous RMS reading.
const RMS_KEEP: f32 = 0.9;
/// Per-tick peak decay while new samples keep arriving.
const PEAK_DECAY: f32 = 0.95;
/// Decay applied to both readings on ticks without samples.
const IDLE_DECAY: f32 = 0.98;

// ---------------------------------------------------------------------------
// AudioMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioMetrics {
    /// Whether an acquisition source is running at all.
    pub active: bool,
    /// Smoothed RMS amplitude.
    pub rms: f32,
    /// Held peak absolute amplitude.
    pub peak: f32,
    /// Samples the producer could not place in the channel.
    pub dropped: usize,
}

impl AudioMetrics {
    pub fn new(active: bool) -> Self {
        Self {
            active,
            ..Self::default()
        }
    }

    /// Fold one tick's worth of raw samples into the meter.
    pub fn update(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            self.rms *= IDLE_DECAY;
            self.peak *= IDLE_DECAY;
            return;
        }

        // Non-finite samples count as silence.
        let finite = || samples.iter().map(|&s| if s.is_finite() { s } else { 0.0 });
        let sum_sq: f64 = finite().map(|s| s as f64 * s as f64).sum();
        let instant_rms = ((sum_sq / samples.len() as f64).sqrt() as f32).min(f32::MAX);
        let instant_peak = finite().fold(0.0_f32, |acc, s| acc.max(s.abs()));

        self.rms = self.rms * RMS_KEEP + instant_rms * (1.0 - RMS_KEEP);
        self.peak = instant_peak.max(self.peak * PEAK_DECAY);
    }

    /// Convenience: peak expressed in dBFS, floored at -120 dB.
    pub fn peak_dbfs(&self) -> f32 {
        20.0 * self.peak.max(1e-6).log10()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_moves_ten_percent_toward_instant() {
        let mut m = AudioMetrics::new(true);
        m.update(&[1.0; 64]);
        assert!((m.rms - 0.1).abs() < 1e-6);
        m.update(&[1.0; 64]);
        assert!((m.rms - 0.19).abs() < 1e-6);
    }

    #[test]
    fn peak_holds_then_decays() {
        let mut m = AudioMetrics::new(true);
        m.update(&[0.0, -0.8, 0.2]);
        assert!((m.peak - 0.8).abs() < 1e-6);

        m.update(&[0.1]);
        assert!((m.peak - 0.76).abs() < 1e-6);
    }

    #[test]
    fn idle_tick_decays_both() {
        let mut m = AudioMetrics::new(true);
        m.rms = 0.5;
        m.peak = 0.5;
        m.update(&[]);
        assert!((m.rms - 0.49).abs() < 1e-6);
        assert!((m.peak - 0.49).abs() < 1e-6);
    }

    #[test]
    fn non_finite_samples_read_as_silence() {
        let mut m = AudioMetrics::new(true);
        m.update(&[f32::NAN, 0.5, f32::INFINITY, f32::NEG_INFINITY]);
        assert!(m.rms.is_finite() && m.rms > 0.0);
        assert!((m.peak - 0.5).abs() < 1e-6);

        m.update(&[0.0; 16]);
        assert!(m.rms.is_finite());
        assert!(m.peak.is_finite());
    }

    #[test]
    fn inactive_default_is_silent() {
        let m = AudioMetrics::default();
        assert!(!m.active);
        assert_eq!(m.rms, 0.0);
        assert_eq!(m.dropped, 0);
        assert!((m.peak_dbfs() + 120.0).abs() < 1e-3);
    }
}
