//! Per-tick snapshot handed to whatever presents the spectrum.

use crate::audio::{AudioMetrics, SourceMode};

// ---------------------------------------------------------------------------
// FrameStats
// ---------------------------------------------------------------------------

/// What one [`FrameLoop::tick`](super::FrameLoop::tick) did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Ticks since the loop was built, starting at 1.
    pub tick: u64,
    /// Raw interleaved samples pulled from the engine this tick.
    pub samples_read: usize,
    /// Analyzer frames transformed this tick.
    pub analyzer_frames: u64,
    pub metrics: AudioMetrics,
    /// Loudest band and its smoothed energy.
    pub peak_band: Option<(usize, f32)>,
}

impl FrameStats {
    /// One-line summary for the periodic status log.
    ///
    /// ```
    /// use spectrum_tap::audio::{AudioMetrics, SourceMode};
    /// use spectrum_tap::pipeline::FrameStats;
    ///
    /// let stats = FrameStats {
    ///     tick: 60,
    ///     samples_read: 1600,
    ///     analyzer_frames: 3,
    ///     metrics: AudioMetrics::new(true),
    ///     peak_band: Some((4, 0.25)),
    /// };
    /// let line = stats.status_line(SourceMode::FileStream);
    /// assert!(line.starts_with("[file]"));
    /// assert!(line.contains("band 4"));
    /// ```
    pub fn status_line(&self, mode: SourceMode) -> String {
        if !self.metrics.active {
            return format!("[{}] audio unavailable", mode.label());
        }
        let band = match self.peak_band {
            Some((index, energy)) => format!("band {index} {energy:.3}"),
            None => "no bands".to_string(),
        };
        format!(
            "[{}] rms {:.3} peak {:.1} dBFS dropped {} | {}",
            mode.label(),
            self.metrics.rms,
            self.metrics.peak_dbfs(),
            self.metrics.dropped,
            band
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_status_says_so() {
        let stats = FrameStats {
            tick: 1,
            samples_read: 0,
            analyzer_frames: 0,
            metrics: AudioMetrics::new(false),
            peak_band: None,
        };
        assert_eq!(stats.status_line(SourceMode::LiveCapture), "[capture] audio unavailable");
    }

    #[test]
    fn active_status_reports_drops() {
        let mut metrics = AudioMetrics::new(true);
        metrics.dropped = 40;
        let stats = FrameStats {
            tick: 1,
            samples_read: 0,
            analyzer_frames: 0,
            metrics,
            peak_band: None,
        };
        let line = stats.status_line(SourceMode::LiveCapture);
        assert!(line.contains("dropped 40"), "{line}");
        assert!(line.ends_with("no bands"), "{line}");
    }
}
