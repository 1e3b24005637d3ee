//! [`FrameLoop`]: the consumer side of the pipeline.
//!
//! Each tick pulls whatever raw samples the engine has buffered, feeds them
//! to the analyzer, and folds them into the level meter.  Nothing here ever
//! waits on the producer; an empty tick simply lets the meter decay.
//!
//! ```text
//! every 1/fps:
//!   AudioEngine::read_samples ─▶ SpectralAnalyzer::push_samples ─▶ band_energies
//!                            └─▶ AudioMetrics::update
//! ```

use std::time::{Duration, Instant};

use crate::audio::{AudioEngine, AudioMetrics};
use crate::config::LoopConfig;
use crate::dsp::SpectralAnalyzer;

use super::state::FrameStats;

/// Smallest scratch buffer handed to `read_samples`.
const MIN_SCRATCH: usize = 4096;

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FrameLoop {
    engine: AudioEngine,
    analyzer: SpectralAnalyzer,
    config: LoopConfig,
    metrics: AudioMetrics,
    scratch: Vec<f32>,
    ticks: u64,
}

impl FrameLoop {
    pub fn new(engine: AudioEngine, analyzer: SpectralAnalyzer, config: LoopConfig) -> Self {
        let scratch = vec![0.0; engine.capacity().max(MIN_SCRATCH)];
        Self {
            engine,
            analyzer,
            config,
            metrics: AudioMetrics::new(false),
            scratch,
            ticks: 0,
        }
    }

    /// Start acquisition.  On failure the loop keeps working with the meter
    /// inactive and the spectrum at rest.
    pub fn start(&mut self) -> bool {
        match self.engine.start() {
            Ok(()) => {
                log::info!("frame loop: {} source running", self.engine.mode().label());
                self.metrics.active = true;
            }
            Err(e) => {
                log::warn!("frame loop: running without audio: {e}");
                self.metrics.active = false;
            }
        }
        self.metrics.active
    }

    pub fn stop(&mut self) {
        self.engine.stop();
        self.metrics.active = false;
    }

    /// Advance one frame.
    pub fn tick(&mut self) -> FrameStats {
        let frames_before = self.analyzer.frames_processed();

        let n = self.engine.read_samples(&mut self.scratch);
        let samples = &self.scratch[..n];
        if n > 0 {
            self.analyzer.push_samples(samples);
        }
        self.metrics.update(samples);
        self.metrics.dropped = self.engine.dropped_samples();
        self.ticks += 1;

        FrameStats {
            tick: self.ticks,
            samples_read: n,
            analyzer_frames: self.analyzer.frames_processed() - frames_before,
            metrics: self.metrics,
            peak_band: self.analyzer.peak_band(),
        }
    }

    /// Tick at `fps` until `run_secs` elapses (forever when unset), logging
    /// a status line every `status_interval_secs`.
    pub fn run(&mut self) {
        let frame = Duration::from_secs_f64(1.0 / f64::from(self.config.fps.max(1)));
        let status_every = positive_secs(self.config.status_interval_secs);
        let run_for = self.config.run_secs.and_then(positive_secs);

        let started = Instant::now();
        let mut next_frame = started;
        let mut last_status = started;

        log::info!(
            "frame loop: {} fps, {} bands, fft {} hop {}",
            self.config.fps.max(1),
            self.analyzer.band_energies().len(),
            self.analyzer.fft_size(),
            self.analyzer.hop_size()
        );

        loop {
            let stats = self.tick();
            let now = Instant::now();

            if let Some(every) = status_every {
                if now.duration_since(last_status) >= every {
                    log::info!("{}", stats.status_line(self.engine.mode()));
                    last_status = now;
                }
            }

            if run_for.is_some_and(|limit| now.duration_since(started) >= limit) {
                break;
            }

            next_frame += frame;
            match next_frame.checked_duration_since(Instant::now()) {
                Some(wait) => std::thread::sleep(wait),
                // Running behind; don't try to catch up with a burst of ticks.
                None => next_frame = Instant::now(),
            }
        }

        log::info!("frame loop: finished after {} ticks", self.ticks);
    }

    /// Current smoothed spectrum.
    pub fn band_energies(&self) -> &[f32] {
        self.analyzer.band_energies()
    }

    pub fn metrics(&self) -> AudioMetrics {
        self.metrics
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }
}

/// `secs` as a duration, or `None` when it is not positive or does not fit.
fn positive_secs(secs: f32) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f32(secs).ok()
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        write_or_drop, AudioSource, DropCounter, SampleChannel, SourceError, SourceMode,
    };
    use crate::dsp::SpectrumConfig;
    use std::f32::consts::PI;

    /// Source that writes one block on `start`, or refuses to start.
    struct ScriptedSource {
        channel: SampleChannel,
        dropped: DropCounter,
        block: Vec<f32>,
        fail: bool,
        running: bool,
    }

    impl AudioSource for ScriptedSource {
        fn start(&mut self) -> Result<(), SourceError> {
            if self.fail {
                return Err(SourceError::NoDevice);
            }
            let mut producer = self
                .channel
                .claim_producer()
                .ok_or(SourceError::ProducerBusy)?;
            write_or_drop(&mut producer, &self.block, &self.dropped);
            self.running = true;
            Ok(())
        }
        fn stop(&mut self) {
            self.running = false;
        }
        fn is_running(&self) -> bool {
            self.running
        }
        fn mode(&self) -> SourceMode {
            SourceMode::FileStream
        }
    }

    fn frame_loop(capacity: usize, block: Vec<f32>, fail: bool) -> FrameLoop {
        let (channel, consumer) = SampleChannel::new(capacity);
        let dropped = DropCounter::new();
        let source = ScriptedSource {
            channel: channel.clone(),
            dropped: dropped.clone(),
            block,
            fail,
            running: false,
        };
        let engine = AudioEngine::from_parts(Box::new(source), channel, consumer, dropped, 48_000, 1);
        let analyzer = SpectralAnalyzer::new(48_000, 1, &SpectrumConfig::default()).unwrap();
        FrameLoop::new(engine, analyzer, LoopConfig::default())
    }

    fn tone(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.7 * (2.0 * PI * 2_000.0 * i as f32 / 48_000.0).sin())
            .collect()
    }

    #[test]
    fn tick_feeds_analyzer_and_meter() {
        let mut fl = frame_loop(8192, tone(4096), false);
        assert!(fl.start());

        let stats = fl.tick();
        assert_eq!(stats.tick, 1);
        assert_eq!(stats.samples_read, 4096);
        assert_eq!(stats.analyzer_frames, 13);
        assert!(stats.metrics.active);
        assert!(stats.metrics.rms > 0.0);
        assert!(stats.peak_band.is_some_and(|(_, e)| e > 0.0));
        assert!(fl.band_energies().iter().any(|&e| e > 0.0));

        // Nothing left: the meter decays, the analyzer is untouched.
        let quiet = fl.tick();
        assert_eq!(quiet.samples_read, 0);
        assert_eq!(quiet.analyzer_frames, 0);
        assert!(quiet.metrics.peak < stats.metrics.peak);
    }

    #[test]
    fn scratch_covers_whole_ring() {
        let fl = frame_loop(10_000, Vec::new(), false);
        assert_eq!(fl.scratch.len(), 10_000);
        let fl = frame_loop(100, Vec::new(), false);
        assert_eq!(fl.scratch.len(), MIN_SCRATCH);
    }

    #[test]
    fn failed_start_keeps_ticking_inactive() {
        let mut fl = frame_loop(1024, tone(512), true);
        assert!(!fl.start());

        let stats = fl.tick();
        assert!(!stats.metrics.active);
        assert_eq!(stats.samples_read, 0);
        assert!(fl.band_energies().iter().all(|&e| e == 0.0));
    }

    #[test]
    fn dropped_count_reaches_the_meter() {
        let mut fl = frame_loop(100, vec![0.1; 140], false);
        fl.start();
        let stats = fl.tick();
        assert_eq!(stats.samples_read, 100);
        assert_eq!(stats.metrics.dropped, 40);
    }

    #[test]
    fn run_honours_run_secs() {
        let mut fl = frame_loop(1024, Vec::new(), false);
        fl.config = LoopConfig {
            fps: 200,
            status_interval_secs: 0.0,
            run_secs: Some(0.05),
        };
        fl.start();

        let started = Instant::now();
        fl.run();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(fl.ticks >= 2, "ticks {}", fl.ticks);
    }

    #[test]
    fn out_of_range_intervals_are_ignored() {
        assert_eq!(positive_secs(0.5), Some(Duration::from_millis(500)));
        assert_eq!(positive_secs(0.0), None);
        assert_eq!(positive_secs(-1.0), None);
        assert_eq!(positive_secs(f32::NAN), None);
        assert_eq!(positive_secs(f32::INFINITY), None);
        assert_eq!(positive_secs(1e20), None);
    }

    #[test]
    fn run_survives_huge_status_interval() {
        let mut fl = frame_loop(1024, Vec::new(), false);
        fl.config = LoopConfig {
            fps: 200,
            status_interval_secs: 1e20,
            run_secs: Some(0.02),
        };
        fl.start();
        fl.run();
        assert!(fl.ticks >= 1);
    }

    #[test]
    fn stop_marks_meter_inactive() {
        let mut fl = frame_loop(1024, Vec::new(), false);
        fl.start();
        fl.stop();
        assert!(!fl.engine().is_running());
        assert!(!fl.metrics().active);
    }
}
