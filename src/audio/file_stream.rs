//! Looping file playback into the sample channel.
//!
//! [`FileStream`] opens a decoder on `start`, optionally builds a
//! [`LinearResampler`] when the file's native rate differs from the pipeline
//! rate, and moves both onto a dedicated worker thread.  The worker:
//!
//! ```text
//! loop until stop flag:
//!   read chunk_frames frames ──▶ 0 frames or error? ──▶ rewind, idle, retry
//!        │
//!        ▼
//!   downmix to mono ──▶ resample (optional) ──▶ fan out to target channels
//!        │
//!        ▼
//!   write into SampleChannel (shortfall → DropCounter)
//!        │
//!        ▼
//!   sleep for the real-time length of the block
//! ```
//!
//! End of stream is never terminal: the file loops until [`stop`] is called.
//!
//! [`stop`]: AudioSource::stop

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::channel::{write_or_drop, DropCounter, Producer, SampleChannel};
use super::decoder::{file_opener, DecoderOpener, PcmDecoder};
use super::resample::{downmix_to_mono, fan_out, LinearResampler};
use super::source::{AudioSource, SourceError, SourceMode};

// ---------------------------------------------------------------------------
// FileStreamSettings
// ---------------------------------------------------------------------------

/// Output format the worker produces, plus its decode granularity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileStreamSettings {
    /// Pipeline sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channels written per frame.
    pub channels: u16,
    /// Frames requested from the decoder per iteration.
    pub chunk_frames: usize,
}

impl FileStreamSettings {
    /// Reject settings the worker cannot pace or decode with.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.chunk_frames == 0 {
            return Err(SourceError::InvalidSettings("chunk_frames must be at least 1"));
        }
        if self.sample_rate == 0 {
            return Err(SourceError::InvalidSettings("sample_rate must be non-zero"));
        }
        Ok(())
    }
}

impl Default for FileStreamSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 1,
            chunk_frames: 512,
        }
    }
}

// ---------------------------------------------------------------------------
// FileStream
// ---------------------------------------------------------------------------

/// Thread-driven producer that decodes a file in a loop.
pub struct FileStream {
    opener: DecoderOpener,
    label: String,
    channel: SampleChannel,
    dropped: DropCounter,
    settings: FileStreamSettings,
    stop_flag: Arc<AtomicBool>,
    loops: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStream")
            .field("source", &self.label)
            .field("settings", &self.settings)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileStream {
    /// File stream over `path`, decoded with symphonia.
    pub fn open_path(
        path: impl Into<std::path::PathBuf>,
        channel: SampleChannel,
        dropped: DropCounter,
        settings: FileStreamSettings,
    ) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self::with_opener(file_opener(path), label, channel, dropped, settings)
    }

    /// File stream over any decoder `opener` produces.
    pub fn with_opener(
        opener: DecoderOpener,
        label: impl Into<String>,
        channel: SampleChannel,
        dropped: DropCounter,
        settings: FileStreamSettings,
    ) -> Self {
        Self {
            opener,
            label: label.into(),
            channel,
            dropped,
            settings,
            stop_flag: Arc::new(AtomicBool::new(false)),
            loops: Arc::new(AtomicUsize::new(0)),
            worker: None,
        }
    }

    /// How many times the worker has returned to the start of the source.
    pub fn loop_count(&self) -> usize {
        self.loops.load(Ordering::Relaxed)
    }

    fn spawn_worker(&mut self) -> Result<JoinHandle<()>, SourceError> {
        let target = self.settings;
        target.validate()?;
        let decoder = (self.opener)()?;

        let source_channels = match decoder.channels() {
            0 => 1,
            n => n,
        };
        let source_rate = match decoder.sample_rate() {
            0 => target.sample_rate,
            r => r,
        };

        // An early return below drops the decoder, and the resampler with it.
        let resampler = if source_rate != target.sample_rate {
            let rs = LinearResampler::new(source_rate, target.sample_rate, target.chunk_frames)?;
            log::debug!("resampling {source_rate} Hz -> {} Hz", target.sample_rate);
            Some(rs)
        } else {
            None
        };

        let producer = self
            .channel
            .claim_producer()
            .ok_or(SourceError::ProducerBusy)?;

        self.dropped.reset();
        self.loops.store(0, Ordering::Relaxed);
        self.stop_flag.store(false, Ordering::Release);

        let worker = StreamWorker {
            producer,
            dropped: self.dropped.clone(),
            stop: Arc::clone(&self.stop_flag),
            loops: Arc::clone(&self.loops),
            target,
            source_channels,
            resampler,
            decoder,
            failures: 0,
        };

        log::info!(
            "file stream started: {} ({source_channels} ch @ {source_rate} Hz)",
            self.label
        );

        let handle = thread::Builder::new()
            .name("file-stream".into())
            .spawn(move || worker.run())?;
        Ok(handle)
    }
}

impl AudioSource for FileStream {
    fn start(&mut self) -> Result<(), SourceError> {
        if self.is_running() {
            return Ok(());
        }
        // Reap a worker that exited on its own (it only does so by panicking).
        self.stop();

        let handle = self.spawn_worker()?;
        self.worker = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        self.stop_flag.store(true, Ordering::Release);
        if handle.join().is_err() {
            log::warn!("file stream worker panicked");
        }
        log::info!("file stream stopped: {}", self.label);
    }

    fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn mode(&self) -> SourceMode {
        SourceMode::FileStream
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// StreamWorker
// ---------------------------------------------------------------------------

/// Everything the decode thread owns.
struct StreamWorker {
    producer: Producer,
    dropped: DropCounter,
    stop: Arc<AtomicBool>,
    loops: Arc<AtomicUsize>,
    target: FileStreamSettings,
    source_channels: u16,
    resampler: Option<LinearResampler>,
    decoder: Box<dyn PcmDecoder>,
    /// Consecutive decode/rewind failures since the last good read.
    failures: usize,
}

/// Only the first failure of a streak is a warning; a vanished file would
/// otherwise log on every idle tick.
fn failure_level(consecutive: usize) -> log::Level {
    if consecutive <= 1 {
        log::Level::Warn
    } else {
        log::Level::Debug
    }
}

impl StreamWorker {
    fn run(mut self) {
        let chunk_frames = self.target.chunk_frames;
        let idle = Duration::from_secs_f64(
            chunk_frames.max(1) as f64 / self.target.sample_rate.max(1) as f64,
        );

        let mut decoded = Vec::with_capacity(chunk_frames * self.source_channels as usize);
        let mut mono = Vec::with_capacity(chunk_frames);
        let mut resampled = Vec::new();
        let mut interleaved = Vec::new();

        while !self.stop.load(Ordering::Acquire) {
            match self.decoder.read_frames(&mut decoded, chunk_frames) {
                Ok(0) => {
                    self.loop_to_start();
                    thread::sleep(idle);
                    continue;
                }
                Ok(_) => self.failures = 0,
                Err(e) => {
                    self.failures += 1;
                    log::log!(
                        failure_level(self.failures),
                        "decode error, restarting from the top: {e}"
                    );
                    self.loop_to_start();
                    thread::sleep(idle);
                    continue;
                }
            }

            downmix_to_mono(&decoded, self.source_channels, &mut mono);

            let block: &[f32] = match self.resampler.as_mut() {
                Some(rs) => match rs.process(&mono, &mut resampled) {
                    Ok(()) => resampled.as_slice(),
                    Err(e) => {
                        log::warn!("resampling failed, dropping chunk: {e}");
                        continue;
                    }
                },
                None => mono.as_slice(),
            };

            fan_out(block, self.target.channels, &mut interleaved);
            write_or_drop(&mut self.producer, &interleaved, &self.dropped);

            let secs = block.len() as f64 / self.target.sample_rate.max(1) as f64;
            if secs > 0.0 {
                thread::sleep(Duration::from_secs_f64(secs));
            }
        }

        // Resampler first, then the decoder it was fed from.
        let StreamWorker {
            resampler, decoder, ..
        } = self;
        drop(resampler);
        drop(decoder);
    }

    fn loop_to_start(&mut self) {
        self.loops.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.decoder.rewind() {
            self.failures += 1;
            log::log!(failure_level(self.failures), "failed to rewind source: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
