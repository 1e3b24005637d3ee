//! [`AudioEngine`]: the consumer-facing facade over one acquisition source.
//!
//! The engine owns the [`Consumer`] half of the sample channel, the shared
//! [`DropCounter`], and a boxed [`AudioSource`] chosen once at construction:
//! a configured file path selects [`FileStream`], otherwise
//! [`LiveCapture`].  Everything the presentation layer needs goes through
//! here: `start`/`stop`, [`read_samples`](AudioEngine::read_samples) and
//! [`dropped_samples`](AudioEngine::dropped_samples).
//!
//! ```rust,no_run
//! use spectrum_tap::audio::AudioEngine;
//! use spectrum_tap::config::AudioConfig;
//!
//! let mut engine = AudioEngine::from_config(&AudioConfig::default());
//! if let Err(e) = engine.start() {
//!     eprintln!("running without audio: {e}");
//! }
//! let mut scratch = vec![0.0_f32; 4096];
//! let n = engine.read_samples(&mut scratch);
//! println!("{n} samples, {} dropped", engine.dropped_samples());
//! ```

use super::capture::LiveCapture;
use super::channel::{Consumer, DropCounter, SampleChannel};
use super::file_stream::{FileStream, FileStreamSettings};
use super::source::{AudioSource, SourceError, SourceMode};
use crate::config::AudioConfig;

// ---------------------------------------------------------------------------
// AudioEngine
// ---------------------------------------------------------------------------

pub struct AudioEngine {
    source: Box<dyn AudioSource>,
    channel: SampleChannel,
    consumer: Consumer,
    dropped: DropCounter,
    sample_rate: u32,
    channels: u16,
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("mode", &self.mode())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl AudioEngine {
    /// Build an engine from config.  Capacity is `ring_frames * channels`
    /// samples; no device or file is opened until [`start`](Self::start).
    pub fn from_config(config: &AudioConfig) -> Self {
        let channels = config.channels.max(1);
        let (channel, consumer) = SampleChannel::new(config.ring_frames * channels as usize);
        let dropped = DropCounter::new();

        let source: Box<dyn AudioSource> = match &config.file {
            Some(path) => Box::new(FileStream::open_path(
                path.clone(),
                channel.clone(),
                dropped.clone(),
                FileStreamSettings {
                    sample_rate: config.sample_rate,
                    channels,
                    chunk_frames: config.chunk_frames,
                },
            )),
            None => Box::new(LiveCapture::new(
                channel.clone(),
                dropped.clone(),
                config.sample_rate,
                channels,
            )),
        };

        Self {
            source,
            channel,
            consumer,
            dropped,
            sample_rate: config.sample_rate,
            channels,
        }
    }

    /// Assemble an engine around an already-built source.
    ///
    /// `source` must produce into `channel` and charge drops to `dropped`;
    /// `consumer` must be the consumer returned alongside `channel`.
    pub fn from_parts(
        source: Box<dyn AudioSource>,
        channel: SampleChannel,
        consumer: Consumer,
        dropped: DropCounter,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        Self {
            source,
            channel,
            consumer,
            dropped,
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn start(&mut self) -> Result<(), SourceError> {
        self.source.start()
    }

    pub fn stop(&mut self) {
        self.source.stop();
    }

    pub fn is_running(&self) -> bool {
        self.source.is_running()
    }

    /// Pull up to `dest.len()` raw interleaved samples, rounded down to whole
    /// frames so channel alignment survives partial reads.
    pub fn read_samples(&mut self, dest: &mut [f32]) -> usize {
        let channels = self.channels as usize;
        let whole = dest.len() - dest.len() % channels;
        self.consumer.read(&mut dest[..whole])
    }

    /// Samples dropped since the source last started.
    pub fn dropped_samples(&self) -> usize {
        self.dropped.get()
    }

    pub fn mode(&self) -> SourceMode {
        self.source.mode()
    }

    pub fn using_file_stream(&self) -> bool {
        self.mode() == SourceMode::FileStream
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Ring capacity in samples.
    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }

    /// Samples currently waiting to be read.
    pub fn buffered(&self) -> usize {
        self.consumer.available()
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
