//! Audio acquisition: source → lock-free sample channel → frame loop.
//!
//! # Pipeline
//!
//! ```text
//! LiveCapture (cpal callback) ─┐
//!                              ├─▶ Producer ══ SampleChannel ══ Consumer ─▶ AudioEngine::read_samples
//! FileStream (decode thread) ──┘        │
//!                                       └─▶ DropCounter (samples the channel refused)
//! ```
//!
//! The producer side never touches anything but the channel and the drop
//! counter; neither side ever blocks on the other.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use spectrum_tap::audio::AudioEngine;
//! use spectrum_tap::config::AudioConfig;
//!
//! let mut engine = AudioEngine::from_config(&AudioConfig::default());
//! engine.start().unwrap();
//! let mut buf = vec![0.0_f32; 4096];
//! let n = engine.read_samples(&mut buf);
//! println!("read {n} samples");
//! ```

pub mod capture;
pub mod channel;
pub mod decoder;
pub mod engine;
pub mod file_stream;
pub mod metrics;
pub mod resample;
pub mod source;

pub use capture::LiveCapture;
pub use channel::{write_or_drop, Consumer, DropCounter, Producer, SampleChannel};
pub use decoder::{file_opener, DecodeError, DecoderOpener, PcmDecoder, SymphoniaDecoder};
pub use engine::AudioEngine;
pub use file_stream::{FileStream, FileStreamSettings};
pub use metrics::AudioMetrics;
pub use resample::{downmix_to_mono, fan_out, LinearResampler, ResampleError};
pub use source::{AudioSource, SourceError, SourceMode};
