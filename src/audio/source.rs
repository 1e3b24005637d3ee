//! The start/stop contract shared by every acquisition source.
//!
//! A source is the *producer* side of the pipeline: once started it writes
//! interleaved frames into a [`SampleChannel`](crate::audio::SampleChannel)
//! from its own context (hardware callback or worker thread) and charges
//! rejected samples to a [`DropCounter`](crate::audio::DropCounter).
//!
//! Two implementations exist:
//!
//! | Source | Producer context | Selected when |
//! |--------|------------------|---------------|
//! | [`LiveCapture`](crate::audio::LiveCapture) | cpal input callback | no file path configured |
//! | [`FileStream`](crate::audio::FileStream)   | dedicated decode thread | a file path is configured |

use thiserror::Error;

use super::decoder::DecodeError;
use super::resample::ResampleError;

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

/// Why a source failed to start.  Every variant is recoverable: the caller
/// may retry or carry on without audio.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to open decoder: {0}")]
    Decoder(#[from] DecodeError),

    #[error("failed to initialise resampler: {0}")]
    Resampler(#[from] ResampleError),

    #[error("invalid file stream settings: {0}")]
    InvalidSettings(&'static str),

    #[error("sample channel already has an active producer")]
    ProducerBusy,

    #[error("failed to spawn file stream worker: {0}")]
    Spawn(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// SourceMode
// ---------------------------------------------------------------------------

/// Which kind of source feeds the channel.  Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    LiveCapture,
    FileStream,
}

impl SourceMode {
    pub fn label(&self) -> &'static str {
        match self {
            SourceMode::LiveCapture => "capture",
            SourceMode::FileStream => "file",
        }
    }
}

// ---------------------------------------------------------------------------
// AudioSource trait
// ---------------------------------------------------------------------------

/// Lifecycle of a producer feeding the sample channel.
///
/// # Contract
///
/// - [`start`](Self::start) on a running source is a no-op returning `Ok`.
/// - A failed `start` leaves no device, decoder, or thread behind.
/// - [`stop`](Self::stop) is idempotent and safe before any successful
///   `start`; implementations also call it from `Drop`.
/// - The dropped-sample counter is reset on every successful `start`.
///
/// Not `Send`: cpal streams are pinned to the thread that created them on
/// some platforms, so sources stay with the owning frame loop.
pub trait AudioSource {
    fn start(&mut self) -> Result<(), SourceError>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;

    fn mode(&self) -> SourceMode;
}

// Compile-time assertion: Box<dyn AudioSource> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioSource>) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_labels() {
        assert_eq!(SourceMode::LiveCapture.label(), "capture");
        assert_eq!(SourceMode::FileStream.label(), "file");
    }

    #[test]
    fn errors_render_cause() {
        let err = SourceError::from(DecodeError::NoTrack("a.ogg".into()));
        assert_eq!(
            err.to_string(),
            "failed to open decoder: no decodable audio track in a.ogg"
        );
        assert_eq!(
            SourceError::ProducerBusy.to_string(),
            "sample channel already has an active producer"
        );
    }
}
