//! Live input capture via `cpal`.
//!
//! [`LiveCapture`] opens the default input device at the pipeline's sample
//! rate and channel count with `f32` samples.  The cpal callback runs on the
//! host's audio thread and writes each delivered block straight into the
//! [`SampleChannel`]; whatever the channel cannot take is added to the
//! [`DropCounter`].  Nothing in the callback allocates or locks.
//!
//! The `cpal::Stream` is held as an `Option`: `Some` exactly while capture is
//! running, so dropping it (in [`stop`](AudioSource::stop) or on a failed
//! `play`) is the only teardown path.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::channel::{write_or_drop, DropCounter, SampleChannel};
use super::source::{AudioSource, SourceError, SourceMode};

// ---------------------------------------------------------------------------
// LiveCapture
// ---------------------------------------------------------------------------

/// Callback-driven producer backed by the default input device.
pub struct LiveCapture {
    channel: SampleChannel,
    dropped: DropCounter,
    sample_rate: u32,
    channels: u16,
    stream: Option<cpal::Stream>,
}

impl std::fmt::Debug for LiveCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveCapture")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("running", &self.stream.is_some())
            .finish()
    }
}

impl LiveCapture {
    /// Prepare a capture source.  No device is touched until
    /// [`start`](AudioSource::start).
    pub fn new(channel: SampleChannel, dropped: DropCounter, sample_rate: u32, channels: u16) -> Self {
        Self {
            channel,
            dropped,
            sample_rate,
            channels,
            stream: None,
        }
    }

    fn open_stream(&self) -> Result<cpal::Stream, SourceError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(SourceError::NoDevice)?;
        if let Ok(name) = device.name() {
            log::debug!("capture device: {name}");
        }

        let config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let mut producer = self
            .channel
            .claim_producer()
            .ok_or(SourceError::ProducerBusy)?;
        let dropped = self.dropped.clone();

        // On failure the closure, and with it the producer, is dropped here.
        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                write_or_drop(&mut producer, data, &dropped);
            },
            |err: cpal::StreamError| {
                log::warn!("cpal stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        // Only a stream that is actually playing starts a fresh count.
        self.dropped.reset();
        Ok(stream)
    }
}

impl AudioSource for LiveCapture {
    fn start(&mut self) -> Result<(), SourceError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = self.open_stream()?;
        self.stream = Some(stream);
        log::info!(
            "live capture started ({} ch @ {} Hz)",
            self.channels,
            self.sample_rate
        );
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("live capture stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    fn mode(&self) -> SourceMode {
        SourceMode::LiveCapture
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
