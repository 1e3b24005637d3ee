//! File decoding behind the [`PcmDecoder`] trait.
//!
//! [`FileStream`](crate::audio::FileStream) only needs three things from a
//! decoder: its native format, a way to pull the next block of interleaved
//! `f32` frames, and a way to go back to the first frame.  [`SymphoniaDecoder`]
//! is the production implementation; tests substitute in-memory decoders.

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("no decodable audio track in {0}")]
    NoTrack(String),

    #[error("decoder error: {0}")]
    Symphonia(#[from] SymphoniaError),
}

// ---------------------------------------------------------------------------
// PcmDecoder trait
// ---------------------------------------------------------------------------

/// Pull-based source of interleaved `f32` PCM frames.
///
/// Implementations are moved onto the file stream worker thread, hence the
/// `Send` bound.
pub trait PcmDecoder: Send {
    /// Interleaved channel count of the frames returned by
    /// [`read_frames`](Self::read_frames).  `0` means unknown.
    fn channels(&self) -> u16;

    /// Native sample rate in Hz.  `0` means unknown.
    fn sample_rate(&self) -> u32;

    /// Replace the contents of `out` with up to `max_frames` frames.
    ///
    /// Returns the number of frames produced; `Ok(0)` signals end of stream.
    fn read_frames(&mut self, out: &mut Vec<f32>, max_frames: usize) -> Result<usize, DecodeError>;

    /// Return to the first frame of the stream.
    fn rewind(&mut self) -> Result<(), DecodeError>;
}

/// Factory invoked by `FileStream::start` to open a fresh decoder.
pub type DecoderOpener = Box<dyn Fn() -> Result<Box<dyn PcmDecoder>, DecodeError> + Send>;

/// Build a [`DecoderOpener`] that opens `path` with [`SymphoniaDecoder`].
pub fn file_opener(path: impl Into<PathBuf>) -> DecoderOpener {
    let path = path.into();
    Box::new(move || {
        SymphoniaDecoder::open(&path).map(|decoder| Box::new(decoder) as Box<dyn PcmDecoder>)
    })
}

// ---------------------------------------------------------------------------
// SymphoniaDecoder
// ---------------------------------------------------------------------------

/// Decodes any container/codec pair enabled in symphonia's feature set.
///
/// Packets decode into variable-sized blocks; surplus frames are kept in
/// `pending` so callers always receive at most the number they asked for.
pub struct SymphoniaDecoder {
    path: PathBuf,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    channels: u16,
    sample_rate: u32,
    sample_buf: Option<SampleBuffer<f32>>,
    pending: Vec<f32>,
}

impl std::fmt::Debug for SymphoniaDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymphoniaDecoder")
            .field("path", &self.path)
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

impl SymphoniaDecoder {
    /// Probe `path` and prepare a decoder for its default audio track.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::NoTrack(path.display().to_string()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let decoder =
            symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

        let mut this = Self {
            path: path.to_path_buf(),
            format,
            decoder,
            track_id,
            channels: codec_params.channels.map(|c| c.count() as u16).unwrap_or(0),
            sample_rate: codec_params.sample_rate.unwrap_or(0),
            sample_buf: None,
            pending: Vec::new(),
        };

        // Some containers only reveal the channel layout once a packet has
        // been decoded.
        if this.channels == 0 || this.sample_rate == 0 {
            this.decode_next_packet()?;
        }

        log::debug!(
            "decoder opened: {} ({} ch @ {} Hz)",
            this.path.display(),
            this.channels,
            this.sample_rate
        );
        Ok(this)
    }

    /// Decode one packet of the selected track into `pending`.
    ///
    /// Returns `Ok(false)` at end of stream.
    fn decode_next_packet(&mut self) -> Result<bool, DecodeError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Corrupt packet: skip it and keep going.
                Err(SymphoniaError::DecodeError(msg)) => {
                    log::debug!("skipping undecodable packet: {msg}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            if self.channels == 0 {
                self.channels = spec.channels.count() as u16;
            }
            if self.sample_rate == 0 {
                self.sample_rate = spec.rate;
            }

            let needs_alloc = self
                .sample_buf
                .as_ref()
                .map_or(true, |b| b.capacity() < decoded.capacity());
            if needs_alloc {
                self.sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
            }
            if let Some(buf) = self.sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                self.pending.extend_from_slice(buf.samples());
            }
            return Ok(true);
        }
    }
}

impl PcmDecoder for SymphoniaDecoder {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_frames(&mut self, out: &mut Vec<f32>, max_frames: usize) -> Result<usize, DecodeError> {
        out.clear();
        let channels = self.channels.max(1) as usize;
        let wanted = max_frames * channels;

        while self.pending.len() < wanted {
            match self.decode_next_packet() {
                Ok(true) => {}
                Ok(false) => break,
                // Hand back what is already decoded; the error resurfaces on
                // the next call if it persists.
                Err(e) if self.pending.len() >= channels => {
                    log::debug!("decode stopped early: {e}");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let frames = (self.pending.len() / channels).min(max_frames);
        out.extend(self.pending.drain(..frames * channels));
        Ok(frames)
    }

    fn rewind(&mut self) -> Result<(), DecodeError> {
        self.pending.clear();
        let seek = self.format.seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts: 0,
                track_id: self.track_id,
            },
        );
        match seek {
            Ok(_) => {
                self.decoder.reset();
                Ok(())
            }
            Err(e) => {
                // Not every container is seekable; reopening is always possible.
                log::debug!("seek to start failed ({e}); reopening {}", self.path.display());
                *self = Self::open(&self.path)?;
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal 16-bit PCM WAV writer for decoder tests.
    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: &[i16]) {
        let data_len = (frames.len() * 2) as u32;
        let byte_rate = sample_rate * channels as u32 * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&(channels * 2).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in frames {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        let mut file = File::create(path).unwrap();
        file.write_all(&bytes).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SymphoniaDecoder::open("/definitely/not/here.wav").unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }

    #[test]
    fn garbage_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"this is not audio").unwrap();
        assert!(SymphoniaDecoder::open(&path).is_err());
    }

    #[test]
    fn reads_wav_frames_then_reports_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = (0..2000).map(|i| if i % 2 == 0 { 8000 } else { -8000 }).collect();
        write_wav(&path, 22_050, 2, &samples);

        let mut decoder = SymphoniaDecoder::open(&path).unwrap();
        assert_eq!(decoder.channels(), 2);
        assert_eq!(decoder.sample_rate(), 22_050);

        let mut out = Vec::new();
        let mut frames = 0;
        loop {
            let n = decoder.read_frames(&mut out, 256).unwrap();
            if n == 0 {
                break;
            }
            assert!(n <= 256);
            assert_eq!(out.len(), n * 2);
            assert!(out[0] > 0.0 && out[1] < 0.0);
            frames += n;
        }
        assert_eq!(frames, 1000);

        decoder.rewind().unwrap();
        assert!(decoder.read_frames(&mut out, 256).unwrap() > 0);
    }

    #[test]
    fn file_opener_reports_open_failure() {
        let opener = file_opener("/no/such/track.flac");
        assert!(opener().is_err());
    }
}
