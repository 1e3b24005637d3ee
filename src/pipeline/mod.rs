//! Frame loop wiring the audio engine to the spectral analyzer.
//!
//! # Architecture
//!
//! ```text
//! AudioSource (callback / worker thread)
//!        │  Producer
//!        ▼
//! SampleChannel ── Consumer ──▶ AudioEngine::read_samples
//!                                        │
//! FrameLoop::tick() ◀────────────────────┘   (every 1/fps, never blocks)
//!        ├─ SpectralAnalyzer::push_samples → band_energies
//!        └─ AudioMetrics::update           → rms / peak / dropped
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use spectrum_tap::audio::AudioEngine;
//! use spectrum_tap::config::AppConfig;
//! use spectrum_tap::dsp::SpectralAnalyzer;
//! use spectrum_tap::pipeline::FrameLoop;
//!
//! let config = AppConfig::default();
//! let engine = AudioEngine::from_config(&config.audio);
//! let analyzer =
//!     SpectralAnalyzer::new(engine.sample_rate(), engine.channels(), &config.spectrum).unwrap();
//!
//! let mut frame_loop = FrameLoop::new(engine, analyzer, config.frame_loop.clone());
//! frame_loop.start();
//! let stats = frame_loop.tick();
//! println!("{:?}", stats.peak_band);
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::FrameLoop;
pub use state::FrameStats;
