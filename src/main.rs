//! Application entry point: spectrum-tap.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the [`AudioEngine`]: a configured file loops through
//!    `FileStream`, otherwise the default input device is captured.
//! 4. Build the [`SpectralAnalyzer`] for the engine's rate and layout.
//! 5. Start acquisition; failure leaves the loop running without audio.
//! 6. Run the [`FrameLoop`] until `run_secs` elapses (or forever).

use anyhow::Context;
use spectrum_tap::{
    audio::AudioEngine, config::AppConfig, dsp::SpectralAnalyzer, pipeline::FrameLoop,
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("spectrum-tap starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e:#}); using defaults");
        AppConfig::default()
    });

    // 3. Audio engine
    let engine = AudioEngine::from_config(&config.audio);
    match &config.audio.file {
        Some(path) => log::info!("Streaming {} on loop", path.display()),
        None => log::info!("Capturing from the default input device"),
    }

    // 4. Analyzer; a bad spectrum section is the one fatal config error
    let analyzer = SpectralAnalyzer::new(engine.sample_rate(), engine.channels(), &config.spectrum)
        .context("invalid [spectrum] settings")?;

    // 5-6. Run
    let mut frame_loop = FrameLoop::new(engine, analyzer, config.frame_loop.clone());
    frame_loop.start();
    frame_loop.run();
    frame_loop.stop();

    log::info!("spectrum-tap shut down");
    Ok(())
}
