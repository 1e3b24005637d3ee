//! Real-time audio spectrum tap.
//!
//! Live capture or a looping decoded file feeds a lock-free sample channel;
//! a fixed-cadence frame loop drains it into a hop-based STFT analyzer that
//! produces smoothed per-band energies.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod pipeline;
