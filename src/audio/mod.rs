//! Sample playback: sounds, the channel mixer and the output device

mod sound;
mod mixer;
#[cfg(not(target_arch = "wasm32"))]
mod engine;

pub use sound::*;
pub use mixer::*;
#[cfg(not(target_arch = "wasm32"))]
pub use engine::AudioEngine;

/// Output sample rate samples are authored for
pub const SAMPLE_RATE: u32 = 48_000;
