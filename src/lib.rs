//! Soy Engine: software rendering and audio mixing core
//!
//! - Scanline triangle rasterizer with a w-buffer and perspective-correct texturing
//! - Per-mesh pipeline: transform, back-face cull, near and screen-edge clipping
//! - 32-channel PCM mixer with clip-then-halve mixing, pitch and fades
//!
//! Windowing and presentation live in the `soy-viewer` binary.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod arena;
pub mod audio;
pub mod config;
pub mod error;
pub mod rasterizer;

pub use arena::{Arena, Span};
pub use config::EngineConfig;
pub use error::{ArenaError, AssetError, ConfigError, MixerError, PipelineError};
