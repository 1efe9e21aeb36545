//! Error types for the rendering and audio core

use thiserror::Error;

/// Scratch arena failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("arena '{label}' out of memory: requested {requested}, {remaining} remaining")]
    OutOfMemory {
        label: &'static str,
        requested: usize,
        remaining: usize,
    },
    #[error("span from generation {found} used after reset (arena is at generation {expected})")]
    StaleSpan { expected: u64, found: u64 },
    #[error("span {start}..{end} outside arena of {capacity} slots")]
    OutOfBounds {
        start: usize,
        end: usize,
        capacity: usize,
    },
}

/// 3D pipeline failures. A failed draw call renders nothing for that mesh.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("tri cache exceeded for mesh '{mesh}' ({capacity} triangles)")]
    TriCacheOverflow { mesh: String, capacity: usize },
    #[error("clip queue overflow ({capacity} triangles)")]
    ClipQueueOverflow { capacity: usize },
    #[error("tri cache capacity {capacity} is smaller than triangle count {tri_count}")]
    InvalidCacheCapacity { capacity: usize, tri_count: usize },
    #[error("textured render mode requires a texture")]
    MissingTexture,
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

/// Audio mixer failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MixerError {
    #[error("channel {channel} out of range ({channels} channels)")]
    ChannelOutOfRange { channel: usize, channels: usize },
    #[error("sound has no sample data")]
    EmptySound,
    #[error("channel {0} holds no sound")]
    EmptyChannel(usize),
}

/// Texture and sample loading failures
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("raw PCM data has odd length {0}, expected 16-bit samples")]
    OddPcmLength(usize),
    #[error("sample data is empty")]
    Empty,
}

/// Configuration load/save failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
}
