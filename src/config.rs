//! Engine configuration, stored as RON
//!
//! Every field has a default, so a partial file (or an empty `()`) loads.

use std::fs;
use std::path::Path;

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::audio::SAMPLE_RATE;
use crate::error::ConfigError;
use crate::rasterizer::{RasterSettings, HEIGHT, WIDTH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub width: usize,
    pub height: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            width: WIDTH,
            height: HEIGHT,
        }
    }
}

/// Sizes of the per-frame scratch storage, in triangles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Total frame arena: every mesh drawn in a frame takes its tri cache plus one clip queue from it
    pub arena_tris: usize,
    /// Clip queue per draw; 31 covers the worst case for one triangle
    pub clip_queue_tris: usize,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            arena_tris: 16 * 1024,
            clip_queue_tris: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Output channels requested from the device (2 = stereo)
    pub channels: u16,
    pub master_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            channels: 2,
            master_volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub render: RasterSettings,
    pub camera: CameraConfig,
    pub scratch: ScratchConfig,
    pub audio: AudioConfig,
}

impl EngineConfig {
    /// Load from a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_ron_str(&contents)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Save to a RON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}
