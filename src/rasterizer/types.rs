//! Core types for the rasterizer

use std::path::Path;

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use super::math::{lerp, Vec4};
use crate::error::AssetError;

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Multiply each channel by its own factor (clamped to 0.0-1.0)
    pub fn modulate(self, r: f32, g: f32, b: f32) -> Self {
        Self {
            r: (self.r as f32 * r.clamp(0.0, 1.0)) as u8,
            g: (self.g as f32 * g.clamp(0.0, 1.0)) as u8,
            b: (self.b as f32 * b.clamp(0.0, 1.0)) as u8,
            a: self.a,
        }
    }

    /// Apply shading (multiply by intensity 0.0-1.0)
    pub fn shade(self, intensity: f32) -> Self {
        self.modulate(intensity, intensity, intensity)
    }

    pub fn lerp(self, end: Color, t: f32) -> Self {
        let ch = |a: u8, b: u8| lerp(a as f32, b as f32, t).clamp(0.0, 255.0) as u8;
        Self {
            r: ch(self.r, end.r),
            g: ch(self.g, end.g),
            b: ch(self.b, end.b),
            a: ch(self.a, end.a),
        }
    }

    /// Convert to [u8; 4] for framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self { r: bytes[0], g: bytes[1], b: bytes[2], a: bytes[3] }
    }
}

/// Texture coordinate. After projection `w` holds the vertex's `1/w`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TexCoord {
    pub u: f32,
    pub v: f32,
    pub w: f32,
}

impl TexCoord {
    pub fn new(u: f32, v: f32, w: f32) -> Self {
        Self { u, v, w }
    }

    pub fn lerp(self, end: TexCoord, t: f32) -> TexCoord {
        TexCoord {
            u: lerp(self.u, end.u, t),
            v: lerp(self.v, end.v, t),
            w: lerp(self.w, end.w, t),
        }
    }
}

/// Triangle with per-vertex position, normal, color and texture coordinate.
///
/// Plain value type: the pipeline copies it freely between stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tri {
    pub pos: [Vec4; 3],
    pub normal: [Vec4; 3],
    pub color: [Vec4; 3],
    pub uv: [TexCoord; 3],
}

impl Default for Tri {
    fn default() -> Self {
        Self {
            pos: [Vec4::point(0.0, 0.0, 0.0); 3],
            normal: [Vec4::ZERO; 3],
            color: [Vec4::new(1.0, 1.0, 1.0, 1.0); 3],
            uv: [TexCoord::new(0.0, 0.0, 1.0); 3],
        }
    }
}

impl Tri {
    pub fn new(p0: Vec4, p1: Vec4, p2: Vec4) -> Self {
        Self {
            pos: [p0, p1, p2],
            ..Default::default()
        }
    }

    pub fn with_uvs(mut self, t0: TexCoord, t1: TexCoord, t2: TexCoord) -> Self {
        self.uv = [t0, t1, t2];
        self
    }

    /// Unit marker triangle centred on (x, y, z), facing -Z
    pub fn marker(x: f32, y: f32, z: f32) -> Self {
        let n = Vec4::new(0.0, 0.0, 1.0, 1.0);
        Self {
            pos: [
                Vec4::point(x, y + 0.5, z),
                Vec4::point(x - 0.5, y - 0.5, z),
                Vec4::point(x + 0.5, y - 0.5, z),
            ],
            normal: [n; 3],
            color: [Vec4::ZERO; 3],
            uv: [
                TexCoord::new(0.5, 0.5, 1.0),
                TexCoord::new(0.0, 1.0, 1.0),
                TexCoord::new(1.0, 0.0, 1.0),
            ],
        }
    }

    /// Flat-shading multiplier stored on the first vertex color
    pub fn shade(&self) -> (f32, f32, f32) {
        (self.color[0].x, self.color[0].y, self.color[0].z)
    }

    pub fn set_shade(&mut self, intensity: f32) {
        for c in &mut self.color {
            c.x = intensity;
            c.y = intensity;
            c.z = intensity;
        }
    }
}

/// Simple texture (array of colors)
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Color>,
    pub name: String,
}

impl Texture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::WHITE; width * height],
            name: String::new(),
        }
    }

    /// Load texture from an image file (PNG, JPEG, BMP)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let tex = Self::from_bytes(&bytes, name)?;
        info!("Loaded texture: {} ({}x{})", tex.name, tex.width, tex.height);
        Ok(tex)
    }

    /// Decode texture from encoded image bytes
    pub fn from_bytes(bytes: &[u8], name: String) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            warn!("Texture '{}' has no pixels", name);
            return Err(AssetError::Empty);
        }

        let pixels: Vec<Color> = rgba
            .pixels()
            .map(|p| Color::with_alpha(p[0], p[1], p[2], p[3]))
            .collect();

        Ok(Self {
            width: width as usize,
            height: height as usize,
            pixels,
            name,
        })
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(width: usize, height: usize, color1: Color, color2: Color) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / 4) + (y / 4)) % 2 == 0;
                pixels.push(if checker { color1 } else { color2 });
            }
        }
        Self { width, height, pixels, name: "checkerboard".to_string() }
    }

    /// Nearest-neighbour sample at UV coordinates, wrapping outside 0..1
    pub fn sample(&self, u: f32, v: f32) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::BLACK;
        }
        let tx = ((u * self.width as f32).floor() as i64).rem_euclid(self.width as i64) as usize;
        let ty = ((v * self.height as f32).floor() as i64).rem_euclid(self.height as i64) as usize;
        self.pixels[ty * self.width + tx]
    }

    /// Texel at integer coordinates, wrapping
    pub fn sample_texel(&self, x: i32, y: i32) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::BLACK;
        }
        let tx = (x as i64).rem_euclid(self.width as i64) as usize;
        let ty = (y as i64).rem_euclid(self.height as i64) as usize;
        self.pixels[ty * self.width + tx]
    }

    /// Get pixel at x,y coordinates
    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x]
        } else {
            Color::BLACK
        }
    }
}

/// Which rasterizer path the pipeline feeds surviving triangles to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    #[default]
    Textured,
    Lines,
    Solid,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [RenderMode::Textured, RenderMode::Lines, RenderMode::Solid];

    pub fn label(&self) -> &'static str {
        match self {
            RenderMode::Textured => "Textured",
            RenderMode::Lines => "Lines",
            RenderMode::Solid => "Solid",
        }
    }
}

/// Rasterizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    /// Active render mode
    pub mode: RenderMode,
    /// Sub-pixel textured path (false = integer fast path, always affine)
    pub sub_pixel: bool,
    /// Divide interpolated UVs by interpolated 1/w before sampling
    pub perspective_correct: bool,
    /// Direction towards the sun, normalized before use
    pub sun_direction: Vec4,
    /// Base color for the solid path
    pub solid_color: Color,
    /// Wireframe color
    pub line_color: Color,
    /// Framebuffer clear color
    pub clear_color: Color,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            mode: RenderMode::Textured,
            sub_pixel: true,
            perspective_correct: true,
            sun_direction: Vec4::new(0.9, 0.6, -0.9, 1.0),
            solid_color: Color::WHITE,
            line_color: Color::WHITE,
            clear_color: Color::new(30, 30, 35),
        }
    }
}
