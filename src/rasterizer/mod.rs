//! Software rasterizer
//!
//! Row-vector math, a w-buffered framebuffer, single-plane triangle clipping,
//! scanline rasterization with perspective-correct texturing, and the
//! per-mesh pipeline that ties them together.

mod math;
mod types;
mod framebuffer;
mod clip;
mod raster;
mod pipeline;

pub use math::*;
pub use types::*;
pub use framebuffer::*;
pub use clip::*;
pub use raster::*;
pub use pipeline::*;

/// Default framebuffer dimensions
pub const WIDTH: usize = 320;
pub const HEIGHT: usize = 240;
