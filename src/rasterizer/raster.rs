//! Scanline triangle rasterizer
//!
//! Vertices are sorted by y and the triangle is walked as a top half
//! (v1 to v2) and a bottom half (v2 to v3). Each scanline interpolates
//! `u`, `v` and `1/w` between the long edge and the current short edge.
//! All variants depth-test against the w-buffer: larger `1/w` wins.

use super::framebuffer::Framebuffer;
use super::types::{Color, Texture, Tri};

/// Screen-space vertex as the rasterizer sees it
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RasterVertex {
    pub x: f32,
    pub y: f32,
    pub u: f32,
    pub v: f32,
    /// `1/w` of the vertex
    pub w: f32,
}

impl RasterVertex {
    pub fn new(x: f32, y: f32, u: f32, v: f32, w: f32) -> Self {
        Self { x, y, u, v, w }
    }

    /// Screen position from `pos`, texture coordinate and `1/w` from `uv`
    pub fn from_tri(tri: &Tri) -> [RasterVertex; 3] {
        std::array::from_fn(|i| RasterVertex {
            x: tri.pos[i].x,
            y: tri.pos[i].y,
            u: tri.uv[i].u,
            v: tri.uv[i].v,
            w: tri.uv[i].w,
        })
    }

    fn truncated(self) -> Self {
        Self {
            x: self.x as i32 as f32,
            y: self.y as i32 as f32,
            ..self
        }
    }
}

/// Per-row slopes of one edge; zero when the edge is horizontal
#[derive(Default, Clone, Copy)]
struct EdgeStep {
    x: f32,
    u: f32,
    v: f32,
    w: f32,
}

impl EdgeStep {
    fn between(a: &RasterVertex, b: &RasterVertex) -> Self {
        let dy = (b.y - a.y).abs();
        if dy == 0.0 {
            return Self::default();
        }
        Self {
            x: (b.x - a.x) / dy,
            u: (b.u - a.u) / dy,
            v: (b.v - a.v) / dy,
            w: (b.w - a.w) / dy,
        }
    }

    fn at(&self, origin: &RasterVertex, row: f32) -> RasterVertex {
        let d = row - origin.y;
        RasterVertex {
            x: origin.x + d * self.x,
            y: row,
            u: origin.u + d * self.u,
            v: origin.v + d * self.v,
            w: origin.w + d * self.w,
        }
    }
}

/// Walk the interior of a triangle, calling `plot(x, y, u, v, w)` for each pixel.
///
/// `sub_pixel` keeps fractional vertex positions and starts each half one row
/// below its top vertex. Otherwise vertices are truncated to whole pixels and
/// the top half includes its first row.
pub fn rasterize_spans<F>(verts: [RasterVertex; 3], sub_pixel: bool, mut plot: F)
where
    F: FnMut(i32, i32, f32, f32, f32),
{
    let mut v = if sub_pixel { verts } else { verts.map(RasterVertex::truncated) };
    if v[1].y < v[0].y {
        v.swap(0, 1);
    }
    if v[2].y < v[0].y {
        v.swap(0, 2);
    }
    if v[2].y < v[1].y {
        v.swap(1, 2);
    }
    let [a, b, c] = v;

    let long = EdgeStep::between(&a, &c);

    let top = EdgeStep::between(&a, &b);
    if b.y - a.y != 0.0 {
        // sub-pixel starts below the top vertex: a vertex on row 0 leaves row 0 empty
        let first = if sub_pixel { a.y as i32 + 1 } else { a.y as i32 };
        for row in first..=b.y as i32 {
            let fy = row as f32;
            span(top.at(&a, fy), long.at(&a, fy), row, &mut plot);
        }
    }

    let bottom = EdgeStep::between(&b, &c);
    if c.y - b.y != 0.0 {
        for row in b.y as i32 + 1..=c.y as i32 {
            let fy = row as f32;
            span(bottom.at(&b, fy), long.at(&a, fy), row, &mut plot);
        }
    }
}

fn span<F>(mut start: RasterVertex, mut end: RasterVertex, row: i32, plot: &mut F)
where
    F: FnMut(i32, i32, f32, f32, f32),
{
    let mut ax = start.x as i32;
    let mut bx = end.x as i32;
    if ax > bx {
        std::mem::swap(&mut ax, &mut bx);
        std::mem::swap(&mut start, &mut end);
    }
    if bx == ax {
        return;
    }

    let t_step = 1.0 / (bx - ax) as f32;
    let mut t = 0.0;
    for x in ax..bx {
        let u = (1.0 - t) * start.u + t * end.u;
        let v = (1.0 - t) * start.v + t * end.v;
        let w = (1.0 - t) * start.w + t * end.w;
        plot(x, row, u, v, w);
        t += t_step;
    }
}

fn passes_depth(fb: &Framebuffer, x: i32, y: i32, w: f32) -> bool {
    fb.depth_at(x, y).is_some_and(|d| w > d)
}

/// Flat-shaded triangle. Returns the number of pixels written.
pub fn draw_triangle_solid(
    fb: &mut Framebuffer,
    verts: [RasterVertex; 3],
    color: Color,
    shade: (f32, f32, f32),
) -> usize {
    let shaded = color.modulate(shade.0, shade.1, shade.2);
    let mut written = 0;
    rasterize_spans(verts, true, |x, y, _, _, w| {
        if fb.set_pixel_with_depth(x, y, w, shaded) {
            written += 1;
        }
    });
    written
}

/// Sub-pixel textured triangle.
///
/// With `perspective` set, `u`/`v` are expected pre-divided by `w` and are
/// recovered per pixel by dividing by the interpolated `1/w`.
pub fn draw_triangle_textured(
    fb: &mut Framebuffer,
    texture: &Texture,
    verts: [RasterVertex; 3],
    shade: (f32, f32, f32),
    perspective: bool,
) -> usize {
    let mut written = 0;
    rasterize_spans(verts, true, |x, y, u, v, w| {
        if !passes_depth(fb, x, y, w) {
            return;
        }
        let texel = if perspective {
            texture.sample(u / w, v / w)
        } else {
            texture.sample(u, v)
        };
        if fb.set_pixel_with_depth(x, y, w, texel.modulate(shade.0, shade.1, shade.2)) {
            written += 1;
        }
    });
    written
}

/// Integer-snapped textured triangle with affine texture mapping
pub fn draw_triangle_textured_int(
    fb: &mut Framebuffer,
    texture: &Texture,
    verts: [RasterVertex; 3],
    shade: (f32, f32, f32),
) -> usize {
    let mut written = 0;
    rasterize_spans(verts, false, |x, y, u, v, w| {
        if !passes_depth(fb, x, y, w) {
            return;
        }
        let texel = texture.sample(u, v).modulate(shade.0, shade.1, shade.2);
        if fb.set_pixel_with_depth(x, y, w, texel) {
            written += 1;
        }
    });
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(points: [(f32, f32); 3], w: f32) -> [RasterVertex; 3] {
        points.map(|(x, y)| RasterVertex::new(x, y, 0.0, 0.0, w))
    }

    const FULL: (f32, f32, f32) = (1.0, 1.0, 1.0);

    #[test]
    fn test_solid_fills_interior() {
        let mut fb = Framebuffer::new(16, 16);
        let n = draw_triangle_solid(&mut fb, flat([(0.0, 0.0), (12.0, 0.0), (0.0, 12.0)], 1.0), Color::RED, FULL);
        assert!(n > 40 && n < 90, "unexpected pixel count {}", n);
        assert_eq!(fb.get_pixel(2, 2), Some(Color::RED));
        assert_eq!(fb.get_pixel(14, 14), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_nearer_wins_in_either_order() {
        let near = flat([(0.0, 0.0), (15.0, 0.0), (0.0, 15.0)], 0.5);
        // fully covered by `near`
        let far = flat([(1.0, 1.0), (12.0, 1.0), (1.0, 12.0)], 0.25);

        let mut fb = Framebuffer::new(16, 16);
        draw_triangle_solid(&mut fb, far, Color::BLUE, FULL);
        draw_triangle_solid(&mut fb, near, Color::RED, FULL);
        assert_eq!(fb.get_pixel(4, 4), Some(Color::RED));

        let mut fb = Framebuffer::new(16, 16);
        draw_triangle_solid(&mut fb, near, Color::RED, FULL);
        let n = draw_triangle_solid(&mut fb, far, Color::BLUE, FULL);
        assert_eq!(fb.get_pixel(4, 4), Some(Color::RED));
        assert_eq!(n, 0);
    }

    #[test]
    fn test_degenerate_triangles_draw_nothing() {
        let mut fb = Framebuffer::new(8, 8);
        // zero height
        assert_eq!(draw_triangle_solid(&mut fb, flat([(0.0, 3.0), (5.0, 3.0), (7.0, 3.0)], 1.0), Color::RED, FULL), 0);
        // zero width
        assert_eq!(draw_triangle_solid(&mut fb, flat([(3.0, 0.0), (3.0, 4.0), (3.0, 7.0)], 1.0), Color::RED, FULL), 0);
    }

    #[test]
    fn test_shade_applied_once() {
        let mut fb = Framebuffer::new(8, 8);
        draw_triangle_solid(&mut fb, flat([(0.0, 0.0), (7.0, 0.0), (0.0, 7.0)], 1.0), Color::new(200, 200, 200), (0.5, 0.5, 0.5));
        assert_eq!(fb.get_pixel(1, 2), Some(Color::new(100, 100, 100)));
    }

    #[test]
    fn test_int_path_samples_affine_uvs() {
        let mut tex = Texture::new(2, 1);
        tex.pixels[1] = Color::GREEN;
        let mut fb = Framebuffer::new(16, 16);
        let verts = [
            RasterVertex::new(0.0, 0.0, 0.0, 0.0, 1.0),
            RasterVertex::new(15.0, 0.0, 0.99, 0.0, 1.0),
            RasterVertex::new(0.0, 15.0, 0.0, 0.99, 1.0),
        ];
        let n = draw_triangle_textured_int(&mut fb, &tex, verts, FULL);
        assert!(n > 0);
        // left side samples texel 0, right side texel 1
        assert_eq!(fb.get_pixel(1, 1), Some(Color::WHITE));
        assert_eq!(fb.get_pixel(12, 1), Some(Color::GREEN));
    }
}
