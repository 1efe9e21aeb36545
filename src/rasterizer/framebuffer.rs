//! Framebuffer and 2D drawing primitives
//!
//! Every write is clipped to the current draw rect. The depth buffer is a
//! w-buffer: it stores interpolated `1/w`, is cleared to 0.0, and a fragment
//! wins when its value is strictly greater than the stored one.

use serde::{Serialize, Deserialize};

use super::types::{Color, Texture};

/// Integer rectangle (top-left origin)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        Rect::new(x, y, (r - x).max(0), (b - y).max(0))
    }
}

/// RGBA8 framebuffer with a matching f32 depth buffer
pub struct Framebuffer {
    pub pixels: Vec<u8>, // RGBA, 4 bytes per pixel
    pub depth: Vec<f32>, // 1/w per pixel
    pub width: usize,
    pub height: usize,
    clip: Rect,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            depth: vec![0.0; width * height],
            width,
            height,
            clip: Rect::new(0, 0, width as i32, height as i32),
        }
    }

    /// Reallocate for a new size; contents are discarded and the draw rect reset.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width * height * 4];
        self.depth = vec![0.0; width * height];
        self.clip = self.bounds();
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    /// Restrict drawing to `rect` (clamped to the framebuffer)
    pub fn set_clip(&mut self, rect: Rect) {
        self.clip = rect.intersect(&self.bounds());
    }

    pub fn reset_clip(&mut self) {
        self.clip = self.bounds();
    }

    pub fn clip(&self) -> Rect {
        self.clip
    }

    /// Fill the whole framebuffer with `color` and clear depth
    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.depth.fill(0.0);
    }

    /// Reset depth to 0.0 inside the draw rect
    pub fn clear_depth(&mut self) {
        let clip = self.clip;
        for y in clip.y..clip.bottom() {
            let row = y as usize * self.width;
            self.depth[row + clip.x as usize..row + clip.right() as usize].fill(0.0);
        }
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.clip.contains(x, y) {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        match self.index(x, y) {
            Some(idx) => {
                self.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
                true
            }
            None => false,
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        Some(Color::from_bytes([
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]))
    }

    /// Stored `1/w`, or `None` outside the draw rect
    pub fn depth_at(&self, x: i32, y: i32) -> Option<f32> {
        self.index(x, y).map(|idx| self.depth[idx])
    }

    pub fn set_depth(&mut self, x: i32, y: i32, w: f32) {
        if let Some(idx) = self.index(x, y) {
            self.depth[idx] = w;
        }
    }

    /// Depth-tested write: succeeds only if `w` is strictly greater than the stored value
    pub fn set_pixel_with_depth(&mut self, x: i32, y: i32, w: f32, color: Color) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        if w > self.depth[idx] {
            self.depth[idx] = w;
            self.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
            return true;
        }
        false
    }

    /// Draw a line from (x0, y0) to (x1, y1) using Bresenham's algorithm
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Rectangle outline; corners may be given in any order
    pub fn draw_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));
        self.draw_line(x0, y0, x1, y0, color);
        self.draw_line(x0, y1, x1, y1, color);
        self.draw_line(x0, y0, x0, y1, color);
        self.draw_line(x1, y0, x1, y1, color);
    }

    /// Nested outlines growing inward
    pub fn draw_rect_thick(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, thickness: u32, color: Color) {
        let (mut x0, mut x1) = (x0.min(x1), x0.max(x1));
        let (mut y0, mut y1) = (y0.min(y1), y0.max(y1));
        for _ in 0..thickness {
            if x0 > x1 || y0 > y1 {
                break;
            }
            self.draw_rect(x0, y0, x1, y1, color);
            x0 += 1;
            y0 += 1;
            x1 -= 1;
            y1 -= 1;
        }
    }

    /// Fill the half-open rectangle [x0, x1) x [y0, y1)
    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let area = Rect::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
            .intersect(&self.clip);
        let bytes = color.to_bytes();
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let idx = (y as usize * self.width + x as usize) * 4;
                self.pixels[idx..idx + 4].copy_from_slice(&bytes);
            }
        }
    }

    /// Horizontal gradient from `from` (left) to `to` (right)
    pub fn fill_gradient_h(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, from: Color, to: Color) {
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));
        let span = (x1 - x0).max(1) as f32;
        for x in x0..x1 {
            let c = from.lerp(to, (x - x0) as f32 / span);
            for y in y0..y1 {
                self.set_pixel(x, y, c);
            }
        }
    }

    /// Vertical gradient from `from` (top) to `to` (bottom)
    pub fn fill_gradient_v(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, from: Color, to: Color) {
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));
        let span = (y1 - y0).max(1) as f32;
        for y in y0..y1 {
            let c = from.lerp(to, (y - y0) as f32 / span);
            for x in x0..x1 {
                self.set_pixel(x, y, c);
            }
        }
    }

    /// Ellipse outline centred on (xm, ym) with semi-axes a and b
    pub fn draw_ellipse(&mut self, xm: i32, ym: i32, a: i32, b: i32, color: Color) {
        if a <= 0 || b <= 0 {
            self.set_pixel(xm, ym, color);
            return;
        }
        let a2 = a as i64 * a as i64;
        let b2 = b as i64 * b as i64;
        let mut x = -(a as i64);
        let mut y: i64 = 0;
        let mut err = x * (2 * b2 + x) + b2;

        loop {
            let (px, py) = (x as i32, y as i32);
            self.set_pixel(xm - px, ym + py, color);
            self.set_pixel(xm + px, ym + py, color);
            self.set_pixel(xm + px, ym - py, color);
            self.set_pixel(xm - px, ym - py, color);

            let e2 = 2 * err;
            if e2 >= (x * 2 + 1) * b2 {
                x += 1;
                err += (x * 2 + 1) * b2;
            }
            if e2 <= (y * 2 + 1) * a2 {
                y += 1;
                err += (y * 2 + 1) * a2;
            }
            if x > 0 {
                break;
            }
        }

        // flat ellipses stop early; finish the tips
        while y < b as i64 {
            y += 1;
            self.set_pixel(xm, ym + y as i32, color);
            self.set_pixel(xm, ym - y as i32, color);
        }
    }

    /// Draw a filled circle at (cx, cy) with given radius and color
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, color: Color) {
        let r_sq = radius * radius;
        for y in (cy - radius)..=(cy + radius) {
            for x in (cx - radius)..=(cx + radius) {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= r_sq {
                    self.set_pixel(x, y, color);
                }
            }
        }
    }

    /// Flat-colored triangle without depth test (GUI/2D use)
    pub fn fill_triangle(&mut self, p0: (f32, f32), p1: (f32, f32), p2: (f32, f32), color: Color) {
        let mut v = [p0, p1, p2];
        v.sort_by(|a, b| a.1.total_cmp(&b.1));
        let [(x1, y1), (x2, y2), (x3, y3)] = v;

        if y3 - y1 <= 0.0 {
            return;
        }

        let top = y1.ceil() as i32;
        let bottom = y3.ceil() as i32;
        for y in top..bottom {
            let fy = y as f32;
            let long_x = x1 + (x3 - x1) * (fy - y1) / (y3 - y1);
            let short_x = if fy < y2 {
                if y2 - y1 > 0.0 { x1 + (x2 - x1) * (fy - y1) / (y2 - y1) } else { x2 }
            } else if y3 - y2 > 0.0 {
                x2 + (x3 - x2) * (fy - y2) / (y3 - y2)
            } else {
                x2
            };
            let (l, r) = if long_x < short_x { (long_x, short_x) } else { (short_x, long_x) };
            for x in l.ceil() as i32..r.ceil() as i32 {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Copy a texture 1:1 with its top-left at (x, y); fully transparent texels are skipped.
    pub fn blit(&mut self, texture: &Texture, x: i32, y: i32) {
        for ty in 0..texture.height {
            for tx in 0..texture.width {
                let c = texture.pixels[ty * texture.width + tx];
                if c.a != 0 {
                    self.set_pixel(x + tx as i32, y + ty as i32, c);
                }
            }
        }
    }

    /// Stretch a texture over the whole draw rect (nearest-neighbour)
    pub fn draw_background(&mut self, texture: &Texture) {
        let clip = self.clip;
        if clip.width == 0 || clip.height == 0 {
            return;
        }
        for y in clip.y..clip.bottom() {
            let v = (y - clip.y) as f32 / clip.height as f32;
            for x in clip.x..clip.right() {
                let u = (x - clip.x) as f32 / clip.width as f32;
                self.set_pixel(x, y, texture.sample(u, v));
            }
        }
    }
}
