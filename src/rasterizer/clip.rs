//! Single-plane triangle clipping and the bounded clip queue
//!
//! A triangle clipped against one plane yields 0, 1 or 2 triangles. The
//! pipeline clips once against the near plane in view space, then runs each
//! projected triangle through the four screen edges using [`TriQueue`].

use super::math::Vec4;
use super::types::Tri;
use crate::error::PipelineError;

/// Plane given by a point on it and a normal pointing into the kept half-space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlane {
    pub point: Vec4,
    pub normal: Vec4,
}

impl ClipPlane {
    /// Normal is normalized here so distances are in world units.
    pub fn new(point: Vec4, normal: Vec4) -> Self {
        Self { point, normal: normal.normalize() }
    }

    /// View-space near plane, `z >= 0.2`
    pub fn near() -> Self {
        Self::new(Vec4::dir(0.0, 0.0, 0.2), Vec4::dir(0.0, 0.0, 1.0))
    }

    /// Screen edges in clip order: top, bottom, left, right
    ///
    /// The right edge sits at `width - 1` and spans are half-open, so the
    /// last pixel column is never filled by the triangle rasterizer.
    pub fn screen_edges(width: usize, height: usize) -> [ClipPlane; 4] {
        let right = width as f32 - 1.0;
        let bottom = height as f32 - 1.0;
        [
            Self::new(Vec4::dir(0.0, 0.0, 0.0), Vec4::dir(0.0, 1.0, 0.0)),
            Self::new(Vec4::dir(0.0, bottom, 0.0), Vec4::dir(0.0, -1.0, 0.0)),
            Self::new(Vec4::dir(0.0, 0.0, 0.0), Vec4::dir(1.0, 0.0, 0.0)),
            Self::new(Vec4::dir(right, 0.0, 0.0), Vec4::dir(-1.0, 0.0, 0.0)),
        ]
    }

    /// Signed distance from `p` to the plane; positive on the kept side
    pub fn distance(&self, p: Vec4) -> f32 {
        self.normal.dot(p) - self.normal.dot(self.point)
    }

    /// Where the segment `start..end` crosses the plane, and the parameter `t` of the crossing
    pub fn intersect(&self, start: Vec4, end: Vec4) -> (Vec4, f32) {
        let plane_d = -self.normal.dot(self.point);
        let ad = start.dot(self.normal);
        let bd = end.dot(self.normal);
        let t = (-plane_d - ad) / (bd - ad);
        (start.lerp(end, t), t)
    }

    /// Inside flags for the three vertices (`distance >= 0`)
    pub fn classify(&self, tri: &Tri) -> [bool; 3] {
        [
            self.distance(tri.pos[0]) >= 0.0,
            self.distance(tri.pos[1]) >= 0.0,
            self.distance(tri.pos[2]) >= 0.0,
        ]
    }

    /// Clip `tri` against this plane.
    ///
    /// Outputs keep the source winding: vertices are taken in cyclic order
    /// starting from an inside vertex, with crossing points in place of the
    /// outside ones. Each crossing uses one `t` for both position and
    /// texture coordinate.
    pub fn clip(&self, tri: &Tri) -> ClipResult {
        let flags = self.classify(tri);
        let crossing = |from: usize, to: usize| {
            let (p, t) = self.intersect(tri.pos[from], tri.pos[to]);
            (p, tri.uv[from].lerp(tri.uv[to], t))
        };

        match flags.iter().filter(|f| **f).count() {
            0 => ClipResult::None,
            3 => ClipResult::One(*tri),
            1 => {
                let Some(a) = flags.iter().position(|f| *f) else {
                    return ClipResult::None;
                };
                let (next, prev) = ((a + 1) % 3, (a + 2) % 3);
                let (p_next, uv_next) = crossing(a, next);
                let (p_prev, uv_prev) = crossing(a, prev);

                let mut out = *tri;
                out.pos = [tri.pos[a], p_next, p_prev];
                out.uv = [tri.uv[a], uv_next, uv_prev];
                ClipResult::One(out)
            }
            _ => {
                let Some(o) = flags.iter().position(|f| !*f) else {
                    return ClipResult::One(*tri);
                };
                // o, next, prev is the source cycle; the quad is next, prev, P(prev), P(next)
                let (next, prev) = ((o + 1) % 3, (o + 2) % 3);
                let (p_prev, uv_prev) = crossing(prev, o);
                let (p_next, uv_next) = crossing(next, o);

                let mut first = *tri;
                first.pos = [tri.pos[next], tri.pos[prev], p_prev];
                first.uv = [tri.uv[next], tri.uv[prev], uv_prev];

                let mut second = *tri;
                second.pos = [tri.pos[next], p_prev, p_next];
                second.uv = [tri.uv[next], uv_prev, uv_next];

                ClipResult::Two([first, second])
            }
        }
    }
}

/// Outcome of clipping one triangle against one plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipResult {
    None,
    One(Tri),
    Two([Tri; 2]),
}

impl ClipResult {
    pub fn len(&self) -> usize {
        match self {
            ClipResult::None => 0,
            ClipResult::One(_) => 1,
            ClipResult::Two(_) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ClipResult::None)
    }

    pub fn as_slice(&self) -> &[Tri] {
        match self {
            ClipResult::None => &[],
            ClipResult::One(t) => std::slice::from_ref(t),
            ClipResult::Two(ts) => ts,
        }
    }
}

/// Clip `tri` against the plane through `point` with `normal`
pub fn clip_against_plane(point: Vec4, normal: Vec4, tri: &Tri) -> ClipResult {
    ClipPlane::new(point, normal).clip(tri)
}

/// Worst case for one triangle through the four screen edges: 1 + 2 + 4 + 8 + 16
pub const CLIP_QUEUE_WORST_CASE: usize = 31;

/// Bounded FIFO over a borrowed scratch slice.
///
/// Only ever appends at the back, so the slice must hold every triangle
/// produced by all stages for one source triangle. Overflow is an error,
/// never a silent drop.
pub struct TriQueue<'a> {
    slots: &'a mut [Tri],
    front: usize,
    back: usize,
}

impl<'a> TriQueue<'a> {
    pub fn new(slots: &'a mut [Tri]) -> Self {
        Self { slots, front: 0, back: 0 }
    }

    pub fn clear(&mut self) {
        self.front = 0;
        self.back = 0;
    }

    pub fn len(&self) -> usize {
        self.back - self.front
    }

    pub fn is_empty(&self) -> bool {
        self.front == self.back
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn push(&mut self, tri: Tri) -> Result<(), PipelineError> {
        if self.back >= self.slots.len() {
            return Err(PipelineError::ClipQueueOverflow { capacity: self.slots.len() });
        }
        self.slots[self.back] = tri;
        self.back += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Tri> {
        if self.is_empty() {
            return None;
        }
        let tri = self.slots[self.front];
        self.front += 1;
        Some(tri)
    }

    /// Push `tri` through `planes` in order; survivors are left queued.
    pub fn clip_through(&mut self, tri: Tri, planes: &[ClipPlane]) -> Result<usize, PipelineError> {
        self.clear();
        self.push(tri)?;
        for plane in planes {
            let pending = self.len();
            for _ in 0..pending {
                let Some(t) = self.pop() else { break };
                for out in plane.clip(&t).as_slice() {
                    self.push(*out)?;
                }
            }
        }
        Ok(self.len())
    }
}
