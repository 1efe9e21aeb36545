//! Triangle pipeline
//!
//! Per mesh: world/view transform, back-face cull, flat lighting, near clip,
//! projection to screen space, four screen-edge clips through the clip queue,
//! then rasterization in the active [`RenderMode`].

use tracing::{error, trace, warn};

use super::clip::{ClipPlane, TriQueue};
use super::framebuffer::Framebuffer;
use super::math::{ndc_to_screen, Mat4, Vec4};
use super::raster::{draw_triangle_solid, draw_triangle_textured, draw_triangle_textured_int, RasterVertex};
use super::types::{RasterSettings, RenderMode, TexCoord, Texture, Tri};
use crate::arena::Arena;
use crate::config::{CameraConfig, ScratchConfig};
use crate::error::PipelineError;

/// Perspective camera
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec4,
    /// Euler angles (pitch, yaw, roll) in radians
    pub rotation: Vec4,
    fov_degrees: f32,
    near: f32,
    far: f32,
    width: usize,
    height: usize,
    projection: Mat4,
}

impl Camera {
    pub fn new(width: usize, height: usize) -> Self {
        Self::from_config(&CameraConfig { width, height, ..Default::default() })
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut cam = Self {
            position: Vec4::point(0.0, 0.0, 0.0),
            rotation: Vec4::ZERO,
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
            width: config.width,
            height: config.height,
            projection: Mat4::IDENTITY,
        };
        cam.update_projection();
        cam
    }

    fn update_projection(&mut self) {
        let aspect = if self.width > 0 { self.height as f32 / self.width as f32 } else { 0.0 };
        self.projection = Mat4::projection(self.near, self.far, self.fov_degrees, aspect);
    }

    /// New viewport size; recomputes aspect and projection
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.update_projection();
    }

    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.fov_degrees = fov_degrees;
        self.update_projection();
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Unit view direction after applying `rotation` to +Z
    pub fn forward(&self) -> Vec4 {
        Mat4::rotation(self.rotation.x, self.rotation.y, self.rotation.z)
            .transform(Vec4::FORWARD)
            .normalize()
    }

    /// World to view space. Identity for a camera at the origin with no rotation.
    pub fn view_matrix(&self) -> Mat4 {
        let target = self.position + self.forward();
        Mat4::point_at(self.position, target, Vec4::UP).quick_inverse()
    }

    /// Project a view-space triangle to screen space.
    ///
    /// Texture `w` becomes the vertex `1/w`; with `perspective` set, `u`/`v`
    /// are divided by `w` as well so the rasterizer can undo it per pixel.
    pub fn project_triangle(&self, tri: &Tri, perspective: bool) -> Tri {
        let mut out = *tri;
        for i in 0..3 {
            let clip = self.projection.transform(tri.pos[i]);
            let inv_w = 1.0 / clip.w;
            let src = tri.uv[i];
            out.uv[i] = if perspective {
                TexCoord::new(src.u * inv_w, src.v * inv_w, inv_w)
            } else {
                TexCoord::new(src.u, src.v, inv_w)
            };
            out.pos[i] = ndc_to_screen(clip.div_scalar(clip.w), self.width, self.height);
        }
        out
    }
}

/// Position, Euler rotation and scale of a mesh instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec4,
    pub rotation: Vec4,
    pub scale: Vec4,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec4::ZERO,
            rotation: Vec4::ZERO,
            scale: Vec4::dir(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn new(position: Vec4, rotation: Vec4, scale: Vec4) -> Self {
        Self { position, rotation, scale }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self { position: Vec4::dir(x, y, z), ..Default::default() }
    }

    pub fn with_rotation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Vec4::dir(x, y, z);
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.scale = Vec4::dir(x, y, z);
        self
    }

    /// Scale, then rotate, then translate
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_transform(self.position, self.rotation, self.scale)
    }
}

/// Object-space triangle list plus the size of its per-frame tri cache
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    tris: Vec<Tri>,
    cache_capacity: usize,
}

impl Mesh {
    /// Cache defaults to twice the triangle count, enough for every near clip to split.
    pub fn new(name: impl Into<String>, tris: Vec<Tri>) -> Self {
        let cache_capacity = tris.len() * 2;
        Self { name: name.into(), tris, cache_capacity }
    }

    pub fn single(tri: Tri) -> Self {
        Self::new("single", vec![tri])
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Result<Self, PipelineError> {
        if capacity < self.tris.len() {
            return Err(PipelineError::InvalidCacheCapacity {
                capacity,
                tri_count: self.tris.len(),
            });
        }
        self.cache_capacity = capacity;
        Ok(self)
    }

    pub fn tris(&self) -> &[Tri] {
        &self.tris
    }

    pub fn tri_count(&self) -> usize {
        self.tris.len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// Cube spanning -1..1 on every axis, outward-facing, one full texture per face
    pub fn cube() -> Self {
        // corners of each face as unit-cube coordinates; two triangles per face
        const FACES: [[[f32; 3]; 6]; 6] = [
            // south (-z)
            [[0., 0., 0.], [0., 1., 0.], [1., 1., 0.], [0., 0., 0.], [1., 1., 0.], [1., 0., 0.]],
            // east (+x)
            [[1., 0., 0.], [1., 1., 0.], [1., 1., 1.], [1., 0., 0.], [1., 1., 1.], [1., 0., 1.]],
            // north (+z)
            [[1., 0., 1.], [1., 1., 1.], [0., 1., 1.], [1., 0., 1.], [0., 1., 1.], [0., 0., 1.]],
            // west (-x)
            [[0., 0., 1.], [0., 1., 1.], [0., 1., 0.], [0., 0., 1.], [0., 1., 0.], [0., 0., 0.]],
            // top (+y)
            [[0., 1., 0.], [0., 1., 1.], [1., 1., 1.], [0., 1., 0.], [1., 1., 1.], [1., 1., 0.]],
            // bottom (-y)
            [[1., 0., 1.], [0., 0., 1.], [0., 0., 0.], [1., 0., 1.], [0., 0., 0.], [1., 0., 0.]],
        ];
        const UVS: [(f32, f32); 6] = [(0., 1.), (0., 0.), (1., 0.), (0., 1.), (1., 0.), (1., 1.)];

        let corner = |c: [f32; 3]| Vec4::point(c[0] * 2.0 - 1.0, c[1] * 2.0 - 1.0, c[2] * 2.0 - 1.0);
        let uv = |i: usize| TexCoord::new(UVS[i].0, UVS[i].1, 1.0);

        let mut tris = Vec::with_capacity(12);
        for face in &FACES {
            for half in 0..2 {
                let o = half * 3;
                tris.push(
                    Tri::new(corner(face[o]), corner(face[o + 1]), corner(face[o + 2]))
                        .with_uvs(uv(o), uv(o + 1), uv(o + 2)),
                );
            }
        }
        Self::new("cube", tris)
    }
}

/// Counters for the current frame, reset by [`Renderer::begin_frame`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub triangles_in: usize,
    pub culled: usize,
    pub near_clipped_away: usize,
    pub rasterized: usize,
}

/// Unit normal of the plane through `pos`, wound v0 -> v1 -> v2
fn face_normal(pos: &[Vec4; 3]) -> Vec4 {
    (pos[1] - pos[0]).cross(pos[2] - pos[0]).normalize()
}

/// Rendering context: camera, settings and per-frame scratch storage
pub struct Renderer {
    pub camera: Camera,
    pub settings: RasterSettings,
    scratch: Arena<Tri>,
    clip_queue_capacity: usize,
    stats: FrameStats,
}

impl Renderer {
    pub fn new(camera: Camera, settings: RasterSettings, scratch: &ScratchConfig) -> Self {
        Self {
            camera,
            settings,
            scratch: Arena::new("frame scratch", scratch.arena_tris),
            clip_queue_capacity: scratch.clip_queue_tris,
            stats: FrameStats::default(),
        }
    }

    /// Clear the framebuffer, drop last frame's scratch data and zero the stats.
    pub fn begin_frame(&mut self, fb: &mut Framebuffer) {
        fb.clear(self.settings.clear_color);
        self.scratch.reset();
        self.stats = FrameStats::default();
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.settings.mode = mode;
    }

    /// Whether projected UVs carry the `1/w` divide for this frame's settings
    pub fn perspective_active(&self) -> bool {
        let s = &self.settings;
        s.mode == RenderMode::Textured && s.sub_pixel && s.perspective_correct
    }

    /// Draw one mesh instance. Returns the number of triangles rasterized.
    ///
    /// On error nothing further is drawn for this mesh.
    pub fn draw_mesh(
        &mut self,
        fb: &mut Framebuffer,
        mesh: &Mesh,
        transform: &Transform,
        texture: Option<&Texture>,
    ) -> Result<usize, PipelineError> {
        let mode = self.settings.mode;
        let texture = match (mode, texture) {
            (RenderMode::Textured, None) => {
                warn!("Mesh '{}' skipped: textured mode without a texture", mesh.name);
                return Err(PipelineError::MissingTexture);
            }
            (_, t) => t,
        };
        if mesh.cache_capacity < mesh.tri_count() {
            let err = PipelineError::InvalidCacheCapacity {
                capacity: mesh.cache_capacity,
                tri_count: mesh.tri_count(),
            };
            error!("Mesh '{}': {}", mesh.name, err);
            return Err(err);
        }

        let perspective = self.perspective_active();
        let cache_span = self.scratch.alloc(mesh.cache_capacity)?;
        let queue_span = self.scratch.alloc(self.clip_queue_capacity)?;
        let (cache, queue_slots) = self.scratch.get_pair_mut(&cache_span, &queue_span)?;

        let world = transform.world_matrix();
        let view = self.camera.view_matrix();
        let sun = self.settings.sun_direction.normalize();
        let near = ClipPlane::near();

        // world transform, light, view transform, cull, near clip, project into the cache
        let mut cached = 0;
        for src in &mesh.tris {
            self.stats.triangles_in += 1;

            let world_pos = src.pos.map(|p| world.transform(Vec4 { w: 1.0, ..p }));
            let world_normal = face_normal(&world_pos);

            let mut tri = *src;
            tri.pos = world_pos.map(|p| view.transform(Vec4 { w: 1.0, ..p }));

            // camera sits at the view-space origin
            let cam_ray = tri.pos[0] - Vec4::ZERO;
            if face_normal(&tri.pos).dot(cam_ray) >= 0.0 {
                self.stats.culled += 1;
                continue;
            }

            tri.normal = [world_normal; 3];
            tri.set_shade(sun.dot(world_normal).max(0.1));

            let clipped = near.clip(&tri);
            if clipped.is_empty() {
                self.stats.near_clipped_away += 1;
            }
            for t in clipped.as_slice() {
                if cached >= cache.len() {
                    let err = PipelineError::TriCacheOverflow {
                        mesh: mesh.name.clone(),
                        capacity: cache.len(),
                    };
                    error!("{}", err);
                    return Err(err);
                }
                cache[cached] = self.camera.project_triangle(t, perspective);
                cached += 1;
            }
        }

        let edges = ClipPlane::screen_edges(fb.width, fb.height);
        let mut queue = TriQueue::new(queue_slots);
        let mut drawn = 0;
        for tri in &cache[..cached] {
            if let Err(err) = queue.clip_through(*tri, &edges) {
                error!("Mesh '{}': {}", mesh.name, err);
                self.stats.rasterized += drawn;
                return Err(err);
            }
            while let Some(t) = queue.pop() {
                let verts = RasterVertex::from_tri(&t);
                let shade = t.shade();
                match (mode, texture) {
                    (RenderMode::Textured, Some(tex)) => {
                        if self.settings.sub_pixel {
                            draw_triangle_textured(fb, tex, verts, shade, perspective);
                        } else {
                            draw_triangle_textured_int(fb, tex, verts, shade);
                        }
                    }
                    (RenderMode::Lines, _) => {
                        let c = self.settings.line_color;
                        let [a, b, d] = verts.map(|v| (v.x as i32, v.y as i32));
                        fb.draw_line(a.0, a.1, b.0, b.1, c);
                        fb.draw_line(b.0, b.1, d.0, d.1, c);
                        fb.draw_line(d.0, d.1, a.0, a.1, c);
                    }
                    _ => {
                        draw_triangle_solid(fb, verts, self.settings.solid_color, shade);
                    }
                }
                drawn += 1;
            }
        }
        self.stats.rasterized += drawn;

        trace!(
            "Mesh '{}': {} in, {} cached, {} rasterized",
            mesh.name,
            mesh.tri_count(),
            cached,
            drawn
        );
        Ok(drawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::types::Color;

    fn scratch() -> ScratchConfig {
        ScratchConfig::default()
    }

    fn solid_renderer(width: usize, height: usize) -> Renderer {
        let settings = RasterSettings { mode: RenderMode::Solid, ..Default::default() };
        Renderer::new(Camera::new(width, height), settings, &scratch())
    }

    #[test]
    fn test_world_matrix_scales_before_translating() {
        let t = Transform::at(10.0, 0.0, 0.0).with_scale(2.0, 1.0, 1.0);
        let p = t.world_matrix().transform(Vec4::point(1.0, 0.0, 0.0));
        assert!((p.x - 12.0).abs() < 1e-5);
        assert!(p.y.abs() < 1e-5 && p.z.abs() < 1e-5);
    }

    #[test]
    fn test_default_camera_view_is_identity() {
        let view = Camera::new(64, 48).view_matrix();
        for r in 0..4 {
            for c in 0..4 {
                assert!((view.m[r][c] - Mat4::IDENTITY.m[r][c]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_back_face_is_culled() {
        let mut fb = Framebuffer::new(64, 64);
        let mut r = solid_renderer(64, 64);
        r.begin_frame(&mut fb);
        let before = fb.pixels.clone();

        // normal (0,0,1): facing away from a camera at the origin
        let tri = Tri::new(
            Vec4::point(0.0, 0.0, 5.0),
            Vec4::point(1.0, 0.0, 5.0),
            Vec4::point(0.0, 1.0, 5.0),
        );
        let drawn = r.draw_mesh(&mut fb, &Mesh::single(tri), &Transform::default(), None).unwrap();

        assert_eq!(drawn, 0);
        assert_eq!(r.stats().culled, 1);
        assert_eq!(r.stats().rasterized, 0);
        assert_eq!(fb.pixels, before);
    }

    #[test]
    fn test_front_face_is_drawn_and_lit() {
        let mut fb = Framebuffer::new(64, 64);
        let mut r = solid_renderer(64, 64);
        r.begin_frame(&mut fb);

        let tri = Tri::new(
            Vec4::point(0.0, 0.0, 5.0),
            Vec4::point(0.0, 1.0, 5.0),
            Vec4::point(1.0, 0.0, 5.0),
        );
        let drawn = r.draw_mesh(&mut fb, &Mesh::single(tri), &Transform::default(), None).unwrap();
        assert_eq!(drawn, 1);
        assert_eq!(r.stats().culled, 0);
        assert!(fb.depth.iter().any(|d| *d > 0.0));
    }

    #[test]
    fn test_sun_stays_fixed_when_camera_turns() {
        let mut fb = Framebuffer::new(64, 64);
        let mut r = solid_renderer(64, 64);
        r.camera.rotation = Vec4::dir(0.0, std::f32::consts::PI, 0.0);
        r.begin_frame(&mut fb);

        // in front of the turned camera; world normal points along +Z, away from the sun
        let tri = Tri::new(
            Vec4::point(-2.0, -2.0, 5.0),
            Vec4::point(-2.0, 3.0, 5.0),
            Vec4::point(3.0, -2.0, 5.0),
        );
        let t = Transform::default().with_rotation(0.0, std::f32::consts::PI, 0.0);
        let drawn = r.draw_mesh(&mut fb, &Mesh::single(tri), &t, None).unwrap();

        assert_eq!(drawn, 1);
        assert_eq!(fb.get_pixel(32, 32), Some(Color::WHITE.shade(0.1)));
    }

    #[test]
    fn test_full_screen_fill_leaves_last_column_and_first_row() {
        let mut fb = Framebuffer::new(32, 32);
        let mut r = solid_renderer(32, 32);
        r.begin_frame(&mut fb);
        let tri = Tri::new(
            Vec4::point(-100.0, -100.0, 5.0),
            Vec4::point(-100.0, 300.0, 5.0),
            Vec4::point(300.0, -100.0, 5.0),
        );
        r.draw_mesh(&mut fb, &Mesh::single(tri), &Transform::default(), None).unwrap();

        for i in 0..32 {
            assert_eq!(fb.depth_at(31, i), Some(0.0), "column 31, row {}", i);
            assert_eq!(fb.depth_at(i, 0), Some(0.0), "row 0, column {}", i);
        }
        assert!(fb.depth_at(29, 16).is_some_and(|d| d > 0.0));
        assert!(fb.depth_at(16, 2).is_some_and(|d| d > 0.0));
        assert!(fb.depth_at(0, 16).is_some_and(|d| d > 0.0));
    }

    #[test]
    fn test_perspective_needs_textured_sub_pixel() {
        let mut r = solid_renderer(8, 8);
        assert!(!r.perspective_active());
        r.set_mode(RenderMode::Textured);
        assert!(r.perspective_active());
        r.settings.sub_pixel = false;
        assert!(!r.perspective_active());
    }

    #[test]
    fn test_behind_camera_is_clipped_away() {
        let mut fb = Framebuffer::new(32, 32);
        let mut r = solid_renderer(32, 32);
        r.begin_frame(&mut fb);
        let tri = Tri::new(
            Vec4::point(0.0, 0.0, -5.0),
            Vec4::point(0.0, 1.0, -5.0),
            Vec4::point(1.0, 0.0, -5.0),
        );
        r.draw_mesh(&mut fb, &Mesh::single(tri), &Transform::default(), None).unwrap();
        assert_eq!(r.stats().near_clipped_away + r.stats().culled, 1);
        assert_eq!(r.stats().rasterized, 0);
    }

    #[test]
    fn test_textured_mode_requires_texture() {
        let mut fb = Framebuffer::new(16, 16);
        let mut r = Renderer::new(Camera::new(16, 16), RasterSettings::default(), &scratch());
        let err = r.draw_mesh(&mut fb, &Mesh::cube(), &Transform::at(0.0, 0.0, 5.0), None);
        assert_eq!(err, Err(PipelineError::MissingTexture));
    }

    #[test]
    fn test_cache_capacity_must_cover_mesh() {
        let err = Mesh::cube().with_cache_capacity(4).unwrap_err();
        assert_eq!(err, PipelineError::InvalidCacheCapacity { capacity: 4, tri_count: 12 });
    }

    #[test]
    fn test_cube_shows_at_most_three_faces() {
        let mut fb = Framebuffer::new(64, 64);
        let mut r = solid_renderer(64, 64);
        r.begin_frame(&mut fb);
        let t = Transform::at(0.0, 0.0, 8.0).with_rotation(0.4, 0.6, 0.0);
        let drawn = r.draw_mesh(&mut fb, &Mesh::cube(), &t, None).unwrap();
        let stats = r.stats();
        assert_eq!(stats.triangles_in, 12);
        assert!(stats.culled >= 6);
        assert!(drawn > 0 && drawn <= 6);
    }

    #[test]
    fn test_wireframe_uses_line_color() {
        let mut fb = Framebuffer::new(64, 64);
        let settings = RasterSettings {
            mode: RenderMode::Lines,
            line_color: Color::GREEN,
            ..Default::default()
        };
        let mut r = Renderer::new(Camera::new(64, 64), settings, &scratch());
        r.begin_frame(&mut fb);
        r.draw_mesh(&mut fb, &Mesh::cube(), &Transform::at(0.0, 0.0, 6.0), None).unwrap();
        let greens = fb.pixels.chunks_exact(4).filter(|p| *p == [0, 255, 0, 255]).count();
        assert!(greens > 0);
        // wireframe never touches the depth buffer
        assert!(fb.depth.iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_small_clip_queue_overflows() {
        let mut fb = Framebuffer::new(32, 32);
        let cfg = ScratchConfig { clip_queue_tris: 1, ..Default::default() };
        let settings = RasterSettings { mode: RenderMode::Solid, ..Default::default() };
        let mut r = Renderer::new(Camera::new(32, 32), settings, &cfg);
        r.begin_frame(&mut fb);
        // large triangle crossing every screen edge
        let tri = Tri::new(
            Vec4::point(-50.0, -50.0, 5.0),
            Vec4::point(-50.0, 50.0, 5.0),
            Vec4::point(50.0, 0.0, 5.0),
        );
        let res = r.draw_mesh(&mut fb, &Mesh::single(tri), &Transform::default(), None);
        assert_eq!(res, Err(PipelineError::ClipQueueOverflow { capacity: 1 }));
    }
}
