//! Vector and matrix math for the triangle pipeline
//!
//! Row-vector convention throughout: a point is transformed as `v' = v * M`,
//! so translation lives in row 3 and matrices compose left to right.

use std::ops::{Add, Div, Mul, Neg, Sub};
use serde::{Serialize, Deserialize};

/// Homogeneous 4D vector
///
/// Arithmetic (`+`, `-`, scaling) acts on x/y/z and carries `w` from the
/// left operand; `dot`, `cross`, `len` and `normalize` are 3D operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub w: f32,
}

impl Vec4 {
    pub const ZERO: Vec4 = Vec4 { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };
    pub const UP: Vec4 = Vec4 { x: 0.0, y: 1.0, z: 0.0, w: 0.0 };
    pub const FORWARD: Vec4 = Vec4 { x: 0.0, y: 0.0, z: 1.0, w: 0.0 };

    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// A position (w = 1)
    pub fn point(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w: 1.0 }
    }

    /// A direction (w = 0)
    pub fn dir(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w: 0.0 }
    }

    pub fn dot(self, other: Vec4) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec4) -> Vec4 {
        Vec4 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
            w: 0.0,
        }
    }

    pub fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit-length copy; a zero-length vector normalizes to zero.
    pub fn normalize(self) -> Vec4 {
        let l = self.len();
        if l == 0.0 {
            return Vec4 { w: self.w, ..Vec4::ZERO };
        }
        Vec4 {
            x: self.x / l,
            y: self.y / l,
            z: self.z / l,
            w: self.w,
        }
    }

    pub fn scale(self, s: f32) -> Vec4 {
        Vec4 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
            w: self.w,
        }
    }

    /// Divide x/y/z by a scalar; dividing by zero yields the zero vector.
    pub fn div_scalar(self, s: f32) -> Vec4 {
        if s == 0.0 {
            return Vec4 { w: self.w, ..Vec4::ZERO };
        }
        Vec4 {
            x: self.x / s,
            y: self.y / s,
            z: self.z / s,
            w: self.w,
        }
    }

    /// Componentwise product of x/y/z
    pub fn mul_elem(self, other: Vec4) -> Vec4 {
        Vec4 {
            x: self.x * other.x,
            y: self.y * other.y,
            z: self.z * other.z,
            w: self.w,
        }
    }

    /// Componentwise quotient of x/y/z; zero divisors give zero in that lane.
    pub fn div_elem(self, other: Vec4) -> Vec4 {
        let d = |a: f32, b: f32| if b == 0.0 { 0.0 } else { a / b };
        Vec4 {
            x: d(self.x, other.x),
            y: d(self.y, other.y),
            z: d(self.z, other.z),
            w: self.w,
        }
    }

    /// Linear interpolation of all four components
    pub fn lerp(self, end: Vec4, t: f32) -> Vec4 {
        Vec4 {
            x: lerp(self.x, end.x, t),
            y: lerp(self.y, end.y, t),
            z: lerp(self.z, end.z, t),
            w: lerp(self.w, end.w, t),
        }
    }

    /// Alpha-blend `self` over `bg`, using `self.w` as coverage
    pub fn alpha_blend(self, bg: Vec4) -> Vec4 {
        let a = self.w;
        Vec4 {
            x: a * self.x + (1.0 - a) * bg.x,
            y: a * self.y + (1.0 - a) * bg.y,
            z: a * self.z + (1.0 - a) * bg.z,
            w: 1.0,
        }
    }
}

impl Add for Vec4 {
    type Output = Vec4;
    fn add(self, other: Vec4) -> Vec4 {
        Vec4 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            w: self.w,
        }
    }
}

impl Sub for Vec4 {
    type Output = Vec4;
    fn sub(self, other: Vec4) -> Vec4 {
        Vec4 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
            w: self.w,
        }
    }
}

impl Mul<f32> for Vec4 {
    type Output = Vec4;
    fn mul(self, s: f32) -> Vec4 {
        self.scale(s)
    }
}

impl Div<f32> for Vec4 {
    type Output = Vec4;
    fn div(self, s: f32) -> Vec4 {
        self.div_scalar(s)
    }
}

impl Neg for Vec4 {
    type Output = Vec4;
    fn neg(self) -> Vec4 {
        Vec4 {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }
}

pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    (1.0 - t) * start + t * end
}

/// 4x4 matrix, `m[row][col]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub m: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const ZERO: Mat4 = Mat4 { m: [[0.0; 4]; 4] };
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// `v * self`
    pub fn transform(&self, v: Vec4) -> Vec4 {
        let m = &self.m;
        Vec4 {
            x: v.x * m[0][0] + v.y * m[1][0] + v.z * m[2][0] + v.w * m[3][0],
            y: v.x * m[0][1] + v.y * m[1][1] + v.z * m[2][1] + v.w * m[3][1],
            z: v.x * m[0][2] + v.y * m[1][2] + v.z * m[2][2] + v.w * m[3][2],
            w: v.x * m[0][3] + v.y * m[1][3] + v.z * m[2][3] + v.w * m[3][3],
        }
    }

    /// `self * other`: applies `self` first, then `other`
    pub fn multiply(&self, other: &Mat4) -> Mat4 {
        let mut res = Mat4::ZERO;
        for r in 0..4 {
            for c in 0..4 {
                res.m[r][c] = self.m[r][0] * other.m[0][c]
                    + self.m[r][1] * other.m[1][c]
                    + self.m[r][2] * other.m[2][c]
                    + self.m[r][3] * other.m[3][c];
            }
        }
        res
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        m.m[3][0] = x;
        m.m[3][1] = y;
        m.m[3][2] = z;
        m
    }

    pub fn scaling(x: f32, y: f32, z: f32) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        m.m[0][0] = x;
        m.m[1][1] = y;
        m.m[2][2] = z;
        m
    }

    pub fn rotation_x(angle: f32) -> Mat4 {
        let (s, c) = angle.sin_cos();
        let mut m = Mat4::ZERO;
        m.m[0][0] = 1.0;
        m.m[1][1] = c;
        m.m[1][2] = s;
        m.m[2][1] = -s;
        m.m[2][2] = c;
        m.m[3][3] = 1.0;
        m
    }

    pub fn rotation_y(angle: f32) -> Mat4 {
        let (s, c) = angle.sin_cos();
        let mut m = Mat4::ZERO;
        m.m[0][0] = c;
        m.m[0][2] = -s;
        m.m[1][1] = 1.0;
        m.m[2][0] = s;
        m.m[2][2] = c;
        m.m[3][3] = 1.0;
        m
    }

    pub fn rotation_z(angle: f32) -> Mat4 {
        let (s, c) = angle.sin_cos();
        let mut m = Mat4::ZERO;
        m.m[0][0] = c;
        m.m[0][1] = -s;
        m.m[1][0] = s;
        m.m[1][1] = c;
        m.m[2][2] = 1.0;
        m.m[3][3] = 1.0;
        m
    }

    /// Euler rotation, X then Y then Z
    pub fn rotation(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::rotation_x(x)
            .multiply(&Mat4::rotation_y(y))
            .multiply(&Mat4::rotation_z(z))
    }

    /// Perspective projection.
    ///
    /// Zero arguments fall back to near 0.1, far 1000, fov 45 degrees, aspect 1.
    /// `w` of the result equals view-space depth; z maps near to 0 and far to 1.
    pub fn projection(near: f32, far: f32, fov_degrees: f32, aspect: f32) -> Mat4 {
        let near = if near != 0.0 { near } else { 0.1 };
        let far = if far != 0.0 { far } else { 1000.0 };
        let fov = if fov_degrees != 0.0 { fov_degrees } else { 45.0 };
        let aspect = if aspect != 0.0 { aspect } else { 1.0 };

        let fov_rad = 1.0 / (fov * 0.5).to_radians().tan();
        let mut m = Mat4::IDENTITY;
        m.m[0][0] = aspect * fov_rad;
        m.m[1][1] = fov_rad;
        m.m[2][2] = far / (far - near);
        m.m[3][2] = (-far * near) / (far - near);
        m.m[2][3] = 1.0;
        m.m[3][3] = 0.0;
        m
    }

    /// Camera orientation placed at `pos` looking at `target`
    pub fn point_at(pos: Vec4, target: Vec4, up: Vec4) -> Mat4 {
        let forward = (target - pos).normalize();
        let a = forward.scale(up.dot(forward));
        let new_up = (up - a).normalize();
        let right = new_up.cross(forward);

        Mat4 {
            m: [
                [right.x, right.y, right.z, 0.0],
                [new_up.x, new_up.y, new_up.z, 0.0],
                [forward.x, forward.y, forward.z, 0.0],
                [pos.x, pos.y, pos.z, 1.0],
            ],
        }
    }

    /// Inverse of a rotation + translation matrix. Not a general inverse.
    pub fn quick_inverse(&self) -> Mat4 {
        let m = &self.m;
        let mut r = Mat4::ZERO;
        for row in 0..3 {
            for col in 0..3 {
                r.m[row][col] = m[col][row];
            }
        }
        for col in 0..3 {
            r.m[3][col] = -(m[3][0] * r.m[0][col] + m[3][1] * r.m[1][col] + m[3][2] * r.m[2][col]);
        }
        r.m[3][3] = 1.0;
        r
    }

    /// Scale, then rotate, then translate
    pub fn from_transform(position: Vec4, rotation: Vec4, scale: Vec4) -> Mat4 {
        Mat4::scaling(scale.x, scale.y, scale.z)
            .multiply(&Mat4::rotation(rotation.x, rotation.y, rotation.z))
            .multiply(&Mat4::translation(position.x, position.y, position.z))
    }

    pub fn translate(&self, x: f32, y: f32, z: f32) -> Mat4 {
        self.multiply(&Mat4::translation(x, y, z))
    }

    pub fn rotate(&self, x: f32, y: f32, z: f32) -> Mat4 {
        self.multiply(&Mat4::rotation(x, y, z))
    }

    pub fn scale(&self, x: f32, y: f32, z: f32) -> Mat4 {
        self.multiply(&Mat4::scaling(x, y, z))
    }
}

/// Map a perspective-divided point from NDC to pixel coordinates.
///
/// Both axes are flipped before rescaling: `screen = (1 - ndc) * 0.5 * dim`.
pub fn ndc_to_screen(v: Vec4, width: usize, height: usize) -> Vec4 {
    Vec4 {
        x: (1.0 - v.x) * 0.5 * width as f32,
        y: (1.0 - v.y) * 0.5 * height as f32,
        z: v.z,
        w: v.w,
    }
}
