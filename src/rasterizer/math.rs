//! Vector and matrix math for the software rasterizer

use std::ops::{Add, Mul, Neg, Sub};
use serde::{Serialize, Deserialize};

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn normalize(self) -> Vec3 {
        let l = self.len();
        if l == 0.0 {
            return Vec3::ZERO;
        }
        Vec3 {
            x: self.x / l,
            y: self.y / l,
            z: self.z / l,
        }
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    /// Mirror `self` (pointing toward the surface) about `normal`
    pub fn reflect(self, normal: Vec3) -> Vec3 {
        self - normal.scale(2.0 * self.dot(normal))
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        self.scale(s)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        self.scale(-1.0)
    }
}

/// 2D Vector (for texture coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Transform a vector by camera basis vectors (rotation)
pub fn perspective_transform(v: Vec3, cam_x: Vec3, cam_y: Vec3, cam_z: Vec3) -> Vec3 {
    Vec3 {
        x: v.dot(cam_x),
        y: v.dot(cam_y),
        z: v.dot(cam_z),
    }
}

// =============================================================================
// 4x4 Matrix operations (row-major, m[row][col])
// =============================================================================

pub type Mat4 = [[f32; 4]; 4];

pub fn mat4_identity() -> Mat4 {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

pub fn mat4_translation(t: Vec3) -> Mat4 {
    [
        [1.0, 0.0, 0.0, t.x],
        [0.0, 1.0, 0.0, t.y],
        [0.0, 0.0, 1.0, t.z],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

pub fn mat4_uniform_scale(s: f32) -> Mat4 {
    [
        [s, 0.0, 0.0, 0.0],
        [0.0, s, 0.0, 0.0],
        [0.0, 0.0, s, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Rotation from euler angles in radians, applied in XYZ order
/// (matrix = Rx * Ry * Rz).
pub fn mat4_rotation_xyz(x: f32, y: f32, z: f32) -> Mat4 {
    let (sx, cx) = x.sin_cos();
    let (sy, cy) = y.sin_cos();
    let (sz, cz) = z.sin_cos();

    [
        [cy * cz, -cy * sz, sy, 0.0],
        [cx * sz + sx * sy * cz, cx * cz - sx * sy * sz, -sx * cy, 0.0],
        [sx * sz - cx * sy * cz, sx * cz + cx * sy * sz, cx * cy, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

pub fn mat4_mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut result = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                result[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    result
}

/// Translation * Rotation (radians, XYZ) * Scale
pub fn mat4_from_position_rotation_scale(position: Vec3, rotation: Vec3, scale: f32) -> Mat4 {
    let rot_mat = mat4_rotation_xyz(rotation.x, rotation.y, rotation.z);
    let trans_mat = mat4_translation(position);
    mat4_mul(&mat4_mul(&trans_mat, &rot_mat), &mat4_uniform_scale(scale))
}

/// Convert a column-major matrix (glTF layout) to row-major
pub fn mat4_from_cols(cols: [[f32; 4]; 4]) -> Mat4 {
    let mut m = [[0.0; 4]; 4];
    for (c, col) in cols.iter().enumerate() {
        for (r, value) in col.iter().enumerate() {
            m[r][c] = *value;
        }
    }
    m
}

pub fn mat4_transform_point(m: &Mat4, p: Vec3) -> Vec3 {
    Vec3::new(
        m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3],
        m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3],
        m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3],
    )
}

/// Transform a direction (ignores translation)
pub fn mat4_transform_vector(m: &Mat4, v: Vec3) -> Vec3 {
    Vec3::new(
        m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
        m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
        m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
    )
}

/// Inverse-transpose of the upper 3x3, for transforming normals.
/// Falls back to the plain 3x3 when the matrix is singular.
pub fn mat4_normal_matrix(m: &Mat4) -> Mat4 {
    let a = m[0][0]; let b = m[0][1]; let c = m[0][2];
    let d = m[1][0]; let e = m[1][1]; let f = m[1][2];
    let g = m[2][0]; let h = m[2][1]; let i = m[2][2];

    let co00 = e * i - f * h;
    let co01 = -(d * i - f * g);
    let co02 = d * h - e * g;
    let det = a * co00 + b * co01 + c * co02;
    if det.abs() < 1e-12 {
        let mut plain = *m;
        plain[0][3] = 0.0;
        plain[1][3] = 0.0;
        plain[2][3] = 0.0;
        return plain;
    }

    let co10 = -(b * i - c * h);
    let co11 = a * i - c * g;
    let co12 = -(a * h - b * g);
    let co20 = b * f - c * e;
    let co21 = -(a * f - c * d);
    let co22 = a * e - b * d;

    // inverse = adj / det, adj = cofactor^T; inverse^T = cofactor / det
    let inv_det = 1.0 / det;
    [
        [co00 * inv_det, co01 * inv_det, co02 * inv_det, 0.0],
        [co10 * inv_det, co11 * inv_det, co12 * inv_det, 0.0],
        [co20 * inv_det, co21 * inv_det, co22 * inv_det, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}
