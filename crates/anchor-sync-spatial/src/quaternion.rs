//! Quaternion representation for anchor orientations

use super::{Matrix3, Vector3D};
use std::ops::Mul;

/// Below this the branch divisor is treated as zero and the identity is returned.
const DIVISOR_EPSILON: f32 = 1e-6;

/// A quaternion for representing 3D rotations
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    /// Identity quaternion (no rotation)
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Create a quaternion from axis-angle representation
    pub fn from_axis_angle(axis: Vector3D, angle_radians: f32) -> Self {
        let half_angle = angle_radians / 2.0;
        let sin_half = half_angle.sin();
        let normalized = axis.normalize();

        Self {
            x: normalized.x * sin_half,
            y: normalized.y * sin_half,
            z: normalized.z * sin_half,
            w: half_angle.cos(),
        }
    }

    /// Convert a rotation matrix into a unit quaternion.
    ///
    /// Branches on the largest of the trace and the three diagonal entries
    /// so the square root argument never drops below one for a proper
    /// rotation. Near-identity and half-turn rotations stay well conditioned.
    pub fn from_rotation_matrix(m: &Matrix3) -> Self {
        let (m00, m11, m22) = (m.get(0, 0), m.get(1, 1), m.get(2, 2));
        let trace = m00 + m11 + m22;

        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            if s < DIVISOR_EPSILON {
                return Self::IDENTITY;
            }
            Self::new(
                (m.get(2, 1) - m.get(1, 2)) / s,
                (m.get(0, 2) - m.get(2, 0)) / s,
                (m.get(1, 0) - m.get(0, 1)) / s,
                0.25 * s,
            )
        } else if m00 > m11 && m00 > m22 {
            let s = (1.0 + m00 - m11 - m22).max(0.0).sqrt() * 2.0;
            if s < DIVISOR_EPSILON {
                return Self::IDENTITY;
            }
            Self::new(
                0.25 * s,
                (m.get(0, 1) + m.get(1, 0)) / s,
                (m.get(0, 2) + m.get(2, 0)) / s,
                (m.get(2, 1) - m.get(1, 2)) / s,
            )
        } else if m11 > m22 {
            let s = (1.0 + m11 - m00 - m22).max(0.0).sqrt() * 2.0;
            if s < DIVISOR_EPSILON {
                return Self::IDENTITY;
            }
            Self::new(
                (m.get(0, 1) + m.get(1, 0)) / s,
                0.25 * s,
                (m.get(1, 2) + m.get(2, 1)) / s,
                (m.get(0, 2) - m.get(2, 0)) / s,
            )
        } else {
            let s = (1.0 + m22 - m00 - m11).max(0.0).sqrt() * 2.0;
            if s < DIVISOR_EPSILON {
                return Self::IDENTITY;
            }
            Self::new(
                (m.get(0, 2) + m.get(2, 0)) / s,
                (m.get(1, 2) + m.get(2, 1)) / s,
                0.25 * s,
                (m.get(1, 0) - m.get(0, 1)) / s,
            )
        };

        q.normalize().canonical()
    }

    /// Rotation matrix equivalent of this (unit) quaternion
    pub fn to_rotation_matrix(&self) -> Matrix3 {
        let Self { x, y, z, w } = *self;
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);

        Matrix3::from_rows([
            [1.0 - 2.0 * (yy + zz), 2.0 * (xy - wz), 2.0 * (xz + wy)],
            [2.0 * (xy + wz), 1.0 - 2.0 * (xx + zz), 2.0 * (yz - wx)],
            [2.0 * (xz - wy), 2.0 * (yz + wx), 1.0 - 2.0 * (xx + yy)],
        ])
    }

    pub fn magnitude(&self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn dot(&self, other: &Quaternion) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Normalize the quaternion; a zero quaternion becomes the identity
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag > 0.0 {
            Self::new(self.x / mag, self.y / mag, self.z / mag, self.w / mag)
        } else {
            Self::IDENTITY
        }
    }

    /// Pick the representative with a non-negative `w` (q and -q are the same rotation)
    pub fn canonical(&self) -> Self {
        if self.w < 0.0 {
            Self::new(-self.x, -self.y, -self.z, -self.w)
        } else {
            *self
        }
    }

    pub fn conjugate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotate a vector by this quaternion
    pub fn rotate_vector(&self, v: Vector3D) -> Vector3D {
        let q_vec = Vector3D::new(self.x, self.y, self.z);
        let uv = q_vec.cross(&v);
        let uuv = q_vec.cross(&uv);
        v + (uv * self.w + uuv) * 2.0
    }

    /// Angle in radians between two orientations
    pub fn angle_to(&self, other: &Quaternion) -> f32 {
        let diff = self.normalize().conjugate() * other.normalize();
        let vector = Vector3D::new(diff.x, diff.y, diff.z).magnitude();
        2.0 * vector.atan2(diff.w.abs())
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, rhs: Self) -> Self::Output {
        Quaternion::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}
