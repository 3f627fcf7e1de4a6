// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Unit quaternions for node rotations.

use approx::AbsDiffEq;
use serde::{Deserialize, Serialize};
use std::ops::Mul;

use super::{Mat3, Vec3, EPSILON};

/// A rotation stored as `(x, y, z, w)` where `w` is the scalar part.
///
/// Node rotations are expected to be unit quaternions. Operations that produce
/// rotations (`from_axis_angle`, `from_rotation_matrix`, `slerp`) normalize
/// their output.
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Quaternion {
    /// The x component of the vector part.
    pub x: f32,
    /// The y component of the vector part.
    pub y: f32,
    /// The z component of the vector part.
    pub z: f32,
    /// The scalar part.
    pub w: f32,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Creates a quaternion from raw components. The result is not normalized.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Creates a rotation of `angle_radians` around `axis`. The axis does not
    /// need to be normalized.
    pub fn from_axis_angle(axis: Vec3, angle_radians: f32) -> Self {
        let axis = axis.normalize();
        let (s, c) = (angle_radians * 0.5).sin_cos();
        Self::new(axis.x * s, axis.y * s, axis.z * s, c)
    }

    /// Extracts the rotation from a pure rotation matrix (orthonormal columns).
    ///
    /// Uses Shepperd's method, picking the largest diagonal term to stay
    /// numerically stable.
    pub fn from_rotation_matrix(m: &Mat3) -> Self {
        let [c0, c1, c2] = m.cols;
        let (m00, m11, m22) = (c0.x, c1.y, c2.z);
        let trace = m00 + m11 + m22;

        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new((c1.z - c2.y) / s, (c2.x - c0.z) / s, (c0.y - c1.x) / s, 0.25 * s)
        } else if m00 > m11 && m00 > m22 {
            let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0;
            Self::new(0.25 * s, (c1.x + c0.y) / s, (c2.x + c0.z) / s, (c1.z - c2.y) / s)
        } else if m11 > m22 {
            let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0;
            Self::new((c1.x + c0.y) / s, 0.25 * s, (c2.y + c1.z) / s, (c2.x - c0.z) / s)
        } else {
            let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0;
            Self::new((c2.x + c0.z) / s, (c2.y + c1.z) / s, 0.25 * s, (c0.y - c1.x) / s)
        };
        q.normalize()
    }

    /// Returns the squared magnitude.
    #[inline]
    pub fn magnitude_squared(&self) -> f32 {
        self.dot(*self)
    }

    /// Returns a unit-length copy, or the identity if the magnitude is zero.
    pub fn normalize(&self) -> Self {
        let mag_sq = self.magnitude_squared();
        if mag_sq > EPSILON * EPSILON {
            let inv = 1.0 / mag_sq.sqrt();
            Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
        } else {
            Self::IDENTITY
        }
    }

    /// Returns the conjugate, which is the inverse for unit quaternions.
    #[inline]
    pub fn conjugate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Four-dimensional dot product.
    #[inline]
    pub fn dot(&self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Rotates a vector by this quaternion.
    pub fn rotate_vec3(&self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }

    /// Spherical interpolation along the shortest arc.
    pub fn slerp(start: Self, end: Self, t: f32) -> Self {
        let mut end = end;
        let mut cos = start.dot(end);
        if cos < 0.0 {
            end = Self::new(-end.x, -end.y, -end.z, -end.w);
            cos = -cos;
        }
        if cos > 1.0 - EPSILON {
            let lerp = |a: f32, b: f32| a + (b - a) * t;
            return Self::new(
                lerp(start.x, end.x),
                lerp(start.y, end.y),
                lerp(start.z, end.z),
                lerp(start.w, end.w),
            )
            .normalize();
        }
        let angle = cos.acos();
        let sin = angle.sin();
        let a = ((1.0 - t) * angle).sin() / sin;
        let b = (t * angle).sin() / sin;
        Self::new(
            start.x * a + end.x * b,
            start.y * a + end.y * b,
            start.z * a + end.z * b,
            start.w * a + end.w * b,
        )
        .normalize()
    }
}

impl Default for Quaternion {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Quaternion> for Quaternion {
    type Output = Self;

    /// Hamilton product; `a * b` applies `b` first, then `a`.
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl Mul<Vec3> for Quaternion {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: Vec3) -> Vec3 {
        self.rotate_vec3(rhs)
    }
}

impl AbsDiffEq for Quaternion {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        EPSILON
    }

    /// Two quaternions are equal rotations when `q == p` or `q == -p`.
    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.dot(*other).abs().abs_diff_eq(&1.0, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{FRAC_PI_2, PI};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_axis_angle_rotates_vector() {
        let q = Quaternion::from_axis_angle(Vec3::Z, FRAC_PI_2);
        assert_abs_diff_eq!(q * Vec3::X, Vec3::Y);
    }

    #[test]
    fn test_matrix_round_trip() {
        let q = Quaternion::from_axis_angle(Vec3::new(1.0, 2.0, 3.0), 1.1);
        let back = Quaternion::from_rotation_matrix(&Mat3::from_quat(q));
        assert_abs_diff_eq!(q, back);
    }

    #[test]
    fn test_matrix_round_trip_half_turn() {
        // A 180° turn has trace -1, which exercises the non-trace branches.
        let q = Quaternion::from_axis_angle(Vec3::Y, PI);
        let back = Quaternion::from_rotation_matrix(&Mat3::from_quat(q));
        assert_abs_diff_eq!(q, back);
    }

    #[test]
    fn test_composition_order() {
        let a = Quaternion::from_axis_angle(Vec3::Z, FRAC_PI_2);
        let b = Quaternion::from_axis_angle(Vec3::X, FRAC_PI_2);
        // b first (Y -> Z), then a leaves Z unchanged.
        assert_abs_diff_eq!((a * b) * Vec3::Y, Vec3::Z);
    }

    #[test]
    fn test_slerp_midpoint() {
        let start = Quaternion::IDENTITY;
        let end = Quaternion::from_axis_angle(Vec3::Y, FRAC_PI_2);
        let mid = Quaternion::slerp(start, end, 0.5);
        assert_abs_diff_eq!(mid, Quaternion::from_axis_angle(Vec3::Y, FRAC_PI_2 * 0.5));
        assert_relative_eq!(mid.magnitude_squared(), 1.0, epsilon = EPSILON);
    }
}
