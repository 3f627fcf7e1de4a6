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

//! Defines the `Mat3` and `Mat4` types and associated operations.
//!
//! Both matrices are column-major and use the right-handed convention with a
//! zero-to-one clip-space depth range.

use approx::AbsDiffEq;
use std::ops::Mul;

use super::{Quaternion, Vec3, Vec4, EPSILON};

// --- Mat3 ---

/// A 3x3 column-major matrix, used for rotation/scale blocks and normal matrices.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Mat3 {
    /// The columns of the matrix.
    pub cols: [Vec3; 3],
}

impl Mat3 {
    /// The 3x3 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec3::X, Vec3::Y, Vec3::Z],
    };

    /// Creates a new matrix from three column vectors.
    #[inline]
    pub fn from_cols(c0: Vec3, c1: Vec3, c2: Vec3) -> Self {
        Self { cols: [c0, c1, c2] }
    }

    /// Creates a rotation matrix from a unit quaternion.
    pub fn from_quat(q: Quaternion) -> Self {
        let (x2, y2, z2) = (q.x + q.x, q.y + q.y, q.z + q.z);
        let (xx, xy, xz) = (q.x * x2, q.x * y2, q.x * z2);
        let (yy, yz, zz) = (q.y * y2, q.y * z2, q.z * z2);
        let (wx, wy, wz) = (q.w * x2, q.w * y2, q.w * z2);

        Self::from_cols(
            Vec3::new(1.0 - (yy + zz), xy + wz, xz - wy),
            Vec3::new(xy - wz, 1.0 - (xx + zz), yz + wx),
            Vec3::new(xz + wy, yz - wx, 1.0 - (xx + yy)),
        )
    }

    /// Extracts the upper-left 3x3 block of a `Mat4`.
    #[inline]
    pub fn from_mat4(m: &Mat4) -> Self {
        Self::from_cols(m.cols[0].truncate(), m.cols[1].truncate(), m.cols[2].truncate())
    }

    /// The matrix used to transform normals by `model`: the inverse transpose
    /// of its upper-left block. Falls back to the identity for singular input.
    pub fn normal_matrix(model: &Mat4) -> Self {
        Self::from_mat4(model)
            .inverse()
            .map(|m| m.transpose())
            .unwrap_or(Self::IDENTITY)
    }

    /// Computes the determinant.
    #[inline]
    pub fn determinant(&self) -> f32 {
        let [a, b, c] = self.cols;
        a.dot(b.cross(c))
    }

    /// Returns the transpose of the matrix.
    pub fn transpose(&self) -> Self {
        let [a, b, c] = self.cols;
        Self::from_cols(
            Vec3::new(a.x, b.x, c.x),
            Vec3::new(a.y, b.y, c.y),
            Vec3::new(a.z, b.z, c.z),
        )
    }

    /// Computes the inverse, or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let [a, b, c] = self.cols;
        let r0 = b.cross(c);
        let r1 = c.cross(a);
        let r2 = a.cross(b);
        let det = a.dot(r0);
        if det.abs() < EPSILON * EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Self::from_cols(r0 * inv_det, r1 * inv_det, r2 * inv_det).transpose())
    }
}

impl Default for Mat3 {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, v: Vec3) -> Vec3 {
        self.cols[0] * v.x + self.cols[1] * v.y + self.cols[2] * v.z
    }
}

impl Mul<Mat3> for Mat3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Mat3) -> Self {
        Self::from_cols(self * rhs.cols[0], self * rhs.cols[1], self * rhs.cols[2])
    }
}

impl AbsDiffEq for Mat3 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.cols
            .iter()
            .zip(other.cols.iter())
            .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

// --- Mat4 ---

/// A 4x4 column-major matrix for affine and projective transforms.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix. `cols[3]` holds the translation.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Returns a row of the matrix.
    #[inline]
    pub fn get_row(&self, index: usize) -> Vec4 {
        Vec4::new(
            self.cols[0].get(index),
            self.cols[1].get(index),
            self.cols[2].get(index),
            self.cols[3].get(index),
        )
    }

    /// Creates a translation matrix.
    #[inline]
    pub fn from_translation(v: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = v.extend(1.0);
        m
    }

    /// Creates a non-uniform scaling matrix.
    #[inline]
    pub fn from_scale(s: Vec3) -> Self {
        Self::from_cols(
            Vec4::new(s.x, 0.0, 0.0, 0.0),
            Vec4::new(0.0, s.y, 0.0, 0.0),
            Vec4::new(0.0, 0.0, s.z, 0.0),
            Vec4::W,
        )
    }

    /// Creates a rotation matrix from a unit quaternion.
    #[inline]
    pub fn from_quat(q: Quaternion) -> Self {
        Self::from_scale_rotation_translation(Vec3::ONE, q, Vec3::ZERO)
    }

    /// Composes `T * R * S`, the local matrix of a scene node.
    pub fn from_scale_rotation_translation(
        scale: Vec3,
        rotation: Quaternion,
        translation: Vec3,
    ) -> Self {
        let r = Mat3::from_quat(rotation);
        Self::from_cols(
            (r.cols[0] * scale.x).extend(0.0),
            (r.cols[1] * scale.y).extend(0.0),
            (r.cols[2] * scale.z).extend(0.0),
            translation.extend(1.0),
        )
    }

    /// Decomposes an affine matrix into `(scale, rotation, translation)`.
    ///
    /// A negative determinant is folded into the X scale. Returns `None` when
    /// any axis has zero length, since no rotation can be recovered.
    pub fn to_scale_rotation_translation(&self) -> Option<(Vec3, Quaternion, Vec3)> {
        let c0 = self.cols[0].truncate();
        let c1 = self.cols[1].truncate();
        let c2 = self.cols[2].truncate();

        let det = c0.dot(c1.cross(c2));
        let mut scale = Vec3::new(c0.length(), c1.length(), c2.length());
        if det < 0.0 {
            scale.x = -scale.x;
        }
        if scale.x.abs() < EPSILON || scale.y.abs() < EPSILON || scale.z.abs() < EPSILON {
            return None;
        }

        let rotation = Mat3::from_cols(c0 / scale.x, c1 / scale.y, c2 / scale.z);
        Some((
            scale,
            Quaternion::from_rotation_matrix(&rotation),
            self.translation(),
        ))
    }

    /// Returns the translation part of an affine matrix.
    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.cols[3].truncate()
    }

    /// Returns the largest axis scale, used to grow bounding spheres.
    pub fn max_scale_on_axis(&self) -> f32 {
        self.cols[0]
            .truncate()
            .length_squared()
            .max(self.cols[1].truncate().length_squared())
            .max(self.cols[2].truncate().length_squared())
            .sqrt()
    }

    /// Creates a right-handed perspective projection with a `[0, 1]` depth range.
    ///
    /// # Arguments
    /// * `fov_y_radians` - The vertical field of view.
    /// * `aspect_ratio` - Width divided by height.
    /// * `z_near`, `z_far` - Positive distances to the clipping planes.
    pub fn perspective_rh_zo(fov_y_radians: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        let f = 1.0 / (0.5 * fov_y_radians).tan();
        let range = z_far / (z_near - z_far);
        Self::from_cols(
            Vec4::new(f / aspect_ratio, 0.0, 0.0, 0.0),
            Vec4::new(0.0, f, 0.0, 0.0),
            Vec4::new(0.0, 0.0, range, -1.0),
            Vec4::new(0.0, 0.0, range * z_near, 0.0),
        )
    }

    /// Creates a right-handed orthographic projection with a `[0, 1]` depth range.
    pub fn orthographic_rh_zo(
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        let rcp_width = 1.0 / (right - left);
        let rcp_height = 1.0 / (top - bottom);
        let r = 1.0 / (z_near - z_far);
        Self::from_cols(
            Vec4::new(rcp_width + rcp_width, 0.0, 0.0, 0.0),
            Vec4::new(0.0, rcp_height + rcp_height, 0.0, 0.0),
            Vec4::new(0.0, 0.0, r, 0.0),
            Vec4::new(
                -(left + right) * rcp_width,
                -(top + bottom) * rcp_height,
                r * z_near,
                1.0,
            ),
        )
    }

    /// Creates a right-handed view matrix looking from `eye` towards `target`.
    ///
    /// Returns `None` if `eye == target` or if `up` is parallel to the view direction.
    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let f = (target - eye).normalize();
        if f == Vec3::ZERO {
            return None;
        }
        let s = f.cross(up).normalize();
        if s == Vec3::ZERO {
            return None;
        }
        let u = s.cross(f);
        Some(Self::from_cols(
            Vec4::new(s.x, u.x, -f.x, 0.0),
            Vec4::new(s.y, u.y, -f.y, 0.0),
            Vec4::new(s.z, u.z, -f.z, 0.0),
            Vec4::new(-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0),
        ))
    }

    /// Returns the transpose of the matrix.
    pub fn transpose(&self) -> Self {
        Self::from_cols(self.get_row(0), self.get_row(1), self.get_row(2), self.get_row(3))
    }

    /// Computes the determinant.
    pub fn determinant(&self) -> f32 {
        Self::minors(&self.to_cols_array()).2
    }

    /// Computes the inverse, or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let a = self.to_cols_array();
        let (b, c, det) = Self::minors(&a);
        if det.abs() < EPSILON * EPSILON {
            return None;
        }
        let [b00, b01, b02, b03, b04, b05] = b;
        let [b06, b07, b08, b09, b10, b11] = c;
        let inv = 1.0 / det;
        let [a00, a01, a02, a03, a10, a11, a12, a13, a20, a21, a22, a23, a30, a31, a32, a33] = a;

        let out = [
            (a11 * b11 - a12 * b10 + a13 * b09) * inv,
            (a02 * b10 - a01 * b11 - a03 * b09) * inv,
            (a31 * b05 - a32 * b04 + a33 * b03) * inv,
            (a22 * b04 - a21 * b05 - a23 * b03) * inv,
            (a12 * b08 - a10 * b11 - a13 * b07) * inv,
            (a00 * b11 - a02 * b08 + a03 * b07) * inv,
            (a32 * b02 - a30 * b05 - a33 * b01) * inv,
            (a20 * b05 - a22 * b02 + a23 * b01) * inv,
            (a10 * b10 - a11 * b08 + a13 * b06) * inv,
            (a01 * b08 - a00 * b10 - a03 * b06) * inv,
            (a30 * b04 - a31 * b02 + a33 * b00) * inv,
            (a21 * b02 - a20 * b04 - a23 * b00) * inv,
            (a11 * b07 - a10 * b09 - a12 * b06) * inv,
            (a00 * b09 - a01 * b07 + a02 * b06) * inv,
            (a31 * b01 - a30 * b03 - a32 * b00) * inv,
            (a20 * b03 - a21 * b01 + a22 * b00) * inv,
        ];
        Some(Self::from_cols_array(&out))
    }

    /// The 2x2 minors shared by `determinant` and `inverse`, plus the determinant.
    fn minors(a: &[f32; 16]) -> ([f32; 6], [f32; 6], f32) {
        let [a00, a01, a02, a03, a10, a11, a12, a13, a20, a21, a22, a23, a30, a31, a32, a33] = *a;
        let upper = [
            a00 * a11 - a01 * a10,
            a00 * a12 - a02 * a10,
            a00 * a13 - a03 * a10,
            a01 * a12 - a02 * a11,
            a01 * a13 - a03 * a11,
            a02 * a13 - a03 * a12,
        ];
        let lower = [
            a20 * a31 - a21 * a30,
            a20 * a32 - a22 * a30,
            a20 * a33 - a23 * a30,
            a21 * a32 - a22 * a31,
            a21 * a33 - a23 * a31,
            a22 * a33 - a23 * a32,
        ];
        let det = upper[0] * lower[5] - upper[1] * lower[4] + upper[2] * lower[3]
            + upper[3] * lower[2]
            - upper[4] * lower[1]
            + upper[5] * lower[0];
        (upper, lower, det)
    }

    /// Transforms a point (`w = 1`), applying the perspective divide when `w != 1`.
    pub fn transform_point3(&self, p: Vec3) -> Vec3 {
        let v = *self * p.extend(1.0);
        if (v.w - 1.0).abs() > EPSILON && v.w.abs() > EPSILON {
            v.truncate() / v.w
        } else {
            v.truncate()
        }
    }

    /// Transforms a direction (`w = 0`), ignoring translation.
    #[inline]
    pub fn transform_vector3(&self, v: Vec3) -> Vec3 {
        (*self * v.extend(0.0)).truncate()
    }

    /// Returns the sixteen elements in column-major order.
    #[inline]
    pub fn to_cols_array(&self) -> [f32; 16] {
        bytemuck::cast(*self)
    }

    /// Builds a matrix from sixteen column-major elements.
    #[inline]
    pub fn from_cols_array(a: &[f32; 16]) -> Self {
        bytemuck::cast(*a)
    }
}

impl Default for Mat4 {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Mat4) -> Self {
        Self::from_cols(
            self * rhs.cols[0],
            self * rhs.cols[1],
            self * rhs.cols[2],
            self * rhs.cols[3],
        )
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    #[inline]
    fn mul(self, v: Vec4) -> Vec4 {
        self.cols[0] * v.x + self.cols[1] * v.y + self.cols[2] * v.z + self.cols[3] * v.w
    }
}

impl AbsDiffEq for Mat4 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.cols
            .iter()
            .zip(other.cols.iter())
            .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{FRAC_PI_2, FRAC_PI_4};
    use approx::assert_abs_diff_eq;

    fn sample_trs() -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 0.5, 3.0),
            Quaternion::from_axis_angle(Vec3::new(0.3, 1.0, -0.2), 0.7),
            Vec3::new(1.0, -2.0, 5.0),
        )
    }

    #[test]
    fn test_trs_matches_explicit_product() {
        let s = Vec3::new(2.0, 3.0, 4.0);
        let r = Quaternion::from_axis_angle(Vec3::Y, FRAC_PI_4);
        let t = Vec3::new(1.0, 2.0, 3.0);
        let expected = Mat4::from_translation(t) * Mat4::from_quat(r) * Mat4::from_scale(s);
        assert_abs_diff_eq!(Mat4::from_scale_rotation_translation(s, r, t), expected);
    }

    #[test]
    fn test_inverse_times_self_is_identity() {
        let m = sample_trs();
        let inv = m.inverse().expect("TRS with non-zero scale is invertible");
        assert_abs_diff_eq!(m * inv, Mat4::IDENTITY, epsilon = 1e-4);
        assert_abs_diff_eq!(inv * m, Mat4::IDENTITY, epsilon = 1e-4);
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        let m = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(m.inverse().is_none());
        assert_eq!(m.determinant(), 0.0);
    }

    #[test]
    fn test_determinant_of_scale() {
        assert_abs_diff_eq!(Mat4::from_scale(Vec3::new(2.0, 3.0, 4.0)).determinant(), 24.0);
        assert_abs_diff_eq!(Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0)).determinant(), -1.0);
    }

    #[test]
    fn test_decompose_round_trip() {
        let m = sample_trs();
        let (s, r, t) = m.to_scale_rotation_translation().expect("decomposable");
        assert_abs_diff_eq!(s, Vec3::new(2.0, 0.5, 3.0), epsilon = 1e-4);
        assert_abs_diff_eq!(t, Vec3::new(1.0, -2.0, 5.0));
        assert_abs_diff_eq!(Mat4::from_scale_rotation_translation(s, r, t), m, epsilon = 1e-4);
    }

    #[test]
    fn test_decompose_mirrored_matrix() {
        let m = Mat4::from_scale(Vec3::new(-2.0, 1.0, 1.0));
        let (s, r, _) = m.to_scale_rotation_translation().expect("decomposable");
        assert_abs_diff_eq!(s, Vec3::new(-2.0, 1.0, 1.0));
        assert_abs_diff_eq!(r, Quaternion::IDENTITY);
    }

    #[test]
    fn test_perspective_maps_near_and_far() {
        let p = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, 0.1, 100.0);
        assert_abs_diff_eq!(p.transform_point3(Vec3::new(0.0, 0.0, -0.1)).z, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(p.transform_point3(Vec3::new(0.0, 0.0, -100.0)).z, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_orthographic_maps_box_to_clip_space() {
        let o = Mat4::orthographic_rh_zo(-2.0, 2.0, -1.0, 1.0, 1.0, 11.0);
        assert_abs_diff_eq!(o.transform_point3(Vec3::new(2.0, 1.0, -1.0)), Vec3::new(1.0, 1.0, 0.0));
        assert_abs_diff_eq!(o.transform_point3(Vec3::new(-2.0, -1.0, -11.0)), Vec3::new(-1.0, -1.0, 1.0));
    }

    #[test]
    fn test_look_at_places_target_in_front() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y).unwrap();
        assert_abs_diff_eq!(view.transform_point3(Vec3::ZERO), Vec3::new(0.0, 0.0, -5.0));
        assert!(Mat4::look_at_rh(Vec3::ZERO, Vec3::Y, Vec3::Y).is_none());
    }

    #[test]
    fn test_normal_matrix_of_non_uniform_scale() {
        let n = Mat3::normal_matrix(&Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)));
        assert_abs_diff_eq!(n * Vec3::X, Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_mat3_inverse() {
        let m = Mat3::from_quat(Quaternion::from_axis_angle(Vec3::X, 0.4));
        assert_abs_diff_eq!(m * m.inverse().unwrap(), Mat3::IDENTITY);
    }
}
