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

//! Bounding volumes and the view frustum used for culling.

use super::{Mat4, Vec3, Vec4};

// --- Aabb ---

/// An axis-aligned bounding box stored as `min`/`max` corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// The corner with the smallest coordinates.
    pub min: Vec3,
    /// The corner with the largest coordinates.
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that acts as the identity for [`Aabb::merge`].
    pub const INVALID: Self = Self {
        min: Vec3::MAX,
        max: Vec3::MIN,
    };

    /// Creates a box from two corners, sorting the components.
    #[inline]
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The smallest box containing all `points`, or `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let aabb = points.into_iter().fold(Self::INVALID, |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        });
        aabb.is_valid().then_some(aabb)
    }

    /// Returns `true` if `min <= max` on every axis.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Returns the center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns half the size along each axis.
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// The smallest box containing both `self` and `other`.
    #[inline]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns `true` if `point` lies inside or on the boundary.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Transforms the box by `m` and returns the axis-aligned box around the result.
    pub fn transform(&self, m: &Mat4) -> Self {
        let mut out = Self::INVALID;
        for corner in self.corners() {
            let p = m.transform_point3(corner);
            out.min = out.min.min(p);
            out.max = out.max.max(p);
        }
        out
    }
}

// --- Sphere ---

/// A bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// The center of the sphere.
    pub center: Vec3,
    /// The radius. A negative radius marks an empty sphere.
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere.
    #[inline]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// The sphere centered on `aabb` that contains all of `points`.
    pub fn from_points_around(aabb: &Aabb, points: impl IntoIterator<Item = Vec3>) -> Self {
        let center = aabb.center();
        let radius_sq = points
            .into_iter()
            .map(|p| (p - center).length_squared())
            .fold(0.0f32, f32::max);
        Self::new(center, radius_sq.sqrt())
    }

    /// Transforms the sphere by an affine matrix, scaling the radius by the
    /// largest axis scale.
    pub fn transform(&self, m: &Mat4) -> Self {
        Self::new(m.transform_point3(self.center), self.radius * m.max_scale_on_axis())
    }
}

// --- Plane ---

/// A plane `normal · p + d = 0`. Points with a positive distance are on the
/// side the normal points to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// The unit normal.
    pub normal: Vec3,
    /// The signed offset from the origin.
    pub d: f32,
}

impl Plane {
    /// Builds a normalized plane from the `(a, b, c, d)` coefficients.
    pub fn from_coefficients(v: Vec4) -> Self {
        let normal = v.truncate();
        let len = normal.length();
        if len > 0.0 {
            Self {
                normal: normal / len,
                d: v.w / len,
            }
        } else {
            Self { normal, d: v.w }
        }
    }

    /// Signed distance from `point` to the plane.
    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

// --- Frustum ---

/// Six inward-facing planes bounding a view volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the planes of a view-projection matrix with a `[0, 1]` depth range.
    pub fn from_view_projection(m: &Mat4) -> Self {
        let r0 = m.get_row(0);
        let r1 = m.get_row(1);
        let r2 = m.get_row(2);
        let r3 = m.get_row(3);
        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Returns `true` if the sphere is at least partially inside.
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(sphere.center) >= -sphere.radius)
    }

    /// Returns `true` if the box is at least partially inside.
    ///
    /// Tests the corner furthest along each plane normal, which is conservative
    /// near frustum edges.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let n = plane.normal;
            let positive = Vec3::new(
                if n.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if n.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if n.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            plane.distance_to_point(positive) >= 0.0
        })
    }

    /// Returns `true` if `point` is inside.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::FRAC_PI_2;
    use approx::assert_abs_diff_eq;

    fn camera_frustum() -> Frustum {
        // Camera at the origin looking down -Z.
        let proj = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, 0.1, 100.0);
        Frustum::from_view_projection(&proj)
    }

    #[test]
    fn test_from_points() {
        let aabb = Aabb::from_points([Vec3::new(1.0, -1.0, 0.0), Vec3::new(-2.0, 3.0, 1.0)]).unwrap();
        assert_eq!(aabb.min, Vec3::new(-2.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 1.0));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_merge_with_invalid_is_identity() {
        let aabb = Aabb::from_min_max(Vec3::ZERO, Vec3::ONE);
        assert_eq!(Aabb::INVALID.merge(&aabb), aabb);
    }

    #[test]
    fn test_transform_aabb_by_rotation() {
        let aabb = Aabb::from_min_max(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let m = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let moved = aabb.transform(&m);
        assert_abs_diff_eq!(moved.min, Vec3::new(10.0, 0.0, 0.0));
        assert_abs_diff_eq!(moved.max, Vec3::new(12.0, 1.0, 1.0));
    }

    #[test]
    fn test_sphere_transform_uses_largest_scale() {
        let s = Sphere::new(Vec3::X, 1.0);
        let t = s.transform(&Mat4::from_scale(Vec3::new(1.0, 3.0, 2.0)));
        assert_abs_diff_eq!(t.radius, 3.0);
        assert_abs_diff_eq!(t.center, Vec3::X);
    }

    #[test]
    fn test_frustum_sphere_culling() {
        let f = camera_frustum();
        assert!(f.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0)));
        // Behind the camera.
        assert!(!f.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0)));
        // Beyond the far plane.
        assert!(!f.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, -200.0), 1.0)));
        // Straddling the left plane.
        assert!(f.intersects_sphere(&Sphere::new(Vec3::new(-10.5, 0.0, -10.0), 1.0)));
    }

    #[test]
    fn test_frustum_aabb_culling() {
        let f = camera_frustum();
        let inside = Aabb::from_min_max(Vec3::new(-1.0, -1.0, -6.0), Vec3::new(1.0, 1.0, -4.0));
        let outside = Aabb::from_min_max(Vec3::new(50.0, -1.0, -6.0), Vec3::new(52.0, 1.0, -4.0));
        assert!(f.intersects_aabb(&inside));
        assert!(!f.intersects_aabb(&outside));
        assert!(f.contains_point(Vec3::new(0.0, 0.0, -1.0)));
    }
}
