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

//! The camera a frame is rendered from.

use lumen_core::math::{Frustum, Mat4, Vec3};

/// The projection model of a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// A perspective projection.
    Perspective {
        /// The vertical field of view, in radians.
        fov_y_radians: f32,
        /// Width divided by height.
        aspect_ratio: f32,
        /// Distance to the near plane.
        z_near: f32,
        /// Distance to the far plane.
        z_far: f32,
    },
    /// An orthographic projection.
    Orthographic {
        /// Half the height of the view volume.
        half_height: f32,
        /// Width divided by height.
        aspect_ratio: f32,
        /// Distance to the near plane.
        z_near: f32,
        /// Distance to the far plane.
        z_far: f32,
    },
}

/// A camera: a projection and a world transform.
///
/// The camera looks down its local `-Z` axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// The projection model.
    pub projection: Projection,
    world_matrix: Mat4,
}

impl Camera {
    /// A perspective camera at the origin.
    pub fn perspective(fov_y_radians: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y_radians,
                aspect_ratio,
                z_near,
                z_far,
            },
            world_matrix: Mat4::IDENTITY,
        }
    }

    /// An orthographic camera at the origin.
    pub fn orthographic(half_height: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                half_height,
                aspect_ratio,
                z_near,
                z_far,
            },
            world_matrix: Mat4::IDENTITY,
        }
    }

    /// Places the camera at `eye` looking at `target`.
    ///
    /// Returns `false` and leaves the camera unchanged if the orientation is
    /// undefined (`eye == target` or `up` parallel to the view direction).
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) -> bool {
        match Mat4::look_at_rh(eye, target, up).and_then(|view| view.inverse()) {
            Some(world) => {
                self.world_matrix = world;
                true
            }
            None => false,
        }
    }

    /// Sets the world matrix directly, e.g. from a scene node.
    pub fn set_world_matrix(&mut self, world_matrix: Mat4) {
        self.world_matrix = world_matrix;
    }

    /// The world matrix.
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// The camera position in world space.
    pub fn position(&self) -> Vec3 {
        self.world_matrix.translation()
    }

    /// Updates the aspect ratio after a resize.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        match &mut self.projection {
            Projection::Perspective { aspect_ratio, .. }
            | Projection::Orthographic { aspect_ratio, .. } => *aspect_ratio = aspect,
        }
    }

    /// The projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective {
                fov_y_radians,
                aspect_ratio,
                z_near,
                z_far,
            } => Mat4::perspective_rh_zo(fov_y_radians, aspect_ratio, z_near, z_far),
            Projection::Orthographic {
                half_height,
                aspect_ratio,
                z_near,
                z_far,
            } => {
                let half_width = half_height * aspect_ratio;
                Mat4::orthographic_rh_zo(-half_width, half_width, -half_height, half_height, z_near, z_far)
            }
        }
    }

    /// The view matrix, the inverse of the world matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.world_matrix.inverse().unwrap_or(Mat4::IDENTITY)
    }

    /// `projection * view`.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// The view frustum in world space.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use lumen_core::math::{Sphere, FRAC_PI_2};

    #[test]
    fn test_look_at_sets_position_and_view() {
        let mut camera = Camera::perspective(FRAC_PI_2, 1.0, 0.1, 100.0);
        assert!(camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y));
        assert_abs_diff_eq!(camera.position(), Vec3::new(0.0, 0.0, 10.0), epsilon = 1e-4);
        assert_abs_diff_eq!(
            camera.view_matrix().transform_point3(Vec3::ZERO),
            Vec3::new(0.0, 0.0, -10.0),
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_frustum_follows_camera() {
        let mut camera = Camera::perspective(FRAC_PI_2, 1.0, 0.1, 100.0);
        camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let frustum = camera.frustum();
        assert!(frustum.intersects_sphere(&Sphere::new(Vec3::ZERO, 1.0)));
        assert!(!frustum.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 20.0), 1.0)));
    }

    #[test]
    fn test_invalid_look_at_is_rejected() {
        let mut camera = Camera::orthographic(5.0, 1.0, 0.1, 100.0);
        assert!(!camera.look_at(Vec3::ZERO, Vec3::ZERO, Vec3::Y));
        assert_eq!(camera.world_matrix(), Mat4::IDENTITY);
    }
}
