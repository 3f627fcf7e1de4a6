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

//! Light-space views rendered by the shadow pass.

use lumen_core::math::{Mat4, Vec3, FRAC_PI_2};
use lumen_core::renderer::{EnvironmentSignature, LightKind};
use lumen_core::scene::NodeId;
use smallvec::SmallVec;

use super::{RenderView, VisibleLight};

/// Look directions and up vectors of the six cube faces of a point light.
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::Y, Vec3::Z),
    (Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 0.0, -1.0)),
    (Vec3::Z, Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, -1.0, 0.0)),
];

/// One depth render of a shadow-casting light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowView {
    /// The node carrying the light.
    pub light: NodeId,
    /// The cube face for point lights, `0` otherwise.
    pub face: u8,
    /// World-to-light transform.
    pub view: Mat4,
    /// Light projection.
    pub projection: Mat4,
    /// Width and height of the depth map.
    pub map_size: u32,
    /// Depth bias applied when sampling.
    pub bias: f32,
}

impl ShadowView {
    /// The combined light view-projection.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// A render view for collecting this light's shadow casters.
    pub fn render_view(&self, environment: EnvironmentSignature) -> RenderView {
        RenderView::from_matrices(self.view, self.projection, environment)
    }
}

/// Computes the shadow views of a light: one for directional and spot
/// lights, six for point lights, none if the light casts no shadow.
///
/// # Arguments
/// * `light` - The light in world space.
/// * `default_map_size` - Used when the light's shadow settings leave the size at zero.
pub fn shadow_views(light: &VisibleLight, default_map_size: u32) -> SmallVec<[ShadowView; 6]> {
    let mut views = SmallVec::new();
    let Some(settings) = light.light.shadow.filter(|_| light.light.casts_shadow()) else {
        return views;
    };
    let map_size = if settings.map_size == 0 {
        default_map_size
    } else {
        settings.map_size
    };
    let eye = light.position();
    let far_for = |range: f32| if range > 0.0 { range } else { settings.far };

    let mut push = |face: u8, direction: Vec3, up: Vec3, projection: Mat4| {
        match Mat4::look_at_rh(eye, eye + direction, up) {
            Some(view) => views.push(ShadowView {
                light: light.node,
                face,
                view,
                projection,
                map_size,
                bias: settings.bias,
            }),
            None => log::warn!("Light {:?} has a degenerate shadow view; skipping it.", light.node),
        }
    };

    match light.light.kind {
        LightKind::Directional => {
            let direction = light.direction();
            let e = settings.extent;
            let projection = Mat4::orthographic_rh_zo(-e, e, -e, e, settings.near, settings.far);
            push(0, direction, stable_up(direction), projection);
        }
        LightKind::Spot { range, angle, .. } => {
            let direction = light.direction();
            let projection = Mat4::perspective_rh_zo(2.0 * angle, 1.0, settings.near, far_for(range));
            push(0, direction, stable_up(direction), projection);
        }
        LightKind::Point { range, .. } => {
            let projection = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, settings.near, far_for(range));
            for (face, (direction, up)) in CUBE_FACES.into_iter().enumerate() {
                push(face as u8, direction, up, projection);
            }
        }
        LightKind::Ambient | LightKind::Hemisphere { .. } => {}
    }
    views
}

/// An up vector that is not parallel to `direction`.
fn stable_up(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}
