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

//! Gathers the lights of a view.

use lumen_core::math::{Mat4, Vec3};
use lumen_core::renderer::{Light, LightCounts, LightKind};
use lumen_core::scene::NodeId;
use lumen_data::SceneGraph;

/// A light in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleLight {
    /// The node carrying the light.
    pub node: NodeId,
    /// The light parameters.
    pub light: Light,
    /// The node's world matrix.
    pub world_matrix: Mat4,
}

impl VisibleLight {
    /// The light position in world space.
    pub fn position(&self) -> Vec3 {
        self.world_matrix.translation()
    }

    /// The direction the light shines in: the node's `-Z` axis.
    pub fn direction(&self) -> Vec3 {
        self.world_matrix.transform_vector3(-Vec3::Z).normalize()
    }
}

/// Appends every light under `root` to `out` in traversal order. Lights in
/// hidden subtrees are skipped.
pub fn collect_lights(scene: &SceneGraph, root: NodeId, out: &mut Vec<VisibleLight>) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(node) = scene.node(id) else {
            continue;
        };
        if !node.is_visible() {
            continue;
        }
        if let Some(light) = node.light() {
            out.push(VisibleLight {
                node: id,
                light: *light,
                world_matrix: node.world_matrix(),
            });
        }
        stack.extend(node.children().iter().rev().copied());
    }
}

/// Counts lights per kind, and shadow-casting lights when shadows are enabled.
pub fn count_lights(lights: &[VisibleLight], shadows_enabled: bool) -> LightCounts {
    let mut counts = LightCounts::default();
    for visible in lights {
        let shadowed = shadows_enabled && visible.light.casts_shadow();
        match visible.light.kind {
            LightKind::Ambient => counts.ambient += 1,
            LightKind::Hemisphere { .. } => counts.hemisphere += 1,
            LightKind::Directional => {
                counts.directional += 1;
                counts.directional_shadows += u32::from(shadowed);
            }
            LightKind::Point { .. } => {
                counts.point += 1;
                counts.point_shadows += u32::from(shadowed);
            }
            LightKind::Spot { .. } => {
                counts.spot += 1;
                counts.spot_shadows += u32::from(shadowed);
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_lane::update_world_matrices;
    use approx::assert_abs_diff_eq;
    use lumen_core::math::{LinearRgba, Quaternion, FRAC_PI_2};
    use lumen_core::renderer::ShadowSettings;

    #[test]
    fn test_collect_and_count_lights() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let sun = scene.create_node();
        let lamp = scene.create_node();
        let hidden = scene.create_node();
        for node in [sun, lamp, hidden] {
            scene.add_child(root, node).unwrap();
        }
        scene
            .attach_light(sun, Light::directional(LinearRgba::WHITE, 1.0).with_shadow(ShadowSettings::default()))
            .unwrap();
        scene.attach_light(lamp, Light::point(LinearRgba::WHITE, 2.0, 10.0)).unwrap();
        scene.attach_light(hidden, Light::ambient(LinearRgba::WHITE, 1.0)).unwrap();
        scene.set_visible(hidden, false).unwrap();

        let mut lights = Vec::new();
        collect_lights(&scene, root, &mut lights);

        assert_eq!(lights.iter().map(|l| l.node).collect::<Vec<_>>(), vec![sun, lamp]);
        let counts = count_lights(&lights, true);
        assert_eq!((counts.directional, counts.directional_shadows, counts.point), (1, 1, 1));
        assert_eq!(counts.ambient, 0);
        assert_eq!(count_lights(&lights, false).directional_shadows, 0);
    }

    #[test]
    fn test_direction_follows_node_rotation() {
        let mut scene = SceneGraph::new();
        let node = scene.create_node();
        // Turning -Z a quarter turn around X points it down.
        scene
            .set_rotation(node, Quaternion::from_axis_angle(Vec3::X, -FRAC_PI_2))
            .unwrap();
        scene.attach_light(node, Light::directional(LinearRgba::WHITE, 1.0)).unwrap();
        update_world_matrices(&mut scene, false);

        let mut lights = Vec::new();
        collect_lights(&scene, node, &mut lights);
        assert_abs_diff_eq!(lights[0].direction(), -Vec3::Y, epsilon = 1e-5);
    }
}
