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

//! Builds the per-frame opaque, transmissive and transparent render lists.

use std::cmp::Ordering;

use lumen_core::material::{Material, ProgramKey};
use lumen_core::math::{Aabb, Frustum, Mat4, Sphere, Vec3};
use lumen_core::renderer::EnvironmentSignature;
use lumen_core::scene::{GeometryId, MaterialId, NodeId};
use lumen_data::scene::Node;
use lumen_data::{Camera, SceneGraph};

/// The partition of the render list a drawable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderBucket {
    /// Drawn first, front to back.
    Opaque,
    /// Drawn after the opaque bucket, sampling a copy of it.
    Transmissive,
    /// Drawn last, back to front.
    Transparent,
}

impl RenderBucket {
    /// Classifies a material. Transmission takes precedence over transparency.
    pub fn classify(material: &Material) -> Self {
        if material.transmission() > 0.0 {
            Self::Transmissive
        } else if material.transparent {
            Self::Transparent
        } else {
            Self::Opaque
        }
    }
}

/// One drawable that survived culling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    /// The node carrying the drawable.
    pub node: NodeId,
    /// The geometry to draw.
    pub geometry: GeometryId,
    /// The material to draw with.
    pub material: MaterialId,
    /// The program variant the material needs in this view.
    pub program_key: ProgramKey,
    /// The node's world matrix.
    pub world_matrix: Mat4,
    /// Distance along the view direction, used for sorting.
    pub depth: f32,
    /// The node's render order.
    pub render_order: i32,
    /// Instances per draw call.
    pub instance_count: u32,
    /// Whether the node receives shadows.
    pub receive_shadow: bool,
    /// Position in traversal order.
    pub sequence: u32,
}

/// The description of a view the lists are built for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    /// The culling volume.
    pub frustum: Frustum,
    /// World-to-view transform, used for depth.
    pub view_matrix: Mat4,
    /// The lighting/output environment, used to derive program keys.
    pub environment: EnvironmentSignature,
    /// Also cull against world bounding boxes.
    pub cull_with_bounding_box: bool,
    /// Sort the buckets. When off, items keep traversal order.
    pub sort_objects: bool,
}

impl RenderView {
    /// A view matching a camera, sorted and sphere-culled.
    pub fn from_camera(camera: &Camera, environment: EnvironmentSignature) -> Self {
        Self::from_matrices(camera.view_matrix(), camera.projection_matrix(), environment)
    }

    /// A view from raw view and projection matrices.
    pub fn from_matrices(view: Mat4, projection: Mat4, environment: EnvironmentSignature) -> Self {
        Self {
            frustum: Frustum::from_view_projection(&(projection * view)),
            view_matrix: view,
            environment,
            cull_with_bounding_box: false,
            sort_objects: true,
        }
    }

    /// Enables or disables the bounding box test.
    pub fn with_bounding_box_culling(mut self, enabled: bool) -> Self {
        self.cull_with_bounding_box = enabled;
        self
    }

    /// Enables or disables sorting.
    pub fn with_sorting(mut self, enabled: bool) -> Self {
        self.sort_objects = enabled;
        self
    }
}

/// The bucketed output of a [`RenderListBuilder`].
///
/// Items live in one pooled vector reused from frame to frame; buckets hold
/// indices into it.
#[derive(Debug, Default)]
pub struct RenderLists {
    items: Vec<RenderItem>,
    opaque: Vec<u32>,
    transmissive: Vec<u32>,
    transparent: Vec<u32>,
    culled: u32,
}

impl RenderLists {
    /// Empties the lists, keeping their allocations.
    pub fn clear(&mut self) {
        self.items.clear();
        self.opaque.clear();
        self.transmissive.clear();
        self.transparent.clear();
        self.culled = 0;
    }

    /// The items of one bucket, in draw order.
    pub fn bucket(&self, bucket: RenderBucket) -> impl ExactSizeIterator<Item = &RenderItem> + '_ {
        let indices = match bucket {
            RenderBucket::Opaque => &self.opaque,
            RenderBucket::Transmissive => &self.transmissive,
            RenderBucket::Transparent => &self.transparent,
        };
        let items = &self.items;
        indices.iter().map(move |&index| &items[index as usize])
    }

    /// The opaque items in draw order.
    pub fn opaque(&self) -> impl ExactSizeIterator<Item = &RenderItem> + '_ {
        self.bucket(RenderBucket::Opaque)
    }

    /// The transmissive items in draw order.
    pub fn transmissive(&self) -> impl ExactSizeIterator<Item = &RenderItem> + '_ {
        self.bucket(RenderBucket::Transmissive)
    }

    /// The transparent items in draw order.
    pub fn transparent(&self) -> impl ExactSizeIterator<Item = &RenderItem> + '_ {
        self.bucket(RenderBucket::Transparent)
    }

    /// Every item in traversal order.
    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    /// The number of items across all buckets.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no drawable survived.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drawables rejected by the frustum test.
    pub fn culled(&self) -> u32 {
        self.culled
    }

    fn push(&mut self, item: RenderItem, bucket: RenderBucket) {
        let index = self.items.len() as u32;
        self.items.push(item);
        match bucket {
            RenderBucket::Opaque => self.opaque.push(index),
            RenderBucket::Transmissive => self.transmissive.push(index),
            RenderBucket::Transparent => self.transparent.push(index),
        }
    }

    fn sort(&mut self) {
        let items = &self.items;
        let by_index = |order: fn(&RenderItem, &RenderItem) -> Ordering| {
            move |a: &u32, b: &u32| order(&items[*a as usize], &items[*b as usize])
        };
        self.opaque.sort_unstable_by(by_index(front_to_back));
        self.transmissive.sort_unstable_by(by_index(back_to_front));
        self.transparent.sort_unstable_by(by_index(back_to_front));
    }
}

/// Opaque order: render order, then grouped by program and material to
/// minimize state changes, then nearest first.
fn front_to_back(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then_with(|| a.program_key.cmp(&b.program_key))
        .then_with(|| a.material.cmp(&b.material))
        .then_with(|| a.depth.total_cmp(&b.depth))
        .then_with(|| a.sequence.cmp(&b.sequence))
}

/// Blended order: render order, then farthest first.
fn back_to_front(a: &RenderItem, b: &RenderItem) -> Ordering {
    a.render_order
        .cmp(&b.render_order)
        .then_with(|| b.depth.total_cmp(&a.depth))
        .then_with(|| a.sequence.cmp(&b.sequence))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collect {
    /// Every visible drawable, bucketed by material.
    Main,
    /// Shadow casters only, all in the opaque bucket.
    ShadowCasters,
}

/// Traverses a scene and produces sorted [`RenderLists`].
///
/// The builder owns its lists and traversal stack, so building every frame
/// does not allocate once the pools have grown.
#[derive(Debug, Default)]
pub struct RenderListBuilder {
    lists: RenderLists,
    stack: Vec<NodeId>,
}

impl RenderListBuilder {
    /// Creates a builder with empty pools.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lists produced by the last build.
    pub fn lists(&self) -> &RenderLists {
        &self.lists
    }

    /// Builds the lists for the subtree under `root` as seen from `view`.
    ///
    /// World matrices must be up to date.
    pub fn build(&mut self, scene: &SceneGraph, root: NodeId, view: &RenderView) -> &RenderLists {
        self.collect(scene, root, view, Collect::Main)
    }

    /// Builds the list of shadow casters seen from a light's view. Every
    /// caster lands in the opaque bucket.
    pub fn collect_shadow_casters(
        &mut self,
        scene: &SceneGraph,
        root: NodeId,
        view: &RenderView,
    ) -> &RenderLists {
        self.collect(scene, root, view, Collect::ShadowCasters)
    }

    fn collect(
        &mut self,
        scene: &SceneGraph,
        root: NodeId,
        view: &RenderView,
        mode: Collect,
    ) -> &RenderLists {
        self.lists.clear();
        self.stack.clear();
        self.stack.push(root);

        while let Some(id) = self.stack.pop() {
            let Some(node) = scene.node(id) else {
                continue;
            };
            if !node.is_visible() {
                continue;
            }
            self.stack.extend(node.children().iter().rev().copied());

            let Some(drawable) = node.drawable() else {
                continue;
            };
            if mode == Collect::ShadowCasters && !node.casts_shadow() {
                continue;
            }
            let (Some(geometry), Some(material)) =
                (scene.geometry(drawable.geometry), scene.material(drawable.material))
            else {
                log::trace!("Skipping {id:?}: its geometry or material is gone.");
                continue;
            };
            if !material.visible {
                continue;
            }

            let world = node.world_matrix();
            let world_sphere = geometry.bounding_sphere().map(|s| s.transform(&world));
            if Self::is_culled(node, drawable.instance_count, view, || {
                (world_sphere, geometry.bounding_box().map(|b| b.transform(&world)))
            }) {
                self.lists.culled += 1;
                continue;
            }

            let center = world_sphere.map_or_else(|| world.translation(), |s| s.center);
            let bucket = match mode {
                Collect::Main => RenderBucket::classify(material),
                Collect::ShadowCasters => RenderBucket::Opaque,
            };
            let item = RenderItem {
                node: id,
                geometry: drawable.geometry,
                material: drawable.material,
                program_key: material.program_key(view.environment),
                world_matrix: world,
                depth: view_depth(&view.view_matrix, center),
                render_order: node.render_order(),
                instance_count: drawable.instance_count,
                receive_shadow: node.receives_shadow(),
                sequence: self.lists.items.len() as u32,
            };
            self.lists.push(item, bucket);
        }

        if view.sort_objects {
            self.lists.sort();
        }
        &self.lists
    }

    /// Instanced drawables and nodes that opt out are never culled, and
    /// neither is geometry without positions.
    fn is_culled(
        node: &Node,
        instance_count: u32,
        view: &RenderView,
        bounds: impl FnOnce() -> (Option<Sphere>, Option<Aabb>),
    ) -> bool {
        if !node.is_frustum_culled() || instance_count > 1 {
            return false;
        }
        let (sphere, aabb) = bounds();
        let Some(sphere) = sphere else {
            return false;
        };
        if !view.frustum.intersects_sphere(&sphere) {
            return true;
        }
        match aabb {
            Some(aabb) if view.cull_with_bounding_box => !view.frustum.intersects_aabb(&aabb),
            _ => false,
        }
    }
}

/// Distance of `point` in front of the view. Negative behind it.
fn view_depth(view_matrix: &Mat4, point: Vec3) -> f32 {
    -view_matrix.transform_point3(point).z
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::math::LinearRgba;
    use lumen_core::renderer::Environment;
    use crate::scene_lane::update_world_matrices;
    use lumen_data::geometry::shapes;

    /// A camera at the origin looking down -Z.
    fn view() -> RenderView {
        let camera = Camera::perspective(1.2, 1.0, 0.1, 100.0);
        RenderView::from_camera(&camera, Environment::default().signature())
    }

    fn spawn(scene: &mut SceneGraph, root: NodeId, material: Material, z: f32) -> NodeId {
        let geometry = scene.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
        let material = scene.add_material(material);
        let node = scene.create_node();
        scene.set_position(node, Vec3::new(0.0, 0.0, z)).unwrap();
        scene.add_child(root, node).unwrap();
        scene.attach_drawable(node, geometry, material).unwrap();
        node
    }

    fn transparent(color: LinearRgba) -> Material {
        let mut material = Material::basic(color);
        material.transparent = true;
        material
    }

    #[test]
    fn test_buckets_are_exclusive_and_transmission_wins() {
        // --- 1. ARRANGE ---
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let opaque = spawn(&mut scene, root, Material::basic(LinearRgba::WHITE), -5.0);
        let blended = spawn(&mut scene, root, transparent(LinearRgba::WHITE), -5.0);
        let mut glass = Material::standard(LinearRgba::WHITE, 0.0, 0.1);
        if let lumen_core::material::MaterialKind::Standard { transmission, .. } = &mut glass.kind {
            *transmission = 1.0;
        }
        glass.transparent = true;
        let glass = spawn(&mut scene, root, glass, -5.0);
        update_world_matrices(&mut scene, false);

        // --- 2. ACT ---
        let mut builder = RenderListBuilder::new();
        let lists = builder.build(&scene, root, &view());

        // --- 3. ASSERT ---
        let nodes = |bucket| lists.bucket(bucket).map(|i| i.node).collect::<Vec<_>>();
        assert_eq!(nodes(RenderBucket::Opaque), vec![opaque]);
        assert_eq!(nodes(RenderBucket::Transparent), vec![blended]);
        assert_eq!(nodes(RenderBucket::Transmissive), vec![glass]);
        assert_eq!(lists.len(), 3);
    }

    #[test]
    fn test_opaque_front_to_back_transparent_back_to_front() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let shared = scene.add_material(Material::basic(LinearRgba::WHITE));
        let geometry = scene.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
        let mut opaque = Vec::new();
        for z in [-20.0, -5.0, -10.0] {
            let node = scene.create_node();
            scene.set_position(node, Vec3::new(0.0, 0.0, z)).unwrap();
            scene.add_child(root, node).unwrap();
            scene.attach_drawable(node, geometry, shared).unwrap();
            opaque.push(node);
        }
        let far = spawn(&mut scene, root, transparent(LinearRgba::WHITE), -30.0);
        let near = spawn(&mut scene, root, transparent(LinearRgba::WHITE), -3.0);
        update_world_matrices(&mut scene, false);

        let mut builder = RenderListBuilder::new();
        let lists = builder.build(&scene, root, &view());

        let order: Vec<_> = lists.opaque().map(|i| i.node).collect();
        assert_eq!(order, vec![opaque[1], opaque[2], opaque[0]]);
        let order: Vec<_> = lists.transparent().map(|i| i.node).collect();
        assert_eq!(order, vec![far, near]);
    }

    #[test]
    fn test_render_order_dominates_depth() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let near = spawn(&mut scene, root, transparent(LinearRgba::WHITE), -2.0);
        let far = spawn(&mut scene, root, transparent(LinearRgba::WHITE), -50.0);
        scene.node_mut(far).unwrap().set_render_order(1);
        update_world_matrices(&mut scene, false);

        let mut builder = RenderListBuilder::new();
        let order: Vec<_> = builder
            .build(&scene, root, &view())
            .transparent()
            .map(|i| i.node)
            .collect();
        assert_eq!(order, vec![near, far]);
    }

    #[test]
    fn test_culling_and_visibility() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let visible = spawn(&mut scene, root, Material::basic(LinearRgba::WHITE), -5.0);
        let behind = spawn(&mut scene, root, Material::basic(LinearRgba::WHITE), 5.0);
        let never_culled = spawn(&mut scene, root, Material::basic(LinearRgba::WHITE), 5.0);
        scene.node_mut(never_culled).unwrap().set_frustum_culled(false);
        let hidden_parent = spawn(&mut scene, root, Material::basic(LinearRgba::WHITE), -5.0);
        let hidden_child = spawn(&mut scene, hidden_parent, Material::basic(LinearRgba::WHITE), 0.0);
        scene.set_visible(hidden_parent, false).unwrap();
        update_world_matrices(&mut scene, false);

        let mut builder = RenderListBuilder::new();
        let lists = builder.build(&scene, root, &view());
        let drawn: Vec<_> = lists.items().iter().map(|i| i.node).collect();

        assert_eq!(drawn, vec![visible, never_culled]);
        assert_eq!(lists.culled(), 1);
        assert!(!drawn.contains(&behind));
        assert!(!drawn.contains(&hidden_child));
    }

    #[test]
    fn test_unsorted_lists_keep_traversal_order() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let first = spawn(&mut scene, root, Material::basic(LinearRgba::WHITE), -20.0);
        let second = spawn(&mut scene, root, Material::basic(LinearRgba::WHITE), -2.0);
        update_world_matrices(&mut scene, false);

        let mut builder = RenderListBuilder::new();
        let order: Vec<_> = builder
            .build(&scene, root, &view().with_sorting(false))
            .opaque()
            .map(|i| i.node)
            .collect();
        assert_eq!(order, vec![first, second]);
    }

    #[test]
    fn test_shadow_casters_ignore_non_casters() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let caster = spawn(&mut scene, root, transparent(LinearRgba::WHITE), -5.0);
        spawn(&mut scene, root, Material::basic(LinearRgba::WHITE), -5.0);
        scene.node_mut(caster).unwrap().set_cast_shadow(true);
        update_world_matrices(&mut scene, false);

        let mut builder = RenderListBuilder::new();
        let lists = builder.collect_shadow_casters(&scene, root, &view());
        let casters: Vec<_> = lists.opaque().map(|i| i.node).collect();
        assert_eq!(casters, vec![caster]);
        assert_eq!(lists.transparent().len(), 0);
    }
}
