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

//! The scene graph: an arena of transform nodes plus the shared resources
//! their drawables reference.

use lumen_core::event::EventBus;
use lumen_core::material::Material;
use lumen_core::math::{Aabb, Mat4, Quaternion, Vec3};
use lumen_core::renderer::Light;
use lumen_core::scene::{GeometryId, ImageId, MaterialId, NodeId, ResourceHandle};
use slotmap::SlotMap;
use smallvec::SmallVec;

use super::events::{Disposal, SceneEvent};
use super::node::{Drawable, Node};
use crate::error::SceneError;
use crate::geometry::Geometry;
use crate::image::Image;

/// How a re-parented node's transform is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentingMode {
    /// The local transform is recomputed so the world pose does not change.
    #[default]
    PreserveWorld,
    /// The local transform is kept; the node moves with its new parent.
    KeepLocal,
}

/// What happens to the children of a destroyed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyMode {
    /// The whole subtree is destroyed.
    Recursive,
    /// Children move to the destroyed node's parent, keeping their world pose.
    ReparentChildren,
}

/// A resource shared by drawables.
#[derive(Debug)]
struct Shared<T> {
    value: T,
    /// Nodes whose drawable references the resource.
    users: SmallVec<[NodeId; 4]>,
    /// Cleared by `dispose_resource`. The entry is dropped once it is neither
    /// retained nor used.
    retained: bool,
}

impl<T> Shared<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            users: SmallVec::new(),
            retained: true,
        }
    }
}

/// Owns every node, geometry, material and image of a scene.
///
/// Nodes form a forest: each node has at most one parent (a non-owning
/// [`NodeId`]) and an ordered list of children. Destroying a node never leaves
/// a dangling child.
///
/// Transform setters are lazy: they only mark nodes dirty. World matrices are
/// recomputed by the transform propagation pass, and
/// [`SceneGraph::compute_world_bounds`] reads them, so call it after that pass.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    geometries: SlotMap<GeometryId, Shared<Geometry>>,
    materials: SlotMap<MaterialId, Shared<Material>>,
    images: SlotMap<ImageId, Shared<Image>>,
    disposals: Vec<Disposal>,
    events: EventBus<SceneEvent>,
}

impl SceneGraph {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Nodes
    // ─────────────────────────────────────────────────────────────────────

    /// Creates a root node with an identity transform.
    pub fn create_node(&mut self) -> NodeId {
        self.nodes.insert(Node::default())
    }

    /// Creates a named root node.
    pub fn create_named_node(&mut self, name: impl Into<String>) -> NodeId {
        let mut node = Node::default();
        node.name = Some(name.into());
        self.nodes.insert(node)
    }

    /// Returns a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Returns a node for editing its render flags.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Returns `true` if the node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the scene has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over every node without a parent.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
    }

    /// The children of a node, empty if the node does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |node| node.children())
    }

    /// Visits `root` and its descendants depth-first, parents before children,
    /// children in insertion order. Hidden nodes are visited too.
    pub fn traverse(&self, root: NodeId, mut visitor: impl FnMut(NodeId, &Node)) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            visitor(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Shows or hides a node and its subtree.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<(), SceneError> {
        self.get_mut(id)?.set_visible(visible);
        Ok(())
    }

    fn get(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transforms
    // ─────────────────────────────────────────────────────────────────────

    /// Sets the local position, rotation and scale. The matrices are
    /// recomputed lazily by the next propagation pass.
    pub fn set_local_transform(
        &mut self,
        id: NodeId,
        position: Vec3,
        rotation: Quaternion,
        scale: Vec3,
    ) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        node.position = position;
        node.rotation = rotation;
        node.scale = scale;
        node.local_dirty = true;
        Ok(())
    }

    /// Sets the local position.
    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        node.position = position;
        node.local_dirty = true;
        Ok(())
    }

    /// Sets the local rotation.
    pub fn set_rotation(&mut self, id: NodeId, rotation: Quaternion) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        node.rotation = rotation;
        node.local_dirty = true;
        Ok(())
    }

    /// Sets the local scale.
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        node.scale = scale;
        node.local_dirty = true;
        Ok(())
    }

    /// Sets the local matrix directly and turns off automatic local matrix
    /// updates for the node. Position, rotation and scale are refreshed from
    /// the matrix when it can be decomposed.
    pub fn set_local_matrix(&mut self, id: NodeId, matrix: Mat4) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        if let Some((scale, rotation, position)) = matrix.to_scale_rotation_translation() {
            node.scale = scale;
            node.rotation = rotation;
            node.position = position;
        }
        node.local_matrix = matrix;
        node.matrix_auto_update = false;
        node.local_dirty = false;
        node.world_dirty = true;
        Ok(())
    }

    /// Chooses whether the local matrix is recomputed from position/rotation/scale.
    pub fn set_matrix_auto_update(&mut self, id: NodeId, enabled: bool) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        node.matrix_auto_update = enabled;
        if enabled {
            node.local_dirty = true;
        }
        Ok(())
    }

    /// Computes a node's world matrix from its ancestor chain, regardless of
    /// whether propagation has run since the last change.
    pub fn world_matrix_now(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let node = self.get(id)?;
        let mut world = node.current_local_matrix();
        let mut current = node.parent;
        while let Some(parent_id) = current {
            let parent = &self.nodes[parent_id];
            world = parent.current_local_matrix() * world;
            current = parent.parent;
        }
        Ok(world)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Hierarchy
    // ─────────────────────────────────────────────────────────────────────

    /// Appends `child` to `parent`'s children, detaching it from its current
    /// parent first. The child's local transform is kept.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.attach(child, Some(parent), ParentingMode::KeepLocal)
    }

    /// Detaches `child` from `parent`, making it a root. Its local transform is kept.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.get(parent)?;
        if self.get(child)?.parent != Some(parent) {
            return Err(SceneError::NotAChild { parent, child });
        }
        self.detach_from_parent(child);
        Ok(())
    }

    /// Re-parents `child` under `parent` (or makes it a root for `None`),
    /// preserving its world pose.
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        self.attach(child, parent, ParentingMode::PreserveWorld)
    }

    /// Re-parents `child` with an explicit [`ParentingMode`].
    pub fn set_parent_with(
        &mut self,
        child: NodeId,
        parent: Option<NodeId>,
        mode: ParentingMode,
    ) -> Result<(), SceneError> {
        self.attach(child, parent, mode)
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn attach(
        &mut self,
        child: NodeId,
        new_parent: Option<NodeId>,
        mode: ParentingMode,
    ) -> Result<(), SceneError> {
        self.get(child)?;
        if let Some(parent) = new_parent {
            self.get(parent)?;
            if parent == child || self.is_ancestor_of(child, parent) {
                return Err(SceneError::CyclicParent { child, parent });
            }
        }
        if self.nodes[child].parent == new_parent {
            return Ok(());
        }

        let new_local = match mode {
            ParentingMode::KeepLocal => None,
            ParentingMode::PreserveWorld => {
                let child_world = self.world_matrix_now(child)?;
                let parent_world = match new_parent {
                    Some(parent) => self.world_matrix_now(parent)?,
                    None => Mat4::IDENTITY,
                };
                match parent_world.inverse() {
                    Some(inverse) => Some(inverse * child_world),
                    None => {
                        log::warn!("New parent of {child:?} has a singular world matrix; keeping its local transform.");
                        None
                    }
                }
            }
        };

        self.detach_from_parent(child);
        if let Some(parent) = new_parent {
            self.nodes[parent].children.push(child);
        }
        let node = &mut self.nodes[child];
        node.parent = new_parent;
        node.world_dirty = true;
        if let Some(local) = new_local {
            Self::apply_local_matrix(node, local);
        }

        if let Some(parent) = new_parent {
            self.mark_bounds_dirty(parent);
            self.events.publish(SceneEvent::ChildAdded { parent, child });
        }
        Ok(())
    }

    fn apply_local_matrix(node: &mut Node, local: Mat4) {
        node.local_matrix = local;
        node.local_dirty = false;
        node.world_dirty = true;
        if !node.matrix_auto_update {
            return;
        }
        match local.to_scale_rotation_translation() {
            Some((scale, rotation, position)) => {
                node.scale = scale;
                node.rotation = rotation;
                node.position = position;
            }
            None => {
                log::warn!("Re-parented node has a degenerate local matrix; switching it to a manual matrix.");
                node.matrix_auto_update = false;
            }
        }
    }

    fn detach_from_parent(&mut self, child: NodeId) {
        let Some(parent) = self.nodes[child].parent.take() else {
            return;
        };
        self.nodes[child].world_dirty = true;
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|c| *c != child);
        }
        self.mark_bounds_dirty(parent);
        self.events.publish(SceneEvent::ChildRemoved { parent, child });
    }

    /// Destroys a node. Its drawable releases its geometry and material.
    pub fn destroy_node(&mut self, id: NodeId, mode: DestroyMode) -> Result<(), SceneError> {
        self.get(id)?;
        match mode {
            DestroyMode::ReparentChildren => {
                let parent = self.nodes[id].parent;
                let children = self.nodes[id].children.clone();
                for child in children {
                    self.attach(child, parent, ParentingMode::PreserveWorld)?;
                }
                self.detach_from_parent(id);
                self.remove_single(id);
            }
            DestroyMode::Recursive => {
                self.detach_from_parent(id);
                let mut stack = vec![id];
                let mut subtree = Vec::new();
                while let Some(node) = stack.pop() {
                    subtree.push(node);
                    stack.extend(self.nodes[node].children.iter().copied());
                }
                // Children before parents.
                for node in subtree.into_iter().rev() {
                    self.remove_single(node);
                }
            }
        }
        Ok(())
    }

    fn remove_single(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(id) {
            if let Some(drawable) = node.drawable {
                self.release_geometry_user(drawable.geometry, id);
                self.release_material_user(drawable.material, id);
            }
            log::trace!("Destroyed node {id:?}.");
            self.events.publish(SceneEvent::NodeDestroyed(id));
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Drawables & lights
    // ─────────────────────────────────────────────────────────────────────

    /// Makes a node render `geometry` with `material`, replacing any previous drawable.
    pub fn attach_drawable(
        &mut self,
        node: NodeId,
        geometry: GeometryId,
        material: MaterialId,
    ) -> Result<(), SceneError> {
        self.attach_instanced_drawable(node, geometry, material, 1)
    }

    /// Like [`SceneGraph::attach_drawable`], drawing `instance_count` instances per call.
    pub fn attach_instanced_drawable(
        &mut self,
        node: NodeId,
        geometry: GeometryId,
        material: MaterialId,
        instance_count: u32,
    ) -> Result<(), SceneError> {
        let previous = self.get(node)?.drawable;
        if !self.geometries.contains_key(geometry) {
            return Err(SceneError::GeometryNotFound(geometry));
        }
        if !self.materials.contains_key(material) {
            return Err(SceneError::MaterialNotFound(material));
        }

        if previous.map(|d| d.geometry) != Some(geometry) {
            self.geometries[geometry].users.push(node);
            if let Some(previous) = previous {
                self.release_geometry_user(previous.geometry, node);
            }
        }
        if previous.map(|d| d.material) != Some(material) {
            self.materials[material].users.push(node);
            if let Some(previous) = previous {
                self.release_material_user(previous.material, node);
            }
        }

        self.nodes[node].drawable = Some(Drawable {
            geometry,
            material,
            instance_count,
        });
        self.mark_bounds_dirty(node);
        Ok(())
    }

    /// Removes a node's drawable, releasing its geometry and material.
    pub fn detach_drawable(&mut self, node: NodeId) -> Result<Option<Drawable>, SceneError> {
        let drawable = self.get_mut(node)?.drawable.take();
        if let Some(drawable) = drawable {
            self.release_geometry_user(drawable.geometry, node);
            self.release_material_user(drawable.material, node);
            self.mark_bounds_dirty(node);
        }
        Ok(drawable)
    }

    /// Attaches a light to a node, replacing any previous light.
    pub fn attach_light(&mut self, node: NodeId, light: Light) -> Result<(), SceneError> {
        self.get_mut(node)?.light = Some(light);
        Ok(())
    }

    /// Removes a node's light.
    pub fn detach_light(&mut self, node: NodeId) -> Result<Option<Light>, SceneError> {
        Ok(self.get_mut(node)?.light.take())
    }

    fn release_geometry_user(&mut self, id: GeometryId, node: NodeId) {
        let Some(entry) = self.geometries.get_mut(id) else {
            return;
        };
        entry.users.retain(|user| *user != node);
        if entry.users.is_empty() && !entry.retained {
            if let Some(entry) = self.geometries.remove(id) {
                log::debug!("Geometry {id:?} released by its last drawable.");
                self.disposals.push(Disposal::Geometry {
                    id,
                    sources: entry.value.buffer_sources(),
                });
            }
        }
    }

    fn release_material_user(&mut self, id: MaterialId, node: NodeId) {
        let Some(entry) = self.materials.get_mut(id) else {
            return;
        };
        entry.users.retain(|user| *user != node);
        if entry.users.is_empty() && !entry.retained {
            self.materials.remove(id);
            log::debug!("Material {id:?} released by its last drawable.");
            self.disposals.push(Disposal::Material(id));
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resources
    // ─────────────────────────────────────────────────────────────────────

    /// Stores a geometry.
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.insert(Shared::new(geometry))
    }

    /// Returns a geometry.
    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id).map(|entry| &entry.value)
    }

    /// Returns a geometry for editing. The world bounds of every node drawing
    /// it are invalidated.
    pub fn geometry_mut(&mut self, id: GeometryId) -> Option<&mut Geometry> {
        let users = self.geometries.get(id)?.users.clone();
        for user in users {
            self.mark_bounds_dirty(user);
        }
        self.geometries.get_mut(id).map(|entry| &mut entry.value)
    }

    /// The number of drawables referencing a geometry.
    pub fn geometry_users(&self, id: GeometryId) -> usize {
        self.geometries.get(id).map_or(0, |entry| entry.users.len())
    }

    /// Stores a material.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(Shared::new(material))
    }

    /// Returns a material.
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id).map(|entry| &entry.value)
    }

    /// Returns a material for editing.
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id).map(|entry| &mut entry.value)
    }

    /// The number of drawables referencing a material.
    pub fn material_users(&self, id: MaterialId) -> usize {
        self.materials.get(id).map_or(0, |entry| entry.users.len())
    }

    /// Stores an image.
    pub fn add_image(&mut self, image: Image) -> ImageId {
        self.images.insert(Shared::new(image))
    }

    /// Returns an image.
    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.images.get(id).map(|entry| &entry.value)
    }

    /// Returns an image for editing.
    pub fn image_mut(&mut self, id: ImageId) -> Option<&mut Image> {
        self.images.get_mut(id).map(|entry| &mut entry.value)
    }

    /// Releases the GPU objects of a resource at the start of the next frame.
    ///
    /// The CPU data stays available while drawables still reference it, and
    /// is dropped when the last one lets go; drawing it again re-uploads it.
    /// Images are dropped immediately.
    pub fn dispose_resource(&mut self, handle: ResourceHandle) -> Result<(), SceneError> {
        match handle {
            ResourceHandle::Geometry(id) => {
                let entry = self
                    .geometries
                    .get_mut(id)
                    .ok_or(SceneError::GeometryNotFound(id))?;
                if !entry.retained {
                    return Err(SceneError::AlreadyDisposed);
                }
                entry.retained = false;
                let sources = entry.value.buffer_sources();
                if entry.users.is_empty() {
                    self.geometries.remove(id);
                }
                self.disposals.push(Disposal::Geometry { id, sources });
            }
            ResourceHandle::Material(id) => {
                let entry = self
                    .materials
                    .get_mut(id)
                    .ok_or(SceneError::MaterialNotFound(id))?;
                if !entry.retained {
                    return Err(SceneError::AlreadyDisposed);
                }
                entry.retained = false;
                if entry.users.is_empty() {
                    self.materials.remove(id);
                }
                self.disposals.push(Disposal::Material(id));
            }
            ResourceHandle::Image(id) => {
                self.images.remove(id).ok_or(SceneError::ImageNotFound(id))?;
                self.disposals.push(Disposal::Image(id));
            }
        }
        log::debug!("Disposed {handle:?}.");
        self.events.publish(SceneEvent::ResourceDisposed(handle));
        Ok(())
    }

    /// Drains the GPU disposals queued since the last call.
    pub fn take_disposals(&mut self) -> Vec<Disposal> {
        std::mem::take(&mut self.disposals)
    }

    /// Subscribes to structural change events.
    pub fn subscribe(&mut self) -> flume::Receiver<SceneEvent> {
        self.events.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Bounds
    // ─────────────────────────────────────────────────────────────────────

    /// Invalidates the cached world bounds of a node and its ancestors.
    ///
    /// A node with dirty bounds always has dirty ancestors, so the walk stops
    /// at the first node that is already dirty.
    pub fn mark_bounds_dirty(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.nodes.get_mut(node_id) else {
                break;
            };
            if node.bounds_dirty {
                break;
            }
            node.bounds_dirty = true;
            current = node.parent;
        }
    }

    /// The union of the node's transformed geometry bounds and those of all
    /// its descendants, or `None` if the subtree has no positioned geometry.
    ///
    /// The result is cached per node until a descendant's geometry or world
    /// matrix changes.
    pub fn compute_world_bounds(&mut self, id: NodeId) -> Result<Option<Aabb>, SceneError> {
        let node = self.get(id)?;
        if !node.bounds_dirty {
            return Ok(node.world_bounds);
        }

        let own = node
            .drawable
            .and_then(|d| self.geometry(d.geometry))
            .and_then(Geometry::bounding_box)
            .map(|aabb| aabb.transform(&node.world_matrix));
        let children = node.children.clone();

        let mut bounds = own;
        for child in children {
            if let Some(child_bounds) = self.compute_world_bounds(child)? {
                bounds = Some(bounds.map_or(child_bounds, |b| b.merge(&child_bounds)));
            }
        }

        let node = &mut self.nodes[id];
        node.world_bounds = bounds;
        node.bounds_dirty = false;
        Ok(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::shapes;
    use approx::assert_abs_diff_eq;
    use lumen_core::math::{LinearRgba, FRAC_PI_2};

    fn drawable_scene() -> (SceneGraph, GeometryId, MaterialId) {
        let mut scene = SceneGraph::new();
        let geometry = scene.add_geometry(shapes::cuboid(2.0, 2.0, 2.0));
        let material = scene.add_material(Material::basic(LinearRgba::WHITE));
        (scene, geometry, material)
    }

    #[test]
    fn test_named_node_has_default_flags() {
        let mut scene = SceneGraph::new();
        let id = scene.create_named_node("pivot");

        let node = scene.node(id).unwrap();
        assert_eq!(node.name(), Some("pivot"));
        assert!(node.is_visible());
        assert!(node.is_frustum_culled());
        assert!(!node.casts_shadow());
        assert_eq!(node.render_order(), 0);
        assert_eq!(node.parent(), None);
    }

    #[test]
    fn test_cyclic_parenting_is_rejected() {
        let mut scene = SceneGraph::new();
        let a = scene.create_node();
        let b = scene.create_node();
        let c = scene.create_node();
        scene.add_child(a, b).unwrap();
        scene.add_child(b, c).unwrap();

        assert_eq!(
            scene.add_child(c, a),
            Err(SceneError::CyclicParent { child: a, parent: c })
        );
        assert_eq!(
            scene.set_parent(a, Some(a)),
            Err(SceneError::CyclicParent { child: a, parent: a })
        );
        // The hierarchy is untouched.
        assert_eq!(scene.node(a).unwrap().parent(), None);
        assert_eq!(scene.children(c), &[] as &[NodeId]);
    }

    #[test]
    fn test_traverse_visits_parents_first_in_child_order() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let a = scene.create_node();
        let b = scene.create_node();
        let a1 = scene.create_node();
        scene.add_child(root, a).unwrap();
        scene.add_child(root, b).unwrap();
        scene.add_child(a, a1).unwrap();

        let mut visited = Vec::new();
        scene.traverse(root, |id, _| visited.push(id));
        assert_eq!(visited, vec![root, a, a1, b]);
    }

    #[test]
    fn test_add_child_detaches_from_previous_parent() {
        let mut scene = SceneGraph::new();
        let a = scene.create_node();
        let b = scene.create_node();
        let child = scene.create_node();
        scene.add_child(a, child).unwrap();
        scene.add_child(b, child).unwrap();

        assert!(scene.children(a).is_empty());
        assert_eq!(scene.children(b), &[child]);
        assert_eq!(scene.node(child).unwrap().parent(), Some(b));
    }

    #[test]
    fn test_remove_child_requires_parent_relationship() {
        let mut scene = SceneGraph::new();
        let a = scene.create_node();
        let b = scene.create_node();
        assert_eq!(
            scene.remove_child(a, b),
            Err(SceneError::NotAChild { parent: a, child: b })
        );
        scene.add_child(a, b).unwrap();
        scene.remove_child(a, b).unwrap();
        assert_eq!(scene.roots().count(), 2);
    }

    #[test]
    fn test_set_parent_preserves_world_pose() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_node();
        scene
            .set_local_transform(
                parent,
                Vec3::new(5.0, 0.0, 0.0),
                Quaternion::from_axis_angle(Vec3::Y, FRAC_PI_2),
                Vec3::splat(2.0),
            )
            .unwrap();
        let child = scene.create_node();
        scene.set_position(child, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let before = scene.world_matrix_now(child).unwrap();

        scene.set_parent(child, Some(parent)).unwrap();

        assert_abs_diff_eq!(scene.world_matrix_now(child).unwrap(), before, epsilon = 1e-4);
        assert_ne!(scene.node(child).unwrap().position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_keep_local_moves_with_parent() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_node();
        scene.set_position(parent, Vec3::new(5.0, 0.0, 0.0)).unwrap();
        let child = scene.create_node();
        scene.set_position(child, Vec3::X).unwrap();

        scene
            .set_parent_with(child, Some(parent), ParentingMode::KeepLocal)
            .unwrap();

        assert_abs_diff_eq!(
            scene.world_matrix_now(child).unwrap().translation(),
            Vec3::new(6.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_destroy_recursive_releases_resources() {
        let (mut scene, geometry, material) = drawable_scene();
        let root = scene.create_node();
        let child = scene.create_node();
        scene.add_child(root, child).unwrap();
        scene.attach_drawable(child, geometry, material).unwrap();
        assert_eq!(scene.geometry_users(geometry), 1);

        scene.destroy_node(root, DestroyMode::Recursive).unwrap();

        assert!(scene.is_empty());
        assert_eq!(scene.geometry_users(geometry), 0);
        // Still retained by the application.
        assert!(scene.geometry(geometry).is_some());
        assert!(scene.take_disposals().is_empty());
    }

    #[test]
    fn test_destroy_reparents_children_in_place() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let middle = scene.create_node();
        let leaf = scene.create_node();
        scene.set_position(middle, Vec3::new(0.0, 3.0, 0.0)).unwrap();
        scene.set_position(leaf, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        scene.add_child(root, middle).unwrap();
        scene.add_child(middle, leaf).unwrap();
        let before = scene.world_matrix_now(leaf).unwrap();

        scene.destroy_node(middle, DestroyMode::ReparentChildren).unwrap();

        assert!(!scene.contains(middle));
        assert_eq!(scene.node(leaf).unwrap().parent(), Some(root));
        assert_eq!(scene.children(root), &[leaf]);
        assert_abs_diff_eq!(scene.world_matrix_now(leaf).unwrap(), before);
    }

    #[test]
    fn test_disposed_geometry_lives_until_last_user_releases_it() {
        let (mut scene, geometry, material) = drawable_scene();
        let node = scene.create_node();
        scene.attach_drawable(node, geometry, material).unwrap();

        scene.dispose_resource(geometry.into()).unwrap();
        assert!(scene.geometry(geometry).is_some());
        assert_eq!(scene.take_disposals().len(), 1);
        assert_eq!(
            scene.dispose_resource(geometry.into()),
            Err(SceneError::AlreadyDisposed)
        );

        scene.detach_drawable(node).unwrap();
        assert!(scene.geometry(geometry).is_none());
        assert!(matches!(
            scene.take_disposals().as_slice(),
            [Disposal::Geometry { id, sources }] if *id == geometry && sources.len() == 4
        ));
    }

    #[test]
    fn test_replacing_drawable_with_same_geometry_keeps_single_user() {
        let (mut scene, geometry, material) = drawable_scene();
        let other_material = scene.add_material(Material::basic(LinearRgba::BLACK));
        let node = scene.create_node();
        scene.attach_drawable(node, geometry, material).unwrap();
        scene.attach_drawable(node, geometry, other_material).unwrap();

        assert_eq!(scene.geometry_users(geometry), 1);
        assert_eq!(scene.material_users(material), 0);
        assert_eq!(scene.material_users(other_material), 1);
    }

    #[test]
    fn test_structural_events_are_published() {
        let mut scene = SceneGraph::new();
        let events = scene.subscribe();
        let a = scene.create_node();
        let b = scene.create_node();
        scene.add_child(a, b).unwrap();
        scene.destroy_node(a, DestroyMode::Recursive).unwrap();

        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                SceneEvent::ChildAdded { parent: a, child: b },
                SceneEvent::NodeDestroyed(b),
                SceneEvent::NodeDestroyed(a),
            ]
        );
    }

    #[test]
    fn test_world_bounds_union_and_invalidation() {
        let (mut scene, geometry, material) = drawable_scene();
        let root = scene.create_node();
        let child = scene.create_node();
        scene.add_child(root, child).unwrap();
        scene.attach_drawable(root, geometry, material).unwrap();
        scene.attach_drawable(child, geometry, material).unwrap();
        // Child world matrix: translated by 10 on X.
        let world = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        scene.nodes[child].apply_world_matrix(world);
        scene.nodes[root].apply_world_matrix(Mat4::IDENTITY);

        let bounds = scene.compute_world_bounds(root).unwrap().unwrap();
        assert_abs_diff_eq!(bounds.min, Vec3::new(-1.0, -1.0, -1.0));
        assert_abs_diff_eq!(bounds.max, Vec3::new(11.0, 1.0, 1.0));

        // Cached until something changes.
        assert!(!scene.nodes[root].bounds_dirty);
        if let Some(geometry) = scene.geometry_mut(geometry) {
            geometry.set_draw_range(0, None);
        }
        assert!(scene.nodes[root].bounds_dirty);
        assert!(scene.nodes[child].bounds_dirty);
    }
}
