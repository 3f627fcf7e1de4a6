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

//! The transform node stored in the scene graph arena.

use lumen_core::math::{Aabb, Mat4, Quaternion, Vec3};
use lumen_core::renderer::Light;
use lumen_core::scene::{GeometryId, MaterialId, NodeId};
use smallvec::SmallVec;

/// A geometry and material rendered with a node's world matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drawable {
    /// The shared geometry.
    pub geometry: GeometryId,
    /// The shared material.
    pub material: MaterialId,
    /// Instances drawn in one call. `0` draws nothing.
    pub instance_count: u32,
}

/// A node of the scene tree.
///
/// Transform and hierarchy fields change only through
/// [`SceneGraph`](super::SceneGraph), which keeps dirty flags and cached
/// bounds coherent. Render flags can be changed directly through
/// [`SceneGraph::node_mut`](super::SceneGraph::node_mut).
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: Option<String>,
    pub(crate) position: Vec3,
    pub(crate) rotation: Quaternion,
    pub(crate) scale: Vec3,
    pub(crate) local_matrix: Mat4,
    pub(crate) world_matrix: Mat4,
    pub(crate) local_dirty: bool,
    pub(crate) world_dirty: bool,
    pub(crate) matrix_auto_update: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: SmallVec<[NodeId; 4]>,
    pub(crate) drawable: Option<Drawable>,
    pub(crate) light: Option<Light>,
    pub(crate) world_bounds: Option<Aabb>,
    pub(crate) bounds_dirty: bool,
    visible: bool,
    render_order: i32,
    frustum_culled: bool,
    cast_shadow: bool,
    receive_shadow: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: None,
            position: Vec3::ZERO,
            rotation: Quaternion::IDENTITY,
            scale: Vec3::ONE,
            local_matrix: Mat4::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            local_dirty: false,
            world_dirty: true,
            matrix_auto_update: true,
            parent: None,
            children: SmallVec::new(),
            drawable: None,
            light: None,
            world_bounds: None,
            bounds_dirty: true,
            visible: true,
            render_order: 0,
            frustum_culled: true,
            cast_shadow: false,
            receive_shadow: false,
        }
    }
}

impl Node {
    /// The debug name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The local position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// The local rotation.
    pub fn rotation(&self) -> Quaternion {
        self.rotation
    }

    /// The local scale.
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// The cached local matrix. Stale until the next world matrix update if the
    /// transform changed.
    pub fn local_matrix(&self) -> Mat4 {
        self.local_matrix
    }

    /// The cached world matrix, valid after the last world matrix update.
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// The parent, or `None` for a root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The ordered children.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The attached drawable.
    pub fn drawable(&self) -> Option<&Drawable> {
        self.drawable.as_ref()
    }

    /// The attached light.
    pub fn light(&self) -> Option<&Light> {
        self.light.as_ref()
    }

    /// Whether the local matrix is recomputed from position/rotation/scale.
    pub fn matrix_auto_update(&self) -> bool {
        self.matrix_auto_update
    }

    // --- Render flags ---

    /// Invisible nodes are skipped together with their whole subtree.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the node and its subtree.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Draw order override. Lower values are drawn first within a bucket.
    pub fn render_order(&self) -> i32 {
        self.render_order
    }

    /// Sets the draw order override.
    pub fn set_render_order(&mut self, render_order: i32) {
        self.render_order = render_order;
    }

    /// Whether the node is tested against the view frustum.
    pub fn is_frustum_culled(&self) -> bool {
        self.frustum_culled
    }

    /// Enables or disables frustum culling for the node.
    pub fn set_frustum_culled(&mut self, frustum_culled: bool) {
        self.frustum_culled = frustum_culled;
    }

    /// Whether the drawable is rendered into shadow maps.
    pub fn casts_shadow(&self) -> bool {
        self.cast_shadow
    }

    /// Sets whether the drawable is rendered into shadow maps.
    pub fn set_cast_shadow(&mut self, cast_shadow: bool) {
        self.cast_shadow = cast_shadow;
    }

    /// Whether the drawable is darkened by shadow maps.
    pub fn receives_shadow(&self) -> bool {
        self.receive_shadow
    }

    /// Sets whether the drawable is darkened by shadow maps.
    pub fn set_receive_shadow(&mut self, receive_shadow: bool) {
        self.receive_shadow = receive_shadow;
    }

    // --- Propagation ---

    /// Returns `true` if the node's own transform changed since the last update.
    pub fn is_transform_dirty(&self) -> bool {
        self.local_dirty || self.world_dirty
    }

    /// Recomputes the local matrix from position/rotation/scale if it is stale.
    ///
    /// ## Returns
    /// `true` if the matrix was recomputed.
    pub fn refresh_local_matrix(&mut self) -> bool {
        if !self.local_dirty {
            return false;
        }
        self.local_dirty = false;
        if !self.matrix_auto_update {
            return false;
        }
        self.local_matrix =
            Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
        true
    }

    /// Stores a freshly computed world matrix and clears the world dirty flag.
    ///
    /// Called by transform propagation once the parent's matrix is final.
    pub fn apply_world_matrix(&mut self, world_matrix: Mat4) {
        self.world_matrix = world_matrix;
        self.world_dirty = false;
    }

    /// The local matrix as it would be after a refresh, without mutating the node.
    pub(crate) fn current_local_matrix(&self) -> Mat4 {
        if self.local_dirty && self.matrix_auto_update {
            Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
        } else {
            self.local_matrix
        }
    }
}
