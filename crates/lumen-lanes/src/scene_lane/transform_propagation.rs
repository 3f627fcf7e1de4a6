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

use lumen_core::scene::NodeId;
use lumen_data::SceneGraph;
use smallvec::SmallVec;

/// What a call to [`update_world_matrices`] recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformUpdateStats {
    /// Local matrices rebuilt from position, rotation and scale.
    pub local_recomputed: u32,
    /// World matrices rebuilt.
    pub world_recomputed: u32,
}

/// Propagates local transform changes down the scene hierarchy, leaving every
/// node with `world = parent.world * local` (`world = local` at a root).
///
/// The traversal is depth-first from every root. A node's world matrix is
/// final before any of its children is visited, and a subtree is only
/// recomputed when the node or one of its ancestors changed, unless `force`
/// is set. Running it twice without mutations recomputes nothing.
///
/// Nodes whose world matrix changed get their cached world bounds invalidated.
pub fn update_world_matrices(scene: &mut SceneGraph, force: bool) -> TransformUpdateStats {
    let mut stats = TransformUpdateStats::default();

    // Stage 1: Seed the stack with every root. The flag tells whether the
    // parent's world matrix changed during this pass.
    let mut stack: Vec<(NodeId, bool)> = scene.roots().map(|id| (id, force)).collect();

    // Stage 2: Depth-first traversal. Children are pushed only after the
    // node's own world matrix is written.
    while let Some((id, parent_changed)) = stack.pop() {
        let parent_world = scene
            .node(id)
            .and_then(|node| node.parent())
            .and_then(|parent| scene.node(parent))
            .map(|parent| parent.world_matrix());
        let Some(node) = scene.node_mut(id) else {
            continue;
        };

        let dirty = node.is_transform_dirty();
        if node.refresh_local_matrix() {
            stats.local_recomputed += 1;
        }

        let changed = parent_changed || dirty;
        if changed {
            let world = match parent_world {
                Some(parent_world) => parent_world * node.local_matrix(),
                None => node.local_matrix(),
            };
            node.apply_world_matrix(world);
            stats.world_recomputed += 1;
        }

        // Reversed so the first child is popped first.
        let children: SmallVec<[NodeId; 8]> = node.children().iter().rev().copied().collect();
        if changed {
            scene.mark_bounds_dirty(id);
        }
        stack.extend(children.into_iter().map(|child| (child, changed)));
    }

    log::trace!(
        "Transform propagation: {} local, {} world matrices recomputed.",
        stats.local_recomputed,
        stats.world_recomputed
    );
    stats
}
