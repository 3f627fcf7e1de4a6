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

//! Structural change notifications and deferred GPU disposals.

use lumen_core::scene::{GeometryId, ImageId, MaterialId, NodeId, ResourceHandle};
use smallvec::SmallVec;

use crate::geometry::BufferSourceId;

/// A structural change in the scene graph, delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// `child` was attached under `parent`.
    ChildAdded {
        /// The new parent.
        parent: NodeId,
        /// The attached node.
        child: NodeId,
    },
    /// `child` was detached from `parent`.
    ChildRemoved {
        /// The former parent.
        parent: NodeId,
        /// The detached node.
        child: NodeId,
    },
    /// The node was destroyed.
    NodeDestroyed(NodeId),
    /// The GPU objects of a resource were released.
    ResourceDisposed(ResourceHandle),
}

/// GPU objects the renderer must release at the start of its next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposal {
    /// The buffers of a geometry.
    Geometry {
        /// The geometry.
        id: GeometryId,
        /// The CPU identities of its arrays.
        sources: SmallVec<[BufferSourceId; 8]>,
    },
    /// The program binding of a material.
    Material(MaterialId),
    /// The texture of an image.
    Image(ImageId),
}
