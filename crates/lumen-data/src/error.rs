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

//! Errors raised synchronously by scene graph operations.

use lumen_core::scene::{GeometryId, ImageId, MaterialId, NodeId};
use thiserror::Error;

/// An error returned by a [`SceneGraph`](crate::scene::SceneGraph) operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The node does not exist or was destroyed.
    #[error("node {0:?} does not exist")]
    NodeNotFound(NodeId),
    /// The geometry does not exist or was released.
    #[error("geometry {0:?} does not exist")]
    GeometryNotFound(GeometryId),
    /// The material does not exist or was released.
    #[error("material {0:?} does not exist")]
    MaterialNotFound(MaterialId),
    /// The image does not exist or was released.
    #[error("image {0:?} does not exist")]
    ImageNotFound(ImageId),
    /// The requested parent is the node itself or one of its descendants.
    #[error("parenting {child:?} under {parent:?} would create a cycle")]
    CyclicParent {
        /// The node being re-parented.
        child: NodeId,
        /// The requested parent.
        parent: NodeId,
    },
    /// `remove_child` was called with a node that is not a child of `parent`.
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild {
        /// The expected parent.
        parent: NodeId,
        /// The node that was not found among its children.
        child: NodeId,
    },
    /// The resource was already disposed.
    #[error("resource was already disposed")]
    AlreadyDisposed,
}
