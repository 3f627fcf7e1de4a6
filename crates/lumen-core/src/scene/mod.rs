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

//! Handle types for objects stored in the scene graph.
//!
//! They live here, rather than next to the scene graph, so that materials can
//! name the images they sample and the renderer can key its caches by them.

slotmap::new_key_type! {
    /// A transform node in the scene graph.
    pub struct NodeId;
    /// A geometry shared by drawables.
    pub struct GeometryId;
    /// A material shared by drawables.
    pub struct MaterialId;
    /// A CPU-side image sampled by materials.
    pub struct ImageId;
}

/// Any resource that can be released early with `dispose_resource`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceHandle {
    /// A geometry.
    Geometry(GeometryId),
    /// A material.
    Material(MaterialId),
    /// An image.
    Image(ImageId),
}

impl From<GeometryId> for ResourceHandle {
    fn from(id: GeometryId) -> Self {
        ResourceHandle::Geometry(id)
    }
}

impl From<MaterialId> for ResourceHandle {
    fn from(id: MaterialId) -> Self {
        ResourceHandle::Material(id)
    }
}

impl From<ImageId> for ResourceHandle {
    fn from(id: ImageId) -> Self {
        ResourceHandle::Image(id)
    }
}
