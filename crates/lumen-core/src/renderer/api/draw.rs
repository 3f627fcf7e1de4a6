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

//! Draw call description.

use super::IndexFormat;

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Every three vertices form a triangle.
    #[default]
    Triangles,
    /// Every two vertices form a line.
    Lines,
    /// Each vertex is a point.
    Points,
}

/// A single draw submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// The primitive topology.
    pub topology: PrimitiveTopology,
    /// The first vertex (or index) to draw.
    pub first: u32,
    /// The number of vertices (or indices) to draw.
    pub count: u32,
    /// The number of instances. `1` is a regular draw.
    pub instance_count: u32,
    /// `Some` for an indexed draw using the bound index buffer.
    pub index_format: Option<IndexFormat>,
}

impl DrawCall {
    /// Number of primitives this call produces, across all instances.
    pub fn primitive_count(&self) -> u64 {
        let per_instance = match self.topology {
            PrimitiveTopology::Triangles => self.count / 3,
            PrimitiveTopology::Lines => self.count / 2,
            PrimitiveTopology::Points => self.count,
        };
        per_instance as u64 * self.instance_count as u64
    }
}
