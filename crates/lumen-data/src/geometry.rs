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

//! The geometry store: named vertex attributes, an optional index, and lazily
//! computed bounding volumes.
//!
//! Every attribute and index array carries a process-unique
//! [`BufferSourceId`] and its own version. The renderer keys GPU buffers by the
//! source id and re-uploads them when the version moves past the one it last
//! synchronized. Bounding volumes are cached against the geometry version and
//! recomputed on first access after any mutation.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use lumen_core::math::{Aabb, Sphere, Vec3};
use lumen_core::renderer::{IndexFormat, PrimitiveTopology};
use smallvec::SmallVec;

/// The attribute holding vertex positions. Bounds are computed from it.
pub const POSITION: &str = "position";
/// The attribute holding vertex normals.
pub const NORMAL: &str = "normal";
/// The attribute holding texture coordinates.
pub const UV: &str = "uv";
/// The attribute holding vertex colors.
pub const COLOR: &str = "color";

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// The CPU-side identity of an attribute or index array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferSourceId(u64);

impl BufferSourceId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        Self(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

// --- Attributes ---

/// A typed array of attribute components.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    /// 32-bit floats.
    F32(Vec<f32>),
    /// 32-bit unsigned integers.
    U32(Vec<u32>),
    /// 16-bit unsigned integers.
    U16(Vec<u16>),
    /// 8-bit unsigned integers.
    U8(Vec<u8>),
}

impl AttributeData {
    /// The number of components.
    pub fn len(&self) -> usize {
        match self {
            AttributeData::F32(v) => v.len(),
            AttributeData::U32(v) => v.len(),
            AttributeData::U16(v) => v.len(),
            AttributeData::U8(v) => v.len(),
        }
    }

    /// Returns `true` if there are no components.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw bytes, as uploaded to the GPU.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeData::F32(v) => bytemuck::cast_slice(v),
            AttributeData::U32(v) => bytemuck::cast_slice(v),
            AttributeData::U16(v) => bytemuck::cast_slice(v),
            AttributeData::U8(v) => v,
        }
    }
}

impl From<Vec<f32>> for AttributeData {
    fn from(v: Vec<f32>) -> Self {
        AttributeData::F32(v)
    }
}

impl From<Vec<u32>> for AttributeData {
    fn from(v: Vec<u32>) -> Self {
        AttributeData::U32(v)
    }
}

impl From<Vec<u16>> for AttributeData {
    fn from(v: Vec<u16>) -> Self {
        AttributeData::U16(v)
    }
}

impl From<Vec<u8>> for AttributeData {
    fn from(v: Vec<u8>) -> Self {
        AttributeData::U8(v)
    }
}

/// A vertex attribute: components grouped into items of `item_size`.
#[derive(Debug, PartialEq)]
pub struct Attribute {
    data: AttributeData,
    item_size: u32,
    normalized: bool,
    source: BufferSourceId,
    version: u64,
}

impl Attribute {
    /// Creates an attribute. `item_size` is the number of components per vertex.
    ///
    /// # Panics
    /// Panics if `item_size` is zero.
    pub fn new(data: impl Into<AttributeData>, item_size: u32) -> Self {
        assert!(item_size > 0, "attribute item size must be at least 1");
        Self {
            data: data.into(),
            item_size,
            normalized: false,
            source: BufferSourceId::next(),
            version: 0,
        }
    }

    /// Marks integer data as normalized to `[0, 1]` when read by the shader.
    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// The number of vertices.
    pub fn count(&self) -> u32 {
        (self.data.len() / self.item_size as usize) as u32
    }

    /// The components.
    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    /// Mutable access to the components. Bumps the version.
    pub fn data_mut(&mut self) -> &mut AttributeData {
        self.version += 1;
        &mut self.data
    }

    /// Replaces the components. Bumps the version.
    pub fn set_data(&mut self, data: impl Into<AttributeData>) {
        self.data = data.into();
        self.version += 1;
    }

    /// Components per vertex.
    pub fn item_size(&self) -> u32 {
        self.item_size
    }

    /// Whether integer components are normalized.
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// The CPU-side identity used as the GPU buffer key.
    pub fn source(&self) -> BufferSourceId {
        self.source
    }

    /// The mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Iterates over items as points. Empty unless the data is `F32` with at least three components per item.
    pub fn points(&self) -> impl Iterator<Item = Vec3> + '_ {
        let floats: &[f32] = match &self.data {
            AttributeData::F32(v) if self.item_size >= 3 => v,
            _ => &[],
        };
        floats
            .chunks_exact(self.item_size as usize)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
    }
}

impl Clone for Attribute {
    /// The clone is a new array with its own GPU buffer.
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            item_size: self.item_size,
            normalized: self.normalized,
            source: BufferSourceId::next(),
            version: 0,
        }
    }
}

// --- Index ---

/// Element indices.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexData {
    /// 16-bit indices.
    U16(Vec<u16>),
    /// 32-bit indices.
    U32(Vec<u32>),
}

/// An index array.
#[derive(Debug, PartialEq)]
pub struct Index {
    data: IndexData,
    source: BufferSourceId,
    version: u64,
}

impl Index {
    /// Creates an index array.
    pub fn new(data: IndexData) -> Self {
        Self {
            data,
            source: BufferSourceId::next(),
            version: 0,
        }
    }

    /// The number of indices.
    pub fn count(&self) -> u32 {
        match &self.data {
            IndexData::U16(v) => v.len() as u32,
            IndexData::U32(v) => v.len() as u32,
        }
    }

    /// The element format.
    pub fn format(&self) -> IndexFormat {
        match self.data {
            IndexData::U16(_) => IndexFormat::Uint16,
            IndexData::U32(_) => IndexFormat::Uint32,
        }
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            IndexData::U16(v) => bytemuck::cast_slice(v),
            IndexData::U32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Replaces the indices. Bumps the version.
    pub fn set_data(&mut self, data: IndexData) {
        self.data = data;
        self.version += 1;
    }

    /// The indices.
    pub fn data(&self) -> &IndexData {
        &self.data
    }

    /// The CPU-side identity used as the GPU buffer key.
    pub fn source(&self) -> BufferSourceId {
        self.source
    }

    /// The mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl Clone for Index {
    fn clone(&self) -> Self {
        Self::new(self.data.clone())
    }
}

// --- Geometry ---

/// Limits the submitted element range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawRange {
    /// The first element.
    pub start: u32,
    /// The number of elements, or everything after `start` for `None`.
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
struct CachedBounds {
    version: u64,
    aabb: Option<Aabb>,
    sphere: Option<Sphere>,
}

/// Vertex data shared by drawables.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    attributes: BTreeMap<String, Attribute>,
    index: Option<Index>,
    topology: PrimitiveTopology,
    draw_range: DrawRange,
    version: u64,
    bounds: Cell<Option<CachedBounds>>,
}

impl Geometry {
    /// Creates an empty triangle geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, returning `self` for chaining.
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.set_attribute(name, attribute);
        self
    }

    /// Sets the index, returning `self` for chaining.
    pub fn with_index(mut self, index: IndexData) -> Self {
        self.set_index(Some(Index::new(index)));
        self
    }

    /// Sets the topology, returning `self` for chaining.
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Inserts or replaces an attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, attribute: Attribute) {
        self.attributes.insert(name.into(), attribute);
        self.version += 1;
    }

    /// Removes an attribute.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        let removed = self.attributes.remove(name);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    /// Returns an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Mutable access to an attribute. Bumps the geometry version.
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        let attribute = self.attributes.get_mut(name)?;
        self.version += 1;
        Some(attribute)
    }

    /// Iterates over all attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(name, a)| (name.as_str(), a))
    }

    /// Sets or clears the index.
    pub fn set_index(&mut self, index: Option<Index>) {
        self.index = index;
        self.version += 1;
    }

    /// The index, if any.
    pub fn index(&self) -> Option<&Index> {
        self.index.as_ref()
    }

    /// Mutable access to the index. Bumps the geometry version.
    pub fn index_mut(&mut self) -> Option<&mut Index> {
        let index = self.index.as_mut()?;
        self.version += 1;
        Some(index)
    }

    /// The primitive topology.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Sets the draw range.
    pub fn set_draw_range(&mut self, start: u32, count: Option<u32>) {
        self.draw_range = DrawRange { start, count };
    }

    /// The draw range.
    pub fn draw_range(&self) -> DrawRange {
        self.draw_range
    }

    /// The mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The CPU identities of every array, for releasing their GPU buffers.
    pub fn buffer_sources(&self) -> SmallVec<[BufferSourceId; 8]> {
        self.attributes
            .values()
            .map(Attribute::source)
            .chain(self.index.as_ref().map(Index::source))
            .collect()
    }

    /// The number of vertices: the position count, or the shortest attribute
    /// when there are no positions.
    pub fn vertex_count(&self) -> u32 {
        match self.attributes.get(POSITION) {
            Some(position) => position.count(),
            None => self.attributes.values().map(Attribute::count).min().unwrap_or(0),
        }
    }

    /// The `(first, count)` element span to submit.
    ///
    /// The span is clamped to the available elements and rounded down to whole
    /// primitives. A count of zero means the geometry is degenerate and
    /// contributes no draw call.
    pub fn draw_span(&self) -> (u32, u32) {
        let total = self.index.as_ref().map_or_else(|| self.vertex_count(), Index::count);
        let start = self.draw_range.start.min(total);
        let available = total - start;
        let count = self.draw_range.count.map_or(available, |c| c.min(available));
        let per_primitive = match self.topology {
            PrimitiveTopology::Triangles => 3,
            PrimitiveTopology::Lines => 2,
            PrimitiveTopology::Points => 1,
        };
        (start, count - count % per_primitive)
    }

    /// The bounding box of the positions, or `None` without positions.
    pub fn bounding_box(&self) -> Option<Aabb> {
        self.cached_bounds().aabb
    }

    /// The bounding sphere of the positions, centered on the bounding box.
    pub fn bounding_sphere(&self) -> Option<Sphere> {
        self.cached_bounds().sphere
    }

    fn cached_bounds(&self) -> CachedBounds {
        if let Some(cached) = self.bounds.get() {
            if cached.version == self.version {
                return cached;
            }
        }

        let computed = match self.attributes.get(POSITION) {
            Some(position) => {
                let aabb = Aabb::from_points(position.points());
                CachedBounds {
                    version: self.version,
                    aabb,
                    sphere: aabb.map(|aabb| Sphere::from_points_around(&aabb, position.points())),
                }
            }
            None => CachedBounds {
                version: self.version,
                aabb: None,
                sphere: None,
            },
        };
        log::trace!("Recomputed geometry bounds at version {}.", self.version);
        self.bounds.set(Some(computed));
        computed
    }
}

/// Builds common shapes.
pub mod shapes {
    use super::*;

    /// An axis-aligned box centered at the origin, with positions, normals, uvs and 16-bit indices.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Geometry {
        let (hx, hy, hz) = (width * 0.5, height * 0.5, depth * 0.5);
        // (normal, u axis, v axis) per face.
        let faces = [
            (Vec3::X, Vec3::new(0.0, 0.0, -1.0), Vec3::Y),
            (-Vec3::X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::new(0.0, 0.0, -1.0)),
            (-Vec3::Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (-Vec3::Z, -Vec3::X, Vec3::Y),
        ];
        let half = Vec3::new(hx, hy, hz);

        let mut positions = Vec::with_capacity(72);
        let mut normals = Vec::with_capacity(72);
        let mut uvs = Vec::with_capacity(48);
        let mut indices = Vec::with_capacity(36);
        for (n, u, v) in faces {
            let base = (positions.len() / 3) as u16;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (n + u * su + v * sv).mul_elem(half);
                positions.extend_from_slice(&p.to_array());
                normals.extend_from_slice(&n.to_array());
                uvs.extend_from_slice(&[(su + 1.0) * 0.5, (sv + 1.0) * 0.5]);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Geometry::new()
            .with_attribute(POSITION, Attribute::new(positions, 3))
            .with_attribute(NORMAL, Attribute::new(normals, 3))
            .with_attribute(UV, Attribute::new(uvs, 2))
            .with_index(IndexData::U16(indices))
    }

    /// A square in the XY plane facing `+Z`.
    pub fn plane(size: f32) -> Geometry {
        let h = size * 0.5;
        Geometry::new()
            .with_attribute(
                POSITION,
                Attribute::new(vec![-h, -h, 0.0, h, -h, 0.0, h, h, 0.0, -h, h, 0.0], 3),
            )
            .with_attribute(NORMAL, Attribute::new(vec![0.0f32, 0.0, 1.0].repeat(4), 3))
            .with_attribute(UV, Attribute::new(vec![0.0f32, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0], 2))
            .with_index(IndexData::U16(vec![0, 1, 2, 0, 2, 3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn triangle() -> Geometry {
        Geometry::new().with_attribute(
            POSITION,
            Attribute::new(vec![0.0f32, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0], 3),
        )
    }

    #[test]
    fn test_bounds_are_computed_lazily_and_cached() {
        let geometry = triangle();
        let aabb = geometry.bounding_box().expect("has positions");
        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::new(2.0, 2.0, 0.0));
        let sphere = geometry.bounding_sphere().unwrap();
        assert_abs_diff_eq!(sphere.center, Vec3::new(1.0, 1.0, 0.0));
        assert_abs_diff_eq!(sphere.radius, 2.0f32.sqrt());
    }

    #[test]
    fn test_bounds_are_invalidated_by_mutation() {
        let mut geometry = triangle();
        let before = geometry.bounding_box().unwrap();
        let version = geometry.version();

        if let Some(AttributeData::F32(v)) = geometry
            .attribute_mut(POSITION)
            .map(|a| a.data_mut())
        {
            v[3] = 10.0;
        }

        assert!(geometry.version() > version);
        assert_eq!(geometry.attribute(POSITION).unwrap().version(), 1);
        let after = geometry.bounding_box().unwrap();
        assert_ne!(before, after);
        assert_eq!(after.max.x, 10.0);
    }

    #[test]
    fn test_geometry_without_positions_has_no_bounds() {
        let geometry = Geometry::new().with_attribute(UV, Attribute::new(vec![0.0f32, 1.0], 2));
        assert!(geometry.bounding_box().is_none());
        assert!(geometry.bounding_sphere().is_none());
        assert_eq!(geometry.vertex_count(), 1);
    }

    #[test]
    fn test_draw_span_respects_range_and_primitives() {
        let mut cube = shapes::cuboid(1.0, 1.0, 1.0);
        assert_eq!(cube.draw_span(), (0, 36));
        cube.set_draw_range(6, Some(7));
        assert_eq!(cube.draw_span(), (6, 6));
        cube.set_draw_range(40, None);
        assert_eq!(cube.draw_span(), (36, 0));
    }

    #[test]
    fn test_degenerate_geometry_has_empty_span() {
        let geometry = Geometry::new().with_attribute(POSITION, Attribute::new(vec![0.0f32, 0.0, 0.0], 3));
        assert_eq!(geometry.draw_span().1, 0);
    }

    #[test]
    fn test_clone_allocates_new_buffer_sources() {
        let cube = shapes::cuboid(1.0, 1.0, 1.0);
        let copy = cube.clone();
        let a = cube.buffer_sources();
        let b = copy.buffer_sources();
        assert_eq!(a.len(), 4);
        assert!(a.iter().all(|id| !b.contains(id)));
    }

    #[test]
    fn test_cuboid_bounds() {
        let cube = shapes::cuboid(2.0, 4.0, 6.0);
        let aabb = cube.bounding_box().unwrap();
        assert_abs_diff_eq!(aabb.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_abs_diff_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
    }
}
