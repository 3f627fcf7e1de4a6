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

//! Buffer and texture caches keyed by CPU identity and refreshed by version.

use std::fmt::Debug;
use std::hash::Hash;

use ahash::AHashMap;
use lumen_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, CacheError, GraphicsDevice, ResourceError,
    TextureDescriptor, TextureId,
};
use lumen_core::scene::ImageId;
use lumen_data::geometry::{Attribute, BufferSourceId, Index};
use lumen_data::Image;

use super::CacheStats;

/// CPU data that can be mirrored by a device object.
pub trait Uploadable {
    /// The device handle.
    type Handle: Copy + Debug;

    /// The resource kind, used in errors and logs.
    const KIND: &'static str;

    /// The CPU-side version. A newer version triggers a re-upload.
    fn version(&self) -> u64;

    /// The size of the data in bytes.
    fn byte_size(&self) -> usize;

    /// Creates the device object and uploads the data.
    fn create(&self, device: &mut dyn GraphicsDevice) -> Result<Self::Handle, ResourceError>;

    /// Re-uploads the data into an object of the same size.
    fn update(&self, device: &mut dyn GraphicsDevice, handle: Self::Handle) -> Result<(), ResourceError>;

    /// Deletes the device object.
    fn delete(device: &mut dyn GraphicsDevice, handle: Self::Handle) -> Result<(), ResourceError>;
}

/// A live device object and the CPU version it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuEntry<H> {
    /// The device handle.
    pub handle: H,
    /// The uploaded version.
    pub version: u64,
    /// The size of the object in bytes.
    pub byte_size: usize,
}

/// A cache of device objects mirroring versioned CPU data.
///
/// An entry is uploaded once on first use and again only when the CPU version
/// moves past the uploaded one. Objects keep their byte size for life.
#[derive(Debug)]
pub struct VersionedCache<K, H> {
    entries: AHashMap<K, GpuEntry<H>>,
    stats: CacheStats,
}

/// Vertex and index buffers keyed by the identity of their CPU array.
pub type BufferCache = VersionedCache<BufferSourceId, BufferId>;

/// Textures keyed by image.
pub type TextureCache = VersionedCache<ImageId, TextureId>;

impl<K, H> Default for VersionedCache<K, H> {
    fn default() -> Self {
        Self {
            entries: AHashMap::default(),
            stats: CacheStats::default(),
        }
    }
}

impl<K: Hash + Eq + Copy + Debug, H: Copy + Debug> VersionedCache<K, H> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the device object for `key`, creating or refreshing it first.
    ///
    /// # Errors
    /// [`CacheError::InvalidResize`] if the byte size of `source` differs from
    /// the live object's. The live object is left untouched.
    pub fn acquire<U: Uploadable<Handle = H>>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        key: K,
        source: &U,
    ) -> Result<H, CacheError> {
        let version = source.version();
        let byte_size = source.byte_size();

        if let Some(entry) = self.entries.get_mut(&key) {
            if version <= entry.version {
                self.stats.hits += 1;
                return Ok(entry.handle);
            }
            if byte_size != entry.byte_size {
                return Err(CacheError::InvalidResize {
                    kind: U::KIND,
                    old_size: entry.byte_size,
                    new_size: byte_size,
                });
            }
            source.update(device, entry.handle)?;
            entry.version = version;
            self.stats.uploads += 1;
            log::trace!("Re-uploaded {} {:?} at version {}.", U::KIND, key, version);
            return Ok(entry.handle);
        }

        let handle = source.create(device)?;
        self.entries.insert(
            key,
            GpuEntry {
                handle,
                version,
                byte_size,
            },
        );
        self.stats.created += 1;
        self.stats.uploads += 1;
        log::trace!("Created {} {:?} ({} bytes).", U::KIND, key, byte_size);
        Ok(handle)
    }

    /// Deletes the device object of `key`.
    ///
    /// # Errors
    /// [`CacheError::DoubleRelease`] if `key` has no live object.
    pub fn release<U: Uploadable<Handle = H>>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        key: K,
    ) -> Result<(), CacheError> {
        if self.release_if_present::<U>(device, key)? {
            Ok(())
        } else {
            Err(CacheError::DoubleRelease { kind: U::KIND })
        }
    }

    /// Deletes the device object of `key` if it has one.
    ///
    /// ## Returns
    /// `true` if an object was deleted.
    pub fn release_if_present<U: Uploadable<Handle = H>>(
        &mut self,
        device: &mut dyn GraphicsDevice,
        key: K,
    ) -> Result<bool, CacheError> {
        let Some(entry) = self.entries.remove(&key) else {
            return Ok(false);
        };
        self.stats.destroyed += 1;
        U::delete(device, entry.handle)?;
        Ok(true)
    }

    /// Returns the live entry of `key`.
    pub fn get(&self, key: &K) -> Option<&GpuEntry<H>> {
        self.entries.get(key)
    }

    /// Returns `true` if `key` has a live object.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// The number of live objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no object is alive.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes held by live objects.
    pub fn resident_bytes(&self) -> usize {
        self.entries.values().map(|entry| entry.byte_size).sum()
    }

    /// Forgets every object without touching the device.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.stats.rebuilds += 1;
    }

    /// The cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            live: self.entries.len(),
            ..self.stats
        }
    }
}

// --- Uploadable sources ---

impl Uploadable for Attribute {
    type Handle = BufferId;
    const KIND: &'static str = "vertex buffer";

    fn version(&self) -> u64 {
        Attribute::version(self)
    }

    fn byte_size(&self) -> usize {
        self.data().as_bytes().len()
    }

    fn create(&self, device: &mut dyn GraphicsDevice) -> Result<BufferId, ResourceError> {
        let bytes = self.data().as_bytes();
        device.create_buffer(
            &BufferDescriptor {
                label: None,
                usage: BufferUsage::Vertex,
                size: bytes.len(),
            },
            bytes,
        )
    }

    fn update(&self, device: &mut dyn GraphicsDevice, handle: BufferId) -> Result<(), ResourceError> {
        device.update_buffer(handle, 0, self.data().as_bytes())
    }

    fn delete(device: &mut dyn GraphicsDevice, handle: BufferId) -> Result<(), ResourceError> {
        device.delete_buffer(handle)
    }
}

impl Uploadable for Index {
    type Handle = BufferId;
    const KIND: &'static str = "index buffer";

    fn version(&self) -> u64 {
        Index::version(self)
    }

    fn byte_size(&self) -> usize {
        self.as_bytes().len()
    }

    fn create(&self, device: &mut dyn GraphicsDevice) -> Result<BufferId, ResourceError> {
        let bytes = self.as_bytes();
        device.create_buffer(
            &BufferDescriptor {
                label: None,
                usage: BufferUsage::Index,
                size: bytes.len(),
            },
            bytes,
        )
    }

    fn update(&self, device: &mut dyn GraphicsDevice, handle: BufferId) -> Result<(), ResourceError> {
        device.update_buffer(handle, 0, self.as_bytes())
    }

    fn delete(device: &mut dyn GraphicsDevice, handle: BufferId) -> Result<(), ResourceError> {
        device.delete_buffer(handle)
    }
}

impl Uploadable for Image {
    type Handle = TextureId;
    const KIND: &'static str = "texture";

    fn version(&self) -> u64 {
        Image::version(self)
    }

    fn byte_size(&self) -> usize {
        self.data().len()
    }

    fn create(&self, device: &mut dyn GraphicsDevice) -> Result<TextureId, ResourceError> {
        device.create_texture(
            &TextureDescriptor {
                label: None,
                width: self.width(),
                height: self.height(),
                format: self.format(),
            },
            Some(self.data()),
        )
    }

    fn update(&self, device: &mut dyn GraphicsDevice, handle: TextureId) -> Result<(), ResourceError> {
        device.update_texture(handle, self.data())
    }

    fn delete(device: &mut dyn GraphicsDevice, handle: TextureId) -> Result<(), ResourceError> {
        device.delete_texture(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::TextureFormat;
    use lumen_infra::HeadlessDevice;

    #[test]
    fn test_upload_once_per_version() {
        // --- 1. ARRANGE ---
        let mut device = HeadlessDevice::new();
        let mut cache = BufferCache::new();
        let mut positions = Attribute::new(vec![0.0f32; 9], 3);

        // --- 2. ACT ---
        let first = cache.acquire(&mut device, positions.source(), &positions).unwrap();
        let again = cache.acquire(&mut device, positions.source(), &positions).unwrap();
        positions.set_data(vec![1.0f32; 9]);
        let updated = cache.acquire(&mut device, positions.source(), &positions).unwrap();

        // --- 3. ASSERT ---
        assert_eq!(first, again);
        assert_eq!(first, updated);
        let counters = device.counters();
        assert_eq!(counters.buffers_created, 1);
        assert_eq!(counters.buffer_updates, 1);
        assert_eq!(device.buffer_data(first).unwrap(), positions.data().as_bytes());
        let stats = cache.stats();
        assert_eq!((stats.created, stats.uploads, stats.hits), (1, 2, 1));
    }

    #[test]
    fn test_resize_is_rejected() {
        let mut device = HeadlessDevice::new();
        let mut cache = BufferCache::new();
        let mut positions = Attribute::new(vec![0.0f32; 9], 3);
        let handle = cache.acquire(&mut device, positions.source(), &positions).unwrap();

        positions.set_data(vec![0.0f32; 12]);
        let err = cache.acquire(&mut device, positions.source(), &positions).unwrap_err();

        assert_eq!(
            err,
            CacheError::InvalidResize {
                kind: "vertex buffer",
                old_size: 36,
                new_size: 48,
            }
        );
        assert_eq!(device.buffer_data(handle).unwrap().len(), 36);
        assert_eq!(cache.get(&positions.source()).unwrap().version, 0);
    }

    #[test]
    fn test_release_and_double_release() {
        let mut device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        let image = Image::new(2, 2, TextureFormat::Rgba8, vec![255; 16]).unwrap();
        let key = ImageId::default();
        cache.acquire(&mut device, key, &image).unwrap();
        assert_eq!(cache.resident_bytes(), 16);

        cache.release::<Image>(&mut device, key).unwrap();

        assert_eq!(device.live_textures(), 0);
        assert_eq!(
            cache.release::<Image>(&mut device, key),
            Err(CacheError::DoubleRelease { kind: "texture" })
        );
        assert!(!cache.release_if_present::<Image>(&mut device, key).unwrap());
    }

    #[test]
    fn test_invalidate_all_recreates_on_next_acquire() {
        let mut device = HeadlessDevice::new();
        let mut cache = BufferCache::new();
        let positions = Attribute::new(vec![0.0f32; 3], 3);
        cache.acquire(&mut device, positions.source(), &positions).unwrap();

        device.simulate_context_loss();
        cache.invalidate_all();
        device.restore_context();
        cache.acquire(&mut device, positions.source(), &positions).unwrap();

        assert_eq!(device.counters().buffers_created, 2);
        assert_eq!(device.counters().buffers_deleted, 0);
        assert_eq!(cache.stats().rebuilds, 1);
    }
}
