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

//! Framebuffers and their attachments.

use ahash::AHashMap;
use lumen_core::renderer::{
    CacheError, FramebufferDescriptor, FramebufferId, GraphicsDevice, ResourceError,
    TextureDescriptor, TextureFormat, TextureId,
};
use lumen_core::scene::NodeId;
use lumen_data::RenderTargetId;

use super::CacheStats;

/// Identifies a framebuffer owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKey {
    /// A user render target.
    User(RenderTargetId),
    /// One shadow map of a light. Point lights use faces `0..6`.
    Shadow {
        /// The node carrying the light.
        light: NodeId,
        /// The cube face, `0` for other lights.
        face: u8,
    },
    /// The opaque scene captured for transmissive materials.
    Transmission,
}

/// What a framebuffer must look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// The color attachment format, or `None` for depth-only targets.
    pub color: Option<TextureFormat>,
    /// Whether a depth attachment is needed.
    pub depth: bool,
    /// The CPU-side version. A newer version re-creates the framebuffer.
    pub version: u64,
}

/// A live framebuffer with its attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuTarget {
    /// The framebuffer.
    pub framebuffer: FramebufferId,
    /// The color attachment.
    pub color: Option<TextureId>,
    /// The depth attachment.
    pub depth: Option<TextureId>,
    /// The description the framebuffer was created from.
    pub desc: TargetDesc,
}

/// Framebuffers keyed by [`TargetKey`].
///
/// A framebuffer is never resized: when the requested description changes,
/// the old framebuffer and its attachments are deleted and a new one created.
#[derive(Debug, Default)]
pub struct TargetCache {
    entries: AHashMap<TargetKey, GpuTarget>,
    // Deleted since the last `take_deleted`.
    deleted: Vec<GpuTarget>,
    stats: CacheStats,
}

impl TargetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the framebuffer of `key`, creating or re-creating it to match `desc`.
    pub fn acquire(
        &mut self,
        device: &mut dyn GraphicsDevice,
        key: TargetKey,
        desc: TargetDesc,
    ) -> Result<GpuTarget, CacheError> {
        match self.entries.get(&key) {
            Some(target) if target.desc == desc => {
                self.stats.hits += 1;
                return Ok(*target);
            }
            Some(_) => {
                log::debug!("Re-creating render target {key:?} at {}x{}.", desc.width, desc.height);
                self.release(device, key)?;
            }
            None => {}
        }

        let target = create_target(device, key, desc)?;
        self.entries.insert(key, target);
        self.stats.created += 1;
        Ok(target)
    }

    /// Deletes the framebuffer of `key` and its attachments.
    ///
    /// # Errors
    /// [`CacheError::DoubleRelease`] if `key` has no live framebuffer.
    pub fn release(&mut self, device: &mut dyn GraphicsDevice, key: TargetKey) -> Result<(), CacheError> {
        let target = self
            .entries
            .remove(&key)
            .ok_or(CacheError::DoubleRelease { kind: "render target" })?;
        self.stats.destroyed += 1;
        self.deleted.push(target);
        device.delete_framebuffer(target.framebuffer)?;
        for texture in target.color.into_iter().chain(target.depth) {
            device.delete_texture(texture)?;
        }
        Ok(())
    }

    /// Releases every framebuffer whose key fails `keep`.
    pub fn retain(
        &mut self,
        device: &mut dyn GraphicsDevice,
        mut keep: impl FnMut(&TargetKey) -> bool,
    ) -> Result<(), CacheError> {
        let stale: Vec<TargetKey> = self.entries.keys().filter(|key| !keep(key)).copied().collect();
        for key in stale {
            self.release(device, key)?;
        }
        Ok(())
    }

    /// Returns the framebuffer of `key`.
    pub fn get(&self, key: &TargetKey) -> Option<&GpuTarget> {
        self.entries.get(key)
    }

    /// The number of live framebuffers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no framebuffer is alive.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drains the targets deleted since the last call, so their ids can be
    /// dropped from the state snapshot.
    pub fn take_deleted(&mut self) -> Vec<GpuTarget> {
        std::mem::take(&mut self.deleted)
    }

    /// Forgets every framebuffer without touching the device.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.deleted.clear();
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

fn create_target(
    device: &mut dyn GraphicsDevice,
    key: TargetKey,
    desc: TargetDesc,
) -> Result<GpuTarget, ResourceError> {
    let mut attachment = |format: TextureFormat| {
        device.create_texture(
            &TextureDescriptor {
                label: Some(format!("{key:?} {format:?}")),
                width: desc.width,
                height: desc.height,
                format,
            },
            None,
        )
    };
    let color = desc.color.map(&mut attachment).transpose()?;
    let depth = desc
        .depth
        .then_some(TextureFormat::Depth32)
        .map(&mut attachment)
        .transpose()?;
    let framebuffer = device.create_framebuffer(&FramebufferDescriptor {
        label: Some(format!("{key:?}")),
        color,
        depth,
    })?;
    Ok(GpuTarget {
        framebuffer,
        color,
        depth,
        desc,
    })
}
