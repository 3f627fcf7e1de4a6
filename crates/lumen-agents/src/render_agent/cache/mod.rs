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

//! Caches mapping CPU-side identities to device objects.
//!
//! Every cache can drop all of its entries at once with `invalidate_all`
//! after a context loss. No device call is made then: the objects are already
//! gone, and the next acquire of each key re-creates it.

mod program_cache;
mod target_cache;
mod versioned;

pub use program_cache::{CachedProgram, ProgramCache, ProgramHandle};
pub use target_cache::{GpuTarget, TargetCache, TargetDesc, TargetKey};
pub use versioned::{BufferCache, GpuEntry, TextureCache, Uploadable, VersionedCache};

/// Counters kept by every cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Device objects created.
    pub created: u32,
    /// Device objects deleted.
    pub destroyed: u32,
    /// Data uploads, including the initial upload of created objects.
    pub uploads: u32,
    /// Acquires served from an existing entry.
    pub hits: u32,
    /// Calls to `invalidate_all`.
    pub rebuilds: u32,
    /// Entries alive right now.
    pub live: usize,
}

/// All caches tied to one device.
#[derive(Debug, Default)]
pub struct RenderContext {
    /// Compiled programs keyed by program key.
    pub programs: ProgramCache,
    /// Vertex and index buffers keyed by CPU array identity.
    pub buffers: BufferCache,
    /// Textures keyed by image.
    pub textures: TextureCache,
    /// Framebuffers for user, shadow and transmission targets.
    pub targets: TargetCache,
}

impl RenderContext {
    /// Forgets every device object after a context loss.
    pub fn invalidate_all(&mut self) {
        self.programs.invalidate_all();
        self.buffers.invalidate_all();
        self.textures.invalidate_all();
        self.targets.invalidate_all();
        log::debug!("All device caches invalidated.");
    }
}
