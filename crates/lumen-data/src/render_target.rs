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

//! Offscreen render targets.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);

/// The identity of a [`RenderTarget`], used as its framebuffer cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(u64);

/// An offscreen color (and optionally depth) target a frame can be rendered into.
///
/// Frames rendered into a target use linear output and no tone mapping, so the
/// result can be sampled by later passes without double encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    id: RenderTargetId,
    width: u32,
    height: u32,
    depth_buffer: bool,
    version: u64,
}

impl RenderTarget {
    /// Creates a target with a depth buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: RenderTargetId(NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed)),
            width: width.max(1),
            height: height.max(1),
            depth_buffer: true,
            version: 0,
        }
    }

    /// Removes the depth attachment.
    pub fn without_depth(mut self) -> Self {
        self.depth_buffer = false;
        self
    }

    /// Changes the size. The framebuffer is re-created on the next frame.
    pub fn set_size(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.version += 1;
        }
    }

    /// The identity of the target.
    pub fn id(&self) -> RenderTargetId {
        self.id
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the target has a depth attachment.
    pub fn has_depth(&self) -> bool {
        self.depth_buffer
    }

    /// The mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }
}
