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

//! Per-frame statistics.

use lumen_lanes::scene_lane::TransformUpdateStats;

/// What a call to `render_frame` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draw calls issued, all passes included.
    pub draw_calls: u32,
    /// Triangles submitted, all passes included.
    pub triangles: u64,
    /// Drawables rejected by frustum culling in the main view.
    pub culled: u32,
    /// Items in the opaque bucket.
    pub opaque: u32,
    /// Items in the transmissive bucket.
    pub transmissive: u32,
    /// Items in the transparent bucket.
    pub transparent: u32,
    /// Items skipped because their program failed to compile or their
    /// resources were missing.
    pub skipped_draws: u32,
    /// Shadow maps rendered.
    pub shadow_passes: u32,
    /// Whether the transmission pass ran.
    pub transmission_pass: bool,
    /// Draw calls issued into the transmission capture.
    pub transmission_draws: u32,
    /// Pipeline state calls that reached the device.
    pub state_changes: u32,
    /// Uniform writes that reached the device.
    pub uniform_uploads: u32,
    /// Nodes whose matrices were recomputed.
    pub transforms: TransformUpdateStats,
    /// The context was restored since the previous frame and every resource
    /// was rebuilt.
    pub context_restored: bool,
    /// Nothing was rendered because the context is lost.
    pub skipped_frame: bool,
}

impl FrameStats {
    /// Stats of a frame skipped while the context is lost.
    pub(crate) fn skipped() -> Self {
        Self {
            skipped_frame: true,
            ..Default::default()
        }
    }
}
