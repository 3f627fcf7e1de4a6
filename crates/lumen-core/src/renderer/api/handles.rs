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

//! Opaque handles to objects owned by a [`GraphicsDevice`](crate::renderer::GraphicsDevice).
//!
//! A handle is only meaningful for the device that produced it, and only until
//! the device loses its context.

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);
    };
}

gpu_handle!(
    /// A linked shader program.
    ProgramId
);
gpu_handle!(
    /// A vertex or index buffer.
    BufferId
);
gpu_handle!(
    /// A 2D texture.
    TextureId
);
gpu_handle!(
    /// A framebuffer grouping color and depth attachments.
    FramebufferId
);

/// The location of an active uniform inside a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub u32);
