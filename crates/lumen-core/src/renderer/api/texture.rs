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

//! Texture and framebuffer descriptors.

use super::TextureId;

/// The pixel format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, linear.
    Rgba8,
    /// 8-bit RGBA, sRGB encoded.
    Rgba8Srgb,
    /// 8-bit single channel.
    R8,
    /// 32-bit float depth.
    Depth32,
}

impl TextureFormat {
    /// Size of one texel in bytes.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 | TextureFormat::Rgba8Srgb | TextureFormat::Depth32 => 4,
            TextureFormat::R8 => 1,
        }
    }
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// A debug label.
    pub label: Option<String>,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// The texel format.
    pub format: TextureFormat,
}

impl TextureDescriptor {
    /// The number of bytes a full upload must contain.
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// A descriptor used to create a [`FramebufferId`](super::FramebufferId).
#[derive(Debug, Clone, PartialEq)]
pub struct FramebufferDescriptor {
    /// A debug label.
    pub label: Option<String>,
    /// The color attachment, if any. Depth-only targets have none.
    pub color: Option<TextureId>,
    /// The depth attachment, if any.
    pub depth: Option<TextureId>,
}
