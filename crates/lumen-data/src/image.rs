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

//! CPU-side texture sources.

use lumen_core::renderer::TextureFormat;

/// Texel data sampled by materials.
///
/// The renderer uploads an image when it is first sampled and again whenever
/// its version moves. The byte size of an uploaded image is fixed: replacing
/// the data with a different size is reported as an invalid resize on the
/// next upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    format: TextureFormat,
    data: Vec<u8>,
    version: u64,
}

impl Image {
    /// Creates an image. Returns `None` if `data` does not hold exactly
    /// `width * height` texels of `format`.
    pub fn new(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        (data.len() == expected).then_some(Self {
            width,
            height,
            format,
            data,
            version: 0,
        })
    }

    /// A 1x1 image of a single RGBA color.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Srgb,
            data: rgba.to_vec(),
            version: 0,
        }
    }

    /// Width in texels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The texel format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// The texel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the texel bytes. Bumps the version.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.version += 1;
        &mut self.data
    }

    /// Replaces the image contents, possibly with a new size. Bumps the version.
    ///
    /// Returns `false` and leaves the image untouched if `data` does not match
    /// the new dimensions.
    pub fn replace(&mut self, width: u32, height: u32, data: Vec<u8>) -> bool {
        if data.len() != width as usize * height as usize * self.format.bytes_per_pixel() {
            return false;
        }
        self.width = width;
        self.height = height;
        self.data = data;
        self.version += 1;
        true
    }

    /// The mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_size() {
        assert!(Image::new(2, 2, TextureFormat::Rgba8, vec![0; 16]).is_some());
        assert!(Image::new(2, 2, TextureFormat::Rgba8, vec![0; 15]).is_none());
        assert!(Image::new(4, 1, TextureFormat::R8, vec![0; 4]).is_some());
    }

    #[test]
    fn test_mutation_bumps_version() {
        let mut image = Image::solid([255, 0, 0, 255]);
        image.data_mut()[0] = 0;
        assert_eq!(image.version(), 1);
        assert!(!image.replace(2, 2, vec![0; 4]));
        assert_eq!(image.version(), 1);
        assert!(image.replace(2, 2, vec![0; 16]));
        assert_eq!((image.width(), image.version()), (2, 2));
    }
}
