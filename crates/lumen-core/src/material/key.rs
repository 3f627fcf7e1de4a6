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

//! Content-derived keys that identify compiled program variants.

use bitflags::bitflags;
use std::hash::{BuildHasher, Hash, Hasher};

use crate::renderer::EnvironmentSignature;

bitflags! {
    /// Material options that change generated shader code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct MaterialFeatures: u32 {
        /// Samples a color map.
        const MAP = 1 << 0;
        /// Multiplies by a per-vertex color attribute.
        const VERTEX_COLORS = 1 << 1;
        /// Discards fragments below an alpha threshold.
        const ALPHA_TEST = 1 << 2;
        /// Applies scene fog.
        const FOG = 1 << 3;
        /// Uses face normals instead of interpolated ones.
        const FLAT_SHADING = 1 << 4;
        /// Renders both faces, flipping normals on back faces.
        const DOUBLE_SIDED = 1 << 5;
        /// Renders back faces only, flipping normals.
        const BACK_SIDE = 1 << 6;
        /// Samples the transmission target.
        const TRANSMISSION = 1 << 7;
    }
}

/// A stable tag for each material kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MaterialKindTag {
    /// Unlit.
    Basic = 0,
    /// Diffuse-only lighting.
    Lambert = 1,
    /// Blinn-Phong lighting.
    Phong = 2,
    /// Metallic/roughness PBR.
    Standard = 3,
    /// Depth-only output.
    Depth = 4,
    /// User-provided sources.
    Custom = 5,
}

/// Uniquely identifies the compiled program variant a material needs.
///
/// Two materials with equal keys can share a program. The key is ordered so
/// that the render list can group draws by program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureKey {
    /// The material kind.
    pub kind: MaterialKindTag,
    /// Code-affecting options.
    pub features: MaterialFeatures,
    /// Hash of user sources for custom materials, `0` otherwise.
    pub source_hash: u64,
}

/// The key of the program cache: what a material needs plus what the frame provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey {
    /// The material's feature key.
    pub feature: FeatureKey,
    /// The environment signature, masked to what this material's code reads.
    pub environment: EnvironmentSignature,
}

/// Hashes shader sources with fixed seeds, so the same sources produce the
/// same key in every run.
pub(crate) fn hash_sources(vertex: &str, fragment: &str) -> u64 {
    let state = ahash::RandomState::with_seeds(
        0x6c75_6d65_6e00_0001,
        0x6c75_6d65_6e00_0002,
        0x6c75_6d65_6e00_0003,
        0x6c75_6d65_6e00_0004,
    );
    let mut hasher = state.build_hasher();
    vertex.hash(&mut hasher);
    fragment.hash(&mut hasher);
    // Never collide with the "no custom source" value.
    hasher.finish().max(1)
}
