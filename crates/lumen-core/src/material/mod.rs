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

//! Defines the material descriptor and the feature key derived from it.
//!
//! Materials form a closed set of kinds. Every code-affecting option is folded
//! into a [`FeatureKey`] by a single function, [`Material::feature_key`], which
//! the renderer combines with the frame environment to find a compiled program.

mod key;

pub use self::key::{FeatureKey, MaterialFeatures, MaterialKindTag, ProgramKey};

use std::collections::BTreeMap;

use crate::math::LinearRgba;
use crate::renderer::{BlendMode, CompareFunction, DepthState, EnvironmentSignature, Side, StencilState, UniformValue};
use crate::scene::ImageId;

/// User-provided program sources and uniform values.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomShader {
    vertex_source: String,
    fragment_source: String,
    source_hash: u64,
    /// Whether the sources read the standard light uniforms.
    pub lights: bool,
    /// Values uploaded by name on every draw.
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl CustomShader {
    /// Creates a custom shader from its two stages.
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        let vertex_source = vertex_source.into();
        let fragment_source = fragment_source.into();
        let source_hash = key::hash_sources(&vertex_source, &fragment_source);
        Self {
            vertex_source,
            fragment_source,
            source_hash,
            lights: false,
            uniforms: BTreeMap::new(),
        }
    }

    /// Sets a uniform value, returning `self` for chaining.
    pub fn with_uniform(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.uniforms.insert(name.into(), value);
        self
    }

    /// The vertex stage source.
    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    /// The fragment stage source.
    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }
}

/// The shading model of a material, with its model-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Unlit flat color.
    Basic,
    /// Diffuse-only lighting.
    Lambert,
    /// Blinn-Phong lighting.
    Phong {
        /// Specular color.
        specular: LinearRgba,
        /// Specular exponent.
        shininess: f32,
    },
    /// Metallic/roughness physically based lighting.
    Standard {
        /// `0.0` for dielectrics, `1.0` for metals.
        metalness: f32,
        /// Microfacet roughness in `[0, 1]`.
        roughness: f32,
        /// Fraction of light transmitted through the surface. Any value above
        /// zero moves the material to the transmissive bucket.
        transmission: f32,
        /// Thickness of the volume below the surface, for refraction.
        thickness: f32,
        /// Index of refraction.
        ior: f32,
    },
    /// Writes depth only. Used by shadow passes.
    Depth,
    /// User-provided program sources.
    Custom(CustomShader),
}

impl MaterialKind {
    /// Returns the stable tag of this kind.
    pub fn tag(&self) -> MaterialKindTag {
        match self {
            MaterialKind::Basic => MaterialKindTag::Basic,
            MaterialKind::Lambert => MaterialKindTag::Lambert,
            MaterialKind::Phong { .. } => MaterialKindTag::Phong,
            MaterialKind::Standard { .. } => MaterialKindTag::Standard,
            MaterialKind::Depth => MaterialKindTag::Depth,
            MaterialKind::Custom(_) => MaterialKindTag::Custom,
        }
    }
}

/// A material: how the surfaces of a drawable are shaded and blended.
///
/// Fields can be edited in place. Call [`Material::needs_update`] after an
/// edit so that the renderer re-evaluates the material; code-affecting changes
/// are picked up through the feature key regardless.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// An optional name for debugging.
    pub name: Option<String>,
    /// The shading model.
    pub kind: MaterialKind,
    /// Base color.
    pub color: LinearRgba,
    /// Color map sampled with the `uv` attribute.
    pub map: Option<ImageId>,
    /// Overall opacity, used when `transparent` is set.
    pub opacity: f32,
    /// Routes the material to the transparent bucket.
    pub transparent: bool,
    /// The blend equation.
    pub blending: BlendMode,
    /// Which faces are drawn.
    pub side: Side,
    /// Enables the depth test.
    pub depth_test: bool,
    /// Enables depth writes.
    pub depth_write: bool,
    /// The depth comparison.
    pub depth_func: CompareFunction,
    /// The stencil test, disabled for `None`.
    pub stencil: Option<StencilState>,
    /// Fragments with alpha below this threshold are discarded. `0.0` disables the test.
    pub alpha_test: f32,
    /// Multiplies the color by the `color` vertex attribute.
    pub vertex_colors: bool,
    /// Applies scene fog.
    pub fog: bool,
    /// Uses face normals.
    pub flat_shading: bool,
    /// Hidden materials are skipped by the render list.
    pub visible: bool,
    version: u64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            kind: MaterialKind::Basic,
            color: LinearRgba::WHITE,
            map: None,
            opacity: 1.0,
            transparent: false,
            blending: BlendMode::Normal,
            side: Side::Front,
            depth_test: true,
            depth_write: true,
            depth_func: CompareFunction::LessEqual,
            stencil: None,
            alpha_test: 0.0,
            vertex_colors: false,
            fog: true,
            flat_shading: false,
            visible: true,
            version: 0,
        }
    }
}

impl Material {
    /// Creates a material of `kind` with default settings.
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// An unlit material.
    pub fn basic(color: LinearRgba) -> Self {
        Self {
            color,
            ..Self::new(MaterialKind::Basic)
        }
    }

    /// A diffuse lit material.
    pub fn lambert(color: LinearRgba) -> Self {
        Self {
            color,
            ..Self::new(MaterialKind::Lambert)
        }
    }

    /// A Blinn-Phong lit material.
    pub fn phong(color: LinearRgba, shininess: f32) -> Self {
        Self {
            color,
            ..Self::new(MaterialKind::Phong {
                specular: LinearRgba::rgb(0.07, 0.07, 0.07),
                shininess,
            })
        }
    }

    /// A metallic/roughness material without transmission.
    pub fn standard(color: LinearRgba, metalness: f32, roughness: f32) -> Self {
        Self {
            color,
            ..Self::new(MaterialKind::Standard {
                metalness,
                roughness,
                transmission: 0.0,
                thickness: 0.0,
                ior: 1.5,
            })
        }
    }

    /// A depth-only material.
    pub fn depth() -> Self {
        Self {
            fog: false,
            ..Self::new(MaterialKind::Depth)
        }
    }

    /// A material running user-provided sources.
    pub fn custom(shader: CustomShader) -> Self {
        Self::new(MaterialKind::Custom(shader))
    }

    /// Marks the material as edited.
    pub fn needs_update(&mut self) {
        self.version += 1;
    }

    /// The edit counter bumped by [`Material::needs_update`].
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The transmission factor. Only standard materials transmit light.
    pub fn transmission(&self) -> f32 {
        match self.kind {
            MaterialKind::Standard { transmission, .. } => transmission,
            _ => 0.0,
        }
    }

    /// Returns `true` if the generated code reads light uniforms.
    pub fn uses_lights(&self) -> bool {
        match &self.kind {
            MaterialKind::Lambert | MaterialKind::Phong { .. } | MaterialKind::Standard { .. } => true,
            MaterialKind::Custom(shader) => shader.lights,
            MaterialKind::Basic | MaterialKind::Depth => false,
        }
    }

    /// The blend mode actually applied. Opaque materials with normal blending
    /// write their color straight through.
    pub fn effective_blending(&self) -> BlendMode {
        if !self.transparent && self.blending == BlendMode::Normal {
            BlendMode::None
        } else {
            self.blending
        }
    }

    /// The depth state of the material.
    pub fn depth_state(&self) -> DepthState {
        DepthState {
            test: self.depth_test,
            write: self.depth_write,
            func: self.depth_func,
        }
    }

    /// Derives the feature key. Any change to a code-affecting option produces
    /// a different key.
    pub fn feature_key(&self) -> FeatureKey {
        let mut features = MaterialFeatures::empty();
        features.set(MaterialFeatures::MAP, self.map.is_some());
        features.set(MaterialFeatures::VERTEX_COLORS, self.vertex_colors);
        features.set(MaterialFeatures::ALPHA_TEST, self.alpha_test > 0.0);
        features.set(MaterialFeatures::FOG, self.fog);
        features.set(MaterialFeatures::FLAT_SHADING, self.flat_shading);
        features.set(MaterialFeatures::DOUBLE_SIDED, self.side == Side::Double);
        features.set(MaterialFeatures::BACK_SIDE, self.side == Side::Back);
        features.set(MaterialFeatures::TRANSMISSION, self.transmission() > 0.0);

        let source_hash = match &self.kind {
            MaterialKind::Custom(shader) => shader.source_hash,
            _ => 0,
        };

        FeatureKey {
            kind: self.kind.tag(),
            features,
            source_hash,
        }
    }

    /// Combines the feature key with the frame environment, dropping the
    /// environment inputs this material's code ignores.
    pub fn program_key(&self, environment: EnvironmentSignature) -> ProgramKey {
        let mut environment = environment;
        if !self.uses_lights() {
            environment = environment.without_lights();
        }
        if !self.fog {
            environment = environment.without_fog();
        }
        ProgramKey {
            feature: self.feature_key(),
            environment,
        }
    }
}
