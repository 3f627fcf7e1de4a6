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

//! The lighting and output environment that selects a program variant.
//!
//! Two materials with the same feature key still need different programs when
//! the scene around them differs: more lights, a different fog model, another
//! output encoding. [`EnvironmentSignature`] packs those inputs into one
//! integer so that the program cache key stays a cheap composition of two words.

use serde::{Deserialize, Serialize};

/// The fog model applied to lit and unlit materials that opt into fog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FogKind {
    /// No fog.
    #[default]
    None,
    /// Fog grows linearly between a near and a far distance.
    Linear,
    /// Fog grows with the squared exponential of the distance.
    Exponential,
}

/// The encoding of the final color written to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputColorSpace {
    /// Linear values, used for offscreen targets that are sampled again.
    Linear,
    /// sRGB encoded values for display.
    #[default]
    Srgb,
}

/// The tone mapping operator applied before output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToneMapping {
    /// Values are clamped.
    #[default]
    None,
    /// Exposure only.
    Linear,
    /// Reinhard operator.
    Reinhard,
    /// ACES filmic approximation.
    AcesFilmic,
}

/// The number of active lights of each kind in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightCounts {
    /// Ambient lights. They are summed into a single term.
    pub ambient: u32,
    /// Hemisphere lights.
    pub hemisphere: u32,
    /// Directional lights.
    pub directional: u32,
    /// Point lights.
    pub point: u32,
    /// Spot lights.
    pub spot: u32,
    /// Directional lights with a shadow map.
    pub directional_shadows: u32,
    /// Point lights with a shadow map.
    pub point_shadows: u32,
    /// Spot lights with a shadow map.
    pub spot_shadows: u32,
}

/// The inputs of a frame that change generated shader code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Environment {
    /// Active light counts.
    pub lights: LightCounts,
    /// The fog model.
    pub fog: FogKind,
    /// Output encoding of the current target.
    pub color_space: OutputColorSpace,
    /// Tone mapping of the current target.
    pub tone_mapping: ToneMapping,
    /// The number of active user clipping planes.
    pub clipping_planes: u32,
}

impl Environment {
    /// The environment used for offscreen targets: linear output, no tone mapping.
    pub fn for_offscreen(&self) -> Self {
        Self {
            color_space: OutputColorSpace::Linear,
            tone_mapping: ToneMapping::None,
            ..*self
        }
    }

    /// Packs the environment into a signature.
    pub fn signature(&self) -> EnvironmentSignature {
        EnvironmentSignature::pack(self)
    }
}

const COUNT_BITS: u32 = 6;
const COUNT_MAX: u32 = (1 << COUNT_BITS) - 1;
const LIGHT_FIELDS: u32 = 8;
const LIGHT_MASK: u64 = (1 << (COUNT_BITS * LIGHT_FIELDS)) - 1;
const FOG_SHIFT: u32 = COUNT_BITS * LIGHT_FIELDS;
const COLOR_SPACE_SHIFT: u32 = FOG_SHIFT + 2;
const TONE_MAPPING_SHIFT: u32 = COLOR_SPACE_SHIFT + 1;
const CLIPPING_SHIFT: u32 = TONE_MAPPING_SHIFT + 3;
const CLIPPING_MAX: u32 = 15;

/// A packed [`Environment`].
///
/// Layout, from the least significant bit: eight 6-bit light counts (ambient,
/// hemisphere, directional, point, spot, then the three shadow counts), 2 bits
/// of fog kind, 1 bit of color space, 3 bits of tone mapping and 4 bits of
/// clipping plane count. Counts saturate at their field maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EnvironmentSignature(pub u64);

impl EnvironmentSignature {
    /// Packs an environment.
    pub fn pack(env: &Environment) -> Self {
        let l = &env.lights;
        let counts = [
            l.ambient,
            l.hemisphere,
            l.directional,
            l.point,
            l.spot,
            l.directional_shadows,
            l.point_shadows,
            l.spot_shadows,
        ];
        let mut bits = counts.iter().enumerate().fold(0u64, |acc, (i, &count)| {
            acc | (count.min(COUNT_MAX) as u64) << (i as u32 * COUNT_BITS)
        });

        bits |= (match env.fog {
            FogKind::None => 0u64,
            FogKind::Linear => 1,
            FogKind::Exponential => 2,
        }) << FOG_SHIFT;
        bits |= (match env.color_space {
            OutputColorSpace::Linear => 0u64,
            OutputColorSpace::Srgb => 1,
        }) << COLOR_SPACE_SHIFT;
        bits |= (match env.tone_mapping {
            ToneMapping::None => 0u64,
            ToneMapping::Linear => 1,
            ToneMapping::Reinhard => 2,
            ToneMapping::AcesFilmic => 3,
        }) << TONE_MAPPING_SHIFT;
        bits |= (env.clipping_planes.min(CLIPPING_MAX) as u64) << CLIPPING_SHIFT;
        Self(bits)
    }

    /// Returns the signature with every light count cleared, for materials
    /// whose code does not depend on lighting.
    #[inline]
    pub fn without_lights(self) -> Self {
        Self(self.0 & !LIGHT_MASK)
    }

    /// Returns the signature with the fog bits cleared.
    #[inline]
    pub fn without_fog(self) -> Self {
        Self(self.0 & !(0b11 << FOG_SHIFT))
    }

    /// The packed light count at `field` (0 = ambient .. 7 = spot shadows).
    pub fn light_count(self, field: u32) -> u32 {
        ((self.0 >> (field * COUNT_BITS)) & COUNT_MAX as u64) as u32
    }

    /// Decodes the signature. Counts that saturated when packing come back
    /// at their field maximum.
    pub fn unpack(self) -> Environment {
        let lights = LightCounts {
            ambient: self.light_count(0),
            hemisphere: self.light_count(1),
            directional: self.light_count(2),
            point: self.light_count(3),
            spot: self.light_count(4),
            directional_shadows: self.light_count(5),
            point_shadows: self.light_count(6),
            spot_shadows: self.light_count(7),
        };
        let fog = match (self.0 >> FOG_SHIFT) & 0b11 {
            1 => FogKind::Linear,
            2 => FogKind::Exponential,
            _ => FogKind::None,
        };
        let color_space = match (self.0 >> COLOR_SPACE_SHIFT) & 1 {
            1 => OutputColorSpace::Srgb,
            _ => OutputColorSpace::Linear,
        };
        let tone_mapping = match (self.0 >> TONE_MAPPING_SHIFT) & 0b111 {
            1 => ToneMapping::Linear,
            2 => ToneMapping::Reinhard,
            3 => ToneMapping::AcesFilmic,
            _ => ToneMapping::None,
        };
        Environment {
            lights,
            fog,
            color_space,
            tone_mapping,
            clipping_planes: ((self.0 >> CLIPPING_SHIFT) & CLIPPING_MAX as u64) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_environment() -> Environment {
        Environment {
            lights: LightCounts {
                ambient: 1,
                directional: 2,
                directional_shadows: 1,
                ..Default::default()
            },
            fog: FogKind::Linear,
            ..Default::default()
        }
    }

    #[test]
    fn test_signature_changes_with_every_input() {
        let base = lit_environment();
        let mut variants = vec![base];
        let mut more_lights = base;
        more_lights.lights.point = 1;
        variants.push(more_lights);
        variants.push(Environment {
            fog: FogKind::Exponential,
            ..base
        });
        variants.push(base.for_offscreen());
        variants.push(Environment {
            tone_mapping: ToneMapping::AcesFilmic,
            ..base
        });
        variants.push(Environment {
            clipping_planes: 2,
            ..base
        });

        let signatures: std::collections::HashSet<_> =
            variants.iter().map(|e| e.signature()).collect();
        assert_eq!(signatures.len(), variants.len());
    }

    #[test]
    fn test_without_lights_ignores_light_counts() {
        let a = lit_environment();
        let mut b = a;
        b.lights.spot = 3;
        assert_ne!(a.signature(), b.signature());
        assert_eq!(a.signature().without_lights(), b.signature().without_lights());
        assert_ne!(
            a.signature().without_lights(),
            a.for_offscreen().signature().without_lights()
        );
    }

    #[test]
    fn test_light_count_round_trip_and_saturation() {
        let mut env = lit_environment();
        env.lights.point = 500;
        let sig = env.signature();
        assert_eq!(sig.light_count(2), 2);
        assert_eq!(sig.light_count(3), 63);
        assert_eq!(sig.light_count(5), 1);
    }

    #[test]
    fn test_unpack_restores_the_environment() {
        let env = Environment {
            tone_mapping: ToneMapping::Reinhard,
            clipping_planes: 3,
            ..lit_environment()
        };
        assert_eq!(env.signature().unpack(), env);
        assert_eq!(env.signature().without_fog().unpack().fog, FogKind::None);
    }
}
