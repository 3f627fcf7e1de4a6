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

//! Defines light types for the rendering system.
//!
//! A light is attached to a scene node. Its position and orientation come from
//! the node's world matrix: positional lights sit at the node origin and
//! directional/spot lights shine along the node's local `-Z` axis.

use crate::math::{LinearRgba, Vec3};

/// The shape-specific parameters of a light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Uniform light reaching every surface equally.
    Ambient,
    /// Sky/ground gradient chosen by how much a normal faces the node's `+Y` axis.
    Hemisphere {
        /// The color seen by normals facing away from the sky.
        ground_color: LinearRgba,
    },
    /// Parallel rays from an infinitely distant source, like the sun.
    Directional,
    /// Light emitted in all directions from a point.
    Point {
        /// Distance at which the light reaches zero. `0.0` means unlimited.
        range: f32,
        /// How fast the light dims with distance. `2.0` is physically correct.
        decay: f32,
    },
    /// Light emitted in a cone from a point.
    Spot {
        /// Distance at which the light reaches zero. `0.0` means unlimited.
        range: f32,
        /// Half-angle of the cone, in radians.
        angle: f32,
        /// Fraction of the cone that fades out, in `[0, 1]`.
        penumbra: f32,
        /// How fast the light dims with distance.
        decay: f32,
    },
}

/// Shadow map parameters of a shadow-casting light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    /// Width and height of the depth map in texels.
    pub map_size: u32,
    /// Depth offset applied when sampling, to avoid acne.
    pub bias: f32,
    /// Near plane of the shadow camera.
    pub near: f32,
    /// Far plane of the shadow camera.
    pub far: f32,
    /// Half-size of the orthographic shadow camera of a directional light.
    pub extent: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: 1024,
            bias: 0.005,
            near: 0.5,
            far: 500.0,
            extent: 10.0,
        }
    }
}

/// A light source.
///
/// # Examples
///
/// ```
/// use lumen_core::renderer::light::{Light, LightKind, ShadowSettings};
/// use lumen_core::math::LinearRgba;
///
/// // A warm sun casting shadows.
/// let sun = Light::directional(LinearRgba::rgb(1.0, 0.95, 0.8), 1.5)
///     .with_shadow(ShadowSettings::default());
/// assert!(sun.casts_shadow());
/// assert!(matches!(sun.kind, LightKind::Directional));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// The shape of the light.
    pub kind: LightKind,
    /// The color in linear space.
    pub color: LinearRgba,
    /// A multiplier applied to `color`.
    pub intensity: f32,
    /// Shadow settings. `None` for lights that do not cast shadows.
    pub shadow: Option<ShadowSettings>,
}

impl Light {
    /// Creates an ambient light.
    pub fn ambient(color: LinearRgba, intensity: f32) -> Self {
        Self::new(LightKind::Ambient, color, intensity)
    }

    /// Creates a hemisphere light.
    pub fn hemisphere(sky_color: LinearRgba, ground_color: LinearRgba, intensity: f32) -> Self {
        Self::new(LightKind::Hemisphere { ground_color }, sky_color, intensity)
    }

    /// Creates a directional light.
    pub fn directional(color: LinearRgba, intensity: f32) -> Self {
        Self::new(LightKind::Directional, color, intensity)
    }

    /// Creates a point light with physical decay.
    pub fn point(color: LinearRgba, intensity: f32, range: f32) -> Self {
        Self::new(LightKind::Point { range, decay: 2.0 }, color, intensity)
    }

    /// Creates a spot light with physical decay.
    pub fn spot(color: LinearRgba, intensity: f32, range: f32, angle: f32, penumbra: f32) -> Self {
        Self::new(
            LightKind::Spot {
                range,
                angle,
                penumbra,
                decay: 2.0,
            },
            color,
            intensity,
        )
    }

    fn new(kind: LightKind, color: LinearRgba, intensity: f32) -> Self {
        Self {
            kind,
            color,
            intensity,
            shadow: None,
        }
    }

    /// Enables shadow casting.
    ///
    /// Ambient and hemisphere lights never cast shadows; the settings are ignored for them.
    pub fn with_shadow(mut self, shadow: ShadowSettings) -> Self {
        self.shadow = Some(shadow);
        self
    }

    /// Returns `true` if this light renders a shadow map.
    pub fn casts_shadow(&self) -> bool {
        self.shadow.is_some()
            && matches!(
                self.kind,
                LightKind::Directional | LightKind::Point { .. } | LightKind::Spot { .. }
            )
    }

    /// The color premultiplied by the intensity.
    pub fn radiance(&self) -> Vec3 {
        self.color.scaled_rgb(self.intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambient_light_never_casts_shadow() {
        let light = Light::ambient(LinearRgba::WHITE, 0.3).with_shadow(ShadowSettings::default());
        assert!(!light.casts_shadow());
    }

    #[test]
    fn test_radiance_scales_color() {
        let light = Light::point(LinearRgba::rgb(1.0, 0.5, 0.0), 2.0, 10.0);
        assert_eq!(light.radiance(), Vec3::new(2.0, 1.0, 0.0));
    }
}
