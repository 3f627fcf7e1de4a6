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

//! Renderer configuration.

use serde::{Deserialize, Serialize};

use crate::math::LinearRgba;
use crate::renderer::{FogKind, OutputColorSpace, ToneMapping};

/// Settings read by the frame renderer at the start of every frame.
///
/// Every field has a default, so a configuration file only needs to list what
/// it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Width and height of the default surface in pixels.
    pub surface_size: (u32, u32),
    /// Color the main target is cleared to.
    pub clear_color: LinearRgba,
    /// Output encoding of the default surface and user targets.
    pub output_color_space: OutputColorSpace,
    /// Tone mapping of the default surface and user targets.
    pub tone_mapping: ToneMapping,
    /// Exposure used by tone mapping.
    pub tone_mapping_exposure: f32,
    /// The scene fog model.
    pub fog: FogKind,
    /// Color fogged fragments blend toward.
    pub fog_color: LinearRgba,
    /// Distance where linear fog starts.
    pub fog_near: f32,
    /// Distance where linear fog is complete.
    pub fog_far: f32,
    /// Density of exponential fog.
    pub fog_density: f32,
    /// Renders shadow maps for shadow-casting lights.
    pub shadows_enabled: bool,
    /// Shadow map size for lights whose shadow settings leave it at zero.
    pub default_shadow_map_size: u32,
    /// Sorts render lists. When off, draws follow traversal order.
    pub sort_objects: bool,
    /// Also culls against the world bounding box after the sphere test passes.
    pub cull_with_bounding_box: bool,
    /// Size of the transmission target relative to the surface.
    pub transmission_resolution_scale: f32,
    /// The number of texture units a single draw may use.
    pub max_texture_units: u32,
    /// User clipping planes as `(a, b, c, d)` with `a*x + b*y + c*z + d >= 0`
    /// on the kept side, in world space.
    pub clipping_planes: Vec<[f32; 4]>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            clear_color: LinearRgba::BLACK,
            output_color_space: OutputColorSpace::Srgb,
            tone_mapping: ToneMapping::None,
            tone_mapping_exposure: 1.0,
            fog: FogKind::None,
            fog_color: LinearRgba::WHITE,
            fog_near: 1.0,
            fog_far: 1000.0,
            fog_density: 0.00025,
            shadows_enabled: true,
            default_shadow_map_size: 1024,
            sort_objects: true,
            cull_with_bounding_box: false,
            transmission_resolution_scale: 0.5,
            max_texture_units: 16,
            clipping_planes: Vec::new(),
        }
    }
}

impl RendererConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = RendererConfig::from_ron_str("(shadows_enabled: false, tone_mapping: AcesFilmic)")
            .expect("valid RON");
        assert!(!config.shadows_enabled);
        assert_eq!(config.tone_mapping, ToneMapping::AcesFilmic);
        assert_eq!(config.surface_size, (1280, 720));
    }

    #[test]
    fn test_round_trip_through_ron() {
        let config = RendererConfig {
            clear_color: LinearRgba::rgb(0.1, 0.2, 0.3),
            ..Default::default()
        };
        let text = ron::to_string(&config).expect("serializable");
        assert_eq!(RendererConfig::from_ron_str(&text).expect("parsable"), config);
    }
}
