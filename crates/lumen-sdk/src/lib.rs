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

//! The public-facing SDK of the Lumen renderer.
//!
//! [`Engine`] owns a scene graph and a frame renderer and exposes the
//! operations an application needs: building the node tree, attaching
//! drawables and lights, registering resources and rendering frames.
//! [`EngineConfig`] is loaded from RON.

mod config;
mod engine;

pub use config::{ConfigError, EngineConfig, LogLevel};
pub use engine::Engine;

/// The types most applications need.
pub mod prelude {
    pub use crate::{Engine, EngineConfig};
    pub use lumen_agents::{FrameStats, RenderError};
    pub use lumen_core::material::{CustomShader, Material, MaterialKind};
    pub use lumen_core::math::{LinearRgba, Mat4, Quaternion, Vec2, Vec3, Vec4};
    pub use lumen_core::renderer::{GraphicsDevice, Light, LightKind, ShadowSettings, TextureFormat};
    pub use lumen_core::scene::{GeometryId, ImageId, MaterialId, NodeId, ResourceHandle};
    pub use lumen_core::RendererConfig;
    pub use lumen_data::geometry::{shapes, Attribute, Geometry};
    pub use lumen_data::{Camera, Image, RenderTarget, SceneError};
    pub use lumen_infra::HeadlessDevice;
}
