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

//! Scene data for the Lumen renderer.
//!
//! The [`SceneGraph`](scene::SceneGraph) owns transform nodes and the
//! geometries, materials and images their drawables share. Everything here is
//! CPU-side; GPU objects are created by the renderer from this data.

#![warn(missing_docs)]

pub mod camera;
pub mod error;
pub mod geometry;
pub mod image;
pub mod render_target;
pub mod scene;

pub use camera::{Camera, Projection};
pub use error::SceneError;
pub use geometry::Geometry;
pub use image::Image;
pub use render_target::{RenderTarget, RenderTargetId};
pub use scene::SceneGraph;
