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

//! Foundational crate of the Lumen renderer.
//!
//! Holds everything the other crates agree on: math primitives, the
//! immediate-mode [`GraphicsDevice`](renderer::GraphicsDevice) contract,
//! material descriptors with their feature keys, the shared scene handle types
//! and the renderer configuration.

#![warn(missing_docs)]

pub mod config;
pub mod event;
pub mod material;
pub mod math;
pub mod renderer;
pub mod scene;

pub use config::RendererConfig;
