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

//! The render agent: device resource caching and frame orchestration.
//!
//! A frame runs in fixed stages. Context events and pending disposals are
//! handled first, then transforms are propagated and lights collected. Shadow
//! maps are rendered for every shadow-casting light, an optional transmission
//! pass captures the opaque scene, and the main pass draws the opaque,
//! transmissive and transparent buckets in that order.

mod agent;
mod bindings;
pub mod cache;
mod draw;
mod error;
pub mod shaders;
pub mod state;
mod stats;

pub use agent::FrameRenderer;
pub use error::RenderError;
pub use stats::FrameStats;
