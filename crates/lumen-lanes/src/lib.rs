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

//! Per-frame lanes of the Lumen renderer.
//!
//! A lane is a unit of hot-path work run once per frame: propagating
//! transforms down the scene graph, building the sorted render lists, and
//! computing shadow views. Lanes own at most some pooled scratch memory and
//! never touch the GPU.

#![warn(missing_docs)]

pub mod render_lane;
pub mod scene_lane;
