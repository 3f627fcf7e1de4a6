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

//! Contracts and data shared by every part of the renderer.

pub mod api;
pub mod environment;
pub mod error;
pub mod light;
pub mod traits;

pub use self::api::*;
pub use self::environment::{Environment, EnvironmentSignature, FogKind, LightCounts, OutputColorSpace, ToneMapping};
pub use self::error::{CacheError, ResourceError};
pub use self::light::{Light, LightKind, ShadowSettings};
pub use self::traits::*;
