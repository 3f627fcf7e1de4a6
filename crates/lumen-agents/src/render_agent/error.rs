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

//! Errors returned by the frame renderer.

use lumen_core::renderer::{CacheError, ResourceError};
use lumen_data::SceneError;
use thiserror::Error;

/// An error that aborted a frame.
///
/// Failures local to one drawable, such as a material whose program does not
/// compile, never abort a frame; they are logged and the drawable is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The device lost its context. Reported once per loss; frames rendered
    /// while the context stays lost are skipped without error.
    #[error("the graphics context is lost")]
    ContextLost,
    /// A resource cache rejected an operation, for example an invalid resize.
    #[error(transparent)]
    Cache(CacheError),
    /// A device call failed.
    #[error(transparent)]
    Device(ResourceError),
    /// The scene handed to the renderer is inconsistent.
    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl From<CacheError> for RenderError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Device(err) => err.into(),
            err => RenderError::Cache(err),
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::ContextLost => RenderError::ContextLost,
            err => RenderError::Device(err),
        }
    }
}
