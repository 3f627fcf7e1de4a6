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

//! Defines the error types shared by the device and the resource caches.

use thiserror::Error;

/// An error reported by a [`GraphicsDevice`](super::GraphicsDevice) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// A program failed to compile or link.
    #[error("program '{label}' failed to compile: {log}")]
    ProgramCompile {
        /// The label of the program descriptor.
        label: String,
        /// The compiler output.
        log: String,
    },
    /// A handle does not name a live object of the expected kind.
    #[error("invalid {kind} handle {id}")]
    InvalidHandle {
        /// The object kind (`"buffer"`, `"texture"`, ...).
        kind: &'static str,
        /// The raw handle value.
        id: usize,
    },
    /// A write would go past the end of a buffer.
    #[error("write of {len} bytes at offset {offset} exceeds buffer size {size}")]
    OutOfBounds {
        /// The write offset in bytes.
        offset: usize,
        /// The write length in bytes.
        len: usize,
        /// The buffer size in bytes.
        size: usize,
    },
    /// Uploaded data does not match the size declared at creation.
    #[error("expected {expected} bytes of data, got {actual}")]
    SizeMismatch {
        /// The size required by the descriptor.
        expected: usize,
        /// The size of the provided data.
        actual: usize,
    },
    /// The device context is lost. Every handle it produced is gone.
    #[error("the graphics context is lost")]
    ContextLost,
}

/// An error raised by a resource cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The CPU data of a cached resource changed byte size. GPU buffers and
    /// textures keep their size for life and cannot be resized in place.
    #[error("cannot resize {kind} in place from {old_size} to {new_size} bytes")]
    InvalidResize {
        /// The resource kind.
        kind: &'static str,
        /// The size of the live GPU object.
        old_size: usize,
        /// The size of the new CPU data.
        new_size: usize,
    },
    /// A handle was released after its last reference was already dropped.
    #[error("{kind} released more times than it was acquired")]
    DoubleRelease {
        /// The resource kind.
        kind: &'static str,
    },
    /// The device failed while the cache was creating or updating an object.
    #[error(transparent)]
    Device(#[from] ResourceError),
}

impl CacheError {
    /// Returns `true` if the underlying cause is a lost context.
    pub fn is_context_lost(&self) -> bool {
        matches!(self, CacheError::Device(ResourceError::ContextLost))
    }
}
