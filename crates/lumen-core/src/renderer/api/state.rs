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

//! Fixed-function pipeline state.
//!
//! These are the values the frame renderer tracks in its state snapshot so that
//! each device call is only issued when the value actually changes.

use serde::{Deserialize, Serialize};

/// How fragment colors are combined with the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Blending disabled; the fragment replaces the destination.
    None,
    /// Classic alpha blending: `src * a + dst * (1 - a)`.
    #[default]
    Normal,
    /// `src * a + dst`.
    Additive,
    /// `dst - src * a`.
    Subtractive,
    /// `src * dst`.
    Multiply,
}

/// Which faces of a material are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    /// Front faces only.
    #[default]
    Front,
    /// Back faces only.
    Back,
    /// Both faces.
    Double,
}

/// The faces discarded by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    /// No culling.
    None,
    /// Cull back faces.
    Back,
    /// Cull front faces.
    Front,
}

impl From<Side> for CullFace {
    fn from(side: Side) -> Self {
        match side {
            Side::Front => CullFace::Back,
            Side::Back => CullFace::Front,
            Side::Double => CullFace::None,
        }
    }
}

/// The winding order that defines a front face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    /// Counter-clockwise.
    #[default]
    Ccw,
    /// Clockwise.
    Cw,
}

impl FrontFace {
    /// The opposite winding.
    pub fn flipped(self) -> Self {
        match self {
            FrontFace::Ccw => FrontFace::Cw,
            FrontFace::Cw => FrontFace::Ccw,
        }
    }
}

/// A comparison used by depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if the new value is less than the stored one.
    Less,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the new value is less than or equal to the stored one.
    #[default]
    LessEqual,
    /// Passes if the new value is greater than the stored one.
    Greater,
    /// Passes if the values differ.
    NotEqual,
    /// Passes if the new value is greater than or equal to the stored one.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// What happens to the stencil value after a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StencilOperation {
    /// Keep the current value.
    #[default]
    Keep,
    /// Set to zero.
    Zero,
    /// Set to the reference value.
    Replace,
    /// Increment, clamping at the maximum.
    Increment,
    /// Decrement, clamping at zero.
    Decrement,
    /// Bitwise invert.
    Invert,
}

/// Stencil test configuration. `None` in a material means the test is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StencilState {
    /// The comparison against the reference.
    pub func: CompareFunction,
    /// The reference value.
    pub reference: u32,
    /// Mask applied to both operands of the comparison.
    pub read_mask: u32,
    /// Mask applied when writing.
    pub write_mask: u32,
    /// Operation when the stencil test fails.
    pub fail: StencilOperation,
    /// Operation when the stencil test passes but the depth test fails.
    pub depth_fail: StencilOperation,
    /// Operation when both tests pass.
    pub pass: StencilOperation,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            func: CompareFunction::Always,
            reference: 0,
            read_mask: 0xff,
            write_mask: 0xff,
            fail: StencilOperation::Keep,
            depth_fail: StencilOperation::Keep,
            pass: StencilOperation::Keep,
        }
    }
}

/// Depth test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    /// Whether fragments are tested against the depth buffer.
    pub test: bool,
    /// Whether passing fragments write their depth.
    pub write: bool,
    /// The depth comparison.
    pub func: CompareFunction,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test: true,
            write: true,
            func: CompareFunction::LessEqual,
        }
    }
}
