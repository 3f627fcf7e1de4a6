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

//! Shader program descriptors, reflection data and uniform values.

use super::UniformLocation;
use crate::math::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// The sources of a program to compile and link.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramDescriptor {
    /// A debug label, used in compile error reports.
    pub label: String,
    /// The vertex stage source.
    pub vertex_source: String,
    /// The fragment stage source.
    pub fragment_source: String,
}

/// The declared type of an active uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// `float`
    Float,
    /// `int`
    Int,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `mat3`
    Mat3,
    /// `mat4`
    Mat4,
    /// `sampler2D`, set with a texture unit index.
    Sampler2D,
}

/// An active uniform of a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    /// The uniform name. Array elements are reported as `name[i]`.
    pub name: String,
    /// The declared type.
    pub ty: UniformType,
    /// The location to pass to `set_uniform`.
    pub location: UniformLocation,
}

/// An active vertex attribute of a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    /// The attribute name, matched against geometry attribute names.
    pub name: String,
    /// The binding slot.
    pub location: u32,
}

/// Everything the renderer needs to know about a linked program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramReflection {
    /// Active uniforms.
    pub uniforms: Vec<UniformInfo>,
    /// Active vertex attributes.
    pub attributes: Vec<AttributeInfo>,
}

/// A value uploaded to a uniform location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// A single float.
    Float(f32),
    /// A single int.
    Int(i32),
    /// A two component vector.
    Vec2(Vec2),
    /// A three component vector.
    Vec3(Vec3),
    /// A four component vector.
    Vec4(Vec4),
    /// A 3x3 matrix.
    Mat3(Mat3),
    /// A 4x4 matrix.
    Mat4(Mat4),
    /// A texture unit index for a sampler.
    Sampler(u32),
}

impl UniformValue {
    /// Compares two values bit for bit.
    ///
    /// Unlike `==`, this treats `NaN` as equal to itself and distinguishes
    /// `0.0` from `-0.0`, matching what the GPU would actually receive.
    pub fn same_bits(&self, other: &Self) -> bool {
        use UniformValue::*;
        match (self, other) {
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Int(a), Int(b)) => a == b,
            (Sampler(a), Sampler(b)) => a == b,
            (Vec2(a), Vec2(b)) => bytemuck::bytes_of(a) == bytemuck::bytes_of(b),
            (Vec3(a), Vec3(b)) => bytemuck::bytes_of(a) == bytemuck::bytes_of(b),
            (Vec4(a), Vec4(b)) => bytemuck::bytes_of(a) == bytemuck::bytes_of(b),
            (Mat3(a), Mat3(b)) => bytemuck::bytes_of(a) == bytemuck::bytes_of(b),
            (Mat4(a), Mat4(b)) => bytemuck::bytes_of(a) == bytemuck::bytes_of(b),
            _ => false,
        }
    }

    /// The uniform type this value can be assigned to.
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
            UniformValue::Sampler(_) => UniformType::Sampler2D,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_bits_handles_nan_and_signed_zero() {
        let nan = UniformValue::Float(f32::NAN);
        assert!(nan.same_bits(&nan));
        assert_ne!(nan, nan);

        let pos = UniformValue::Float(0.0);
        let neg = UniformValue::Float(-0.0);
        assert_eq!(pos, neg);
        assert!(!pos.same_bits(&neg));
    }

    #[test]
    fn test_same_bits_rejects_different_variants() {
        assert!(!UniformValue::Int(1).same_bits(&UniformValue::Sampler(1)));
        assert!(UniformValue::Mat4(Mat4::IDENTITY).same_bits(&UniformValue::Mat4(Mat4::IDENTITY)));
    }
}
