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

//! Defines the `GraphicsDevice` trait, the immediate-mode GPU contract.

use crate::math::LinearRgba;
use crate::renderer::api::{
    BlendMode, BufferDescriptor, BufferId, CompareFunction, CullFace, DrawCall,
    FramebufferDescriptor, FramebufferId, FrontFace, IndexFormat, ProgramDescriptor, ProgramId,
    ProgramReflection, StencilState, TextureDescriptor, TextureId, UniformLocation, UniformValue,
};
use crate::renderer::error::ResourceError;

/// A change in the availability of the device context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextEvent {
    /// The context was lost. Every object created before this event is gone.
    Lost,
    /// The context is usable again. Objects must be created anew.
    Restored,
}

/// An immediate-mode graphics device.
///
/// Objects are created, updated and destroyed through `Result`-returning
/// calls. Pipeline state is a single mutable context that the `set_*` and
/// `bind_*` calls change one value at a time. The device does not filter
/// redundant state changes; that is the caller's job.
///
/// While the context is lost, object calls fail with
/// [`ResourceError::ContextLost`] and state calls are ignored.
pub trait GraphicsDevice {
    // --- Programs ---

    /// Compiles and links a program.
    fn create_program(&mut self, descriptor: &ProgramDescriptor) -> Result<ProgramId, ResourceError>;

    /// Returns the active uniforms and attributes of a linked program.
    fn program_reflection(&self, id: ProgramId) -> Result<ProgramReflection, ResourceError>;

    /// Deletes a program.
    fn delete_program(&mut self, id: ProgramId) -> Result<(), ResourceError>;

    // --- Buffers ---

    /// Creates a buffer of `descriptor.size` bytes initialized with `data`.
    fn create_buffer(&mut self, descriptor: &BufferDescriptor, data: &[u8]) -> Result<BufferId, ResourceError>;

    /// Overwrites part of a buffer.
    fn update_buffer(&mut self, id: BufferId, offset: usize, data: &[u8]) -> Result<(), ResourceError>;

    /// Deletes a buffer.
    fn delete_buffer(&mut self, id: BufferId) -> Result<(), ResourceError>;

    // --- Textures & framebuffers ---

    /// Creates a texture, optionally with initial texel data.
    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<TextureId, ResourceError>;

    /// Replaces all texel data of a texture.
    fn update_texture(&mut self, id: TextureId, data: &[u8]) -> Result<(), ResourceError>;

    /// Deletes a texture.
    fn delete_texture(&mut self, id: TextureId) -> Result<(), ResourceError>;

    /// Creates a framebuffer from existing textures.
    fn create_framebuffer(&mut self, descriptor: &FramebufferDescriptor) -> Result<FramebufferId, ResourceError>;

    /// Deletes a framebuffer. Its attachments are not deleted.
    fn delete_framebuffer(&mut self, id: FramebufferId) -> Result<(), ResourceError>;

    // --- Pipeline state ---

    /// Binds a framebuffer, or the default surface for `None`.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Sets the viewport rectangle.
    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// Clears the bound framebuffer. `None` leaves that aspect untouched.
    fn clear(&mut self, color: Option<LinearRgba>, depth: Option<f32>, stencil: Option<u32>);

    /// Makes a program current.
    fn use_program(&mut self, program: ProgramId);

    /// Sets the blend equation.
    fn set_blend_mode(&mut self, mode: BlendMode);

    /// Enables or disables the depth test.
    fn set_depth_test(&mut self, enabled: bool);

    /// Enables or disables depth writes.
    fn set_depth_write(&mut self, enabled: bool);

    /// Sets the depth comparison.
    fn set_depth_func(&mut self, func: CompareFunction);

    /// Sets which faces are culled.
    fn set_cull_face(&mut self, cull: CullFace);

    /// Sets the front-face winding.
    fn set_front_face(&mut self, front_face: FrontFace);

    /// Configures the stencil test, or disables it for `None`.
    fn set_stencil_state(&mut self, stencil: Option<StencilState>);

    /// Binds a texture to a unit, or unbinds the unit for `None`.
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>);

    /// Binds a vertex buffer to an attribute slot.
    fn bind_vertex_buffer(&mut self, location: u32, buffer: BufferId, item_size: u32, normalized: bool);

    /// Binds an index buffer, or unbinds it for `None`.
    fn bind_index_buffer(&mut self, buffer: Option<BufferId>, format: IndexFormat);

    /// Uploads a uniform value to the current program.
    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    /// Issues a draw with the current state.
    fn draw(&mut self, call: &DrawCall);

    // --- Context ---

    /// Returns the next pending context event, if any.
    fn poll_context_event(&mut self) -> Option<ContextEvent>;

    /// Returns `true` while the context is lost.
    fn is_context_lost(&self) -> bool;
}
