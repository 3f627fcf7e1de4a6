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

//! Last-known device state, used to skip redundant device calls.
//!
//! Every setter compares against the snapshot and only reaches the device
//! when the value differs. A `None` field means "unknown": the next set
//! always goes through. After a context loss the snapshot is reset to
//! unknown.

use ahash::AHashMap;
use lumen_core::renderer::{
    BlendMode, BufferId, CompareFunction, CullFace, DepthState, FramebufferId, FrontFace,
    GraphicsDevice, IndexFormat, ProgramId, StencilState, TextureId, UniformLocation,
    UniformValue,
};

/// A vertex buffer bound to an attribute location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VertexBinding {
    buffer: BufferId,
    item_size: u32,
    normalized: bool,
}

/// The pipeline state snapshot.
#[derive(Debug, Default)]
pub struct GpuStateCache {
    framebuffer: Option<Option<FramebufferId>>,
    viewport: Option<(u32, u32, u32, u32)>,
    program: Option<ProgramId>,
    blend: Option<BlendMode>,
    depth_test: Option<bool>,
    depth_write: Option<bool>,
    depth_func: Option<CompareFunction>,
    cull_face: Option<CullFace>,
    front_face: Option<FrontFace>,
    stencil: Option<Option<StencilState>>,
    textures: AHashMap<u32, Option<TextureId>>,
    vertex_buffers: AHashMap<u32, VertexBinding>,
    index_buffer: Option<Option<BufferId>>,
    // Device calls issued since the last reset of the counter.
    changes: u32,
}

impl GpuStateCache {
    /// Creates a snapshot where everything is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every known value.
    pub fn reset(&mut self) {
        *self = Self {
            changes: self.changes,
            ..Self::default()
        };
    }

    /// Device calls issued since the last [`Self::take_changes`].
    pub fn changes(&self) -> u32 {
        self.changes
    }

    /// Returns and zeroes the change counter.
    pub fn take_changes(&mut self) -> u32 {
        std::mem::take(&mut self.changes)
    }

    /// The program the device is known to use.
    pub fn current_program(&self) -> Option<ProgramId> {
        self.program
    }

    /// The framebuffer the device is known to draw into. `None` if unknown,
    /// `Some(None)` for the default surface.
    pub fn bound_framebuffer(&self) -> Option<Option<FramebufferId>> {
        self.framebuffer
    }

    /// Binds a framebuffer, `None` for the default surface.
    pub fn bind_framebuffer(&mut self, device: &mut dyn GraphicsDevice, framebuffer: Option<FramebufferId>) {
        if self.framebuffer != Some(framebuffer) {
            device.bind_framebuffer(framebuffer);
            self.framebuffer = Some(framebuffer);
            self.changes += 1;
        }
    }

    /// Sets the viewport rectangle.
    pub fn set_viewport(&mut self, device: &mut dyn GraphicsDevice, x: u32, y: u32, width: u32, height: u32) {
        let viewport = (x, y, width, height);
        if self.viewport != Some(viewport) {
            device.set_viewport(x, y, width, height);
            self.viewport = Some(viewport);
            self.changes += 1;
        }
    }

    /// Makes `program` current.
    pub fn use_program(&mut self, device: &mut dyn GraphicsDevice, program: ProgramId) {
        if self.program != Some(program) {
            device.use_program(program);
            self.program = Some(program);
            self.changes += 1;
        }
    }

    /// Forgets `program` if it is current, so a re-created program with a
    /// recycled id is bound again.
    pub fn forget_program(&mut self, program: ProgramId) {
        if self.program == Some(program) {
            self.program = None;
        }
    }

    /// Sets the blend mode.
    pub fn set_blend_mode(&mut self, device: &mut dyn GraphicsDevice, mode: BlendMode) {
        if self.blend != Some(mode) {
            device.set_blend_mode(mode);
            self.blend = Some(mode);
            self.changes += 1;
        }
    }

    /// Sets depth test, depth write and the depth comparison.
    pub fn set_depth_state(&mut self, device: &mut dyn GraphicsDevice, depth: DepthState) {
        if self.depth_test != Some(depth.test) {
            device.set_depth_test(depth.test);
            self.depth_test = Some(depth.test);
            self.changes += 1;
        }
        if self.depth_write != Some(depth.write) {
            device.set_depth_write(depth.write);
            self.depth_write = Some(depth.write);
            self.changes += 1;
        }
        if self.depth_func != Some(depth.func) {
            device.set_depth_func(depth.func);
            self.depth_func = Some(depth.func);
            self.changes += 1;
        }
    }

    /// Sets which faces are culled and the winding of front faces.
    pub fn set_culling(&mut self, device: &mut dyn GraphicsDevice, cull: CullFace, front_face: FrontFace) {
        if self.cull_face != Some(cull) {
            device.set_cull_face(cull);
            self.cull_face = Some(cull);
            self.changes += 1;
        }
        if self.front_face != Some(front_face) {
            device.set_front_face(front_face);
            self.front_face = Some(front_face);
            self.changes += 1;
        }
    }

    /// Sets the stencil state, `None` to disable the stencil test.
    pub fn set_stencil_state(&mut self, device: &mut dyn GraphicsDevice, stencil: Option<StencilState>) {
        if self.stencil != Some(stencil) {
            device.set_stencil_state(stencil);
            self.stencil = Some(stencil);
            self.changes += 1;
        }
    }

    /// Binds a texture to a unit.
    pub fn bind_texture(&mut self, device: &mut dyn GraphicsDevice, unit: u32, texture: Option<TextureId>) {
        if self.textures.get(&unit) != Some(&texture) {
            device.bind_texture(unit, texture);
            self.textures.insert(unit, texture);
            self.changes += 1;
        }
    }

    /// Binds a vertex buffer to an attribute location.
    pub fn bind_vertex_buffer(
        &mut self,
        device: &mut dyn GraphicsDevice,
        location: u32,
        buffer: BufferId,
        item_size: u32,
        normalized: bool,
    ) {
        let binding = VertexBinding {
            buffer,
            item_size,
            normalized,
        };
        if self.vertex_buffers.get(&location) != Some(&binding) {
            device.bind_vertex_buffer(location, buffer, item_size, normalized);
            self.vertex_buffers.insert(location, binding);
            self.changes += 1;
        }
    }

    /// Binds or unbinds the index buffer.
    pub fn bind_index_buffer(&mut self, device: &mut dyn GraphicsDevice, buffer: Option<BufferId>, format: IndexFormat) {
        if self.index_buffer != Some(buffer) {
            device.bind_index_buffer(buffer, format);
            self.index_buffer = Some(buffer);
            self.changes += 1;
        }
    }

    /// Forgets bindings of deleted buffers and textures, whose ids the device
    /// may hand out again.
    pub fn forget_deleted(&mut self, buffers: &[BufferId], textures: &[TextureId]) {
        self.vertex_buffers.retain(|_, binding| !buffers.contains(&binding.buffer));
        if let Some(Some(index)) = self.index_buffer {
            if buffers.contains(&index) {
                self.index_buffer = None;
            }
        }
        self.textures.retain(|_, bound| !bound.is_some_and(|texture| textures.contains(&texture)));
    }

    /// Forgets deleted framebuffers, whose ids the device may hand out again.
    pub fn forget_deleted_framebuffers(&mut self, framebuffers: &[FramebufferId]) {
        if let Some(Some(bound)) = self.framebuffer {
            if framebuffers.contains(&bound) {
                self.framebuffer = None;
            }
        }
    }

    /// Forgets the blend, depth, stencil and culling state, so the next
    /// material applies all of it again.
    pub fn forget_material_state(&mut self) {
        self.blend = None;
        self.depth_test = None;
        self.depth_write = None;
        self.depth_func = None;
        self.cull_face = None;
        self.front_face = None;
        self.stencil = None;
    }
}

/// The last value written to every uniform of every program.
#[derive(Debug, Default)]
pub struct UniformCache {
    values: AHashMap<(ProgramId, UniformLocation), UniformValue>,
    uploads: u32,
}

impl UniformCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` to `location` of the current program `program`,
    /// unless the same bits were written last time.
    ///
    /// ## Returns
    /// `true` if the device was called.
    pub fn set(
        &mut self,
        device: &mut dyn GraphicsDevice,
        program: ProgramId,
        location: UniformLocation,
        value: UniformValue,
    ) -> bool {
        match self.values.get(&(program, location)) {
            Some(last) if last.same_bits(&value) => false,
            _ => {
                device.set_uniform(location, &value);
                self.values.insert((program, location), value);
                self.uploads += 1;
                true
            }
        }
    }

    /// Forgets every value of a deleted program.
    pub fn forget_program(&mut self, program: ProgramId) {
        self.values.retain(|(owner, _), _| *owner != program);
    }

    /// Returns and zeroes the upload counter.
    pub fn take_uploads(&mut self) -> u32 {
        std::mem::take(&mut self.uploads)
    }

    /// Forgets every value.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
