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

use std::collections::{HashMap, VecDeque};

use lumen_core::math::LinearRgba;
use lumen_core::renderer::{
    BlendMode, BufferDescriptor, BufferId, BufferUsage, CompareFunction, ContextEvent, CullFace,
    DrawCall, FramebufferDescriptor, FramebufferId, FrontFace, GraphicsDevice, IndexFormat,
    ProgramDescriptor, ProgramId, ProgramReflection, ResourceError, StencilState,
    TextureDescriptor, TextureId, UniformLocation, UniformValue,
};

use super::reflection::{self, Stage};

/// A device call, as recorded by [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    /// `create_program` succeeded.
    CreateProgram(ProgramId),
    /// `delete_program`
    DeleteProgram(ProgramId),
    /// `create_buffer` succeeded.
    CreateBuffer(BufferId),
    /// `update_buffer`
    UpdateBuffer(BufferId),
    /// `delete_buffer`
    DeleteBuffer(BufferId),
    /// `create_texture` succeeded.
    CreateTexture(TextureId),
    /// `update_texture`
    UpdateTexture(TextureId),
    /// `delete_texture`
    DeleteTexture(TextureId),
    /// `create_framebuffer` succeeded.
    CreateFramebuffer(FramebufferId),
    /// `delete_framebuffer`
    DeleteFramebuffer(FramebufferId),
    /// `bind_framebuffer`
    BindFramebuffer(Option<FramebufferId>),
    /// `set_viewport`
    SetViewport(u32, u32, u32, u32),
    /// `clear`
    Clear(Option<LinearRgba>, Option<f32>, Option<u32>),
    /// `use_program`
    UseProgram(ProgramId),
    /// `set_blend_mode`
    SetBlendMode(BlendMode),
    /// `set_depth_test`
    SetDepthTest(bool),
    /// `set_depth_write`
    SetDepthWrite(bool),
    /// `set_depth_func`
    SetDepthFunc(CompareFunction),
    /// `set_cull_face`
    SetCullFace(CullFace),
    /// `set_front_face`
    SetFrontFace(FrontFace),
    /// `set_stencil_state`
    SetStencilState(Option<StencilState>),
    /// `bind_texture`
    BindTexture(u32, Option<TextureId>),
    /// `bind_vertex_buffer`
    BindVertexBuffer(u32, BufferId),
    /// `bind_index_buffer`
    BindIndexBuffer(Option<BufferId>),
    /// `set_uniform`
    SetUniform(UniformLocation, UniformValue),
    /// `draw`
    Draw(DrawCall),
}

/// Per-kind call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounters {
    /// Programs compiled successfully.
    pub programs_created: u32,
    /// Programs that failed to compile.
    pub program_failures: u32,
    /// Programs deleted.
    pub programs_deleted: u32,
    /// Buffers created.
    pub buffers_created: u32,
    /// Buffer updates.
    pub buffer_updates: u32,
    /// Buffers deleted.
    pub buffers_deleted: u32,
    /// Textures created.
    pub textures_created: u32,
    /// Texture updates.
    pub texture_updates: u32,
    /// Textures deleted.
    pub textures_deleted: u32,
    /// Framebuffers created.
    pub framebuffers_created: u32,
    /// Framebuffers deleted.
    pub framebuffers_deleted: u32,
    /// Pipeline state calls: framebuffer, viewport, program, blend, depth,
    /// cull, winding, stencil, texture and buffer bindings.
    pub state_changes: u32,
    /// `set_uniform` calls.
    pub uniform_uploads: u32,
    /// `clear` calls.
    pub clears: u32,
    /// `draw` calls.
    pub draws: u32,
    /// Calls naming a dead handle, a uniform the current program lacks, or a
    /// draw without a program. A well-behaved caller keeps this at zero.
    pub invalid_calls: u32,
}

#[derive(Debug)]
struct ProgramEntry {
    label: String,
    reflection: ProgramReflection,
}

#[derive(Debug)]
struct BufferEntry {
    usage: BufferUsage,
    data: Vec<u8>,
}

#[derive(Debug)]
struct TextureEntry {
    descriptor: TextureDescriptor,
    data: Vec<u8>,
}

/// An immediate-mode device without a GPU.
///
/// Every object is kept in memory with its data, every call is validated
/// against the live objects and counted, and the call sequence is recorded
/// while recording is enabled. Program compilation only checks that each
/// stage is structurally sound; reflection parses the uniform and attribute
/// declarations of the sources.
///
/// Tests can force compile failures with
/// [`HeadlessDevice::fail_programs_containing`] and drop the context with
/// [`HeadlessDevice::simulate_context_loss`].
#[derive(Debug)]
pub struct HeadlessDevice {
    programs: HashMap<ProgramId, ProgramEntry>,
    buffers: HashMap<BufferId, BufferEntry>,
    textures: HashMap<TextureId, TextureEntry>,
    framebuffers: HashMap<FramebufferId, FramebufferDescriptor>,
    next_handle: usize,

    current_program: Option<ProgramId>,
    current_framebuffer: Option<FramebufferId>,

    counters: CallCounters,
    calls: Vec<RecordedCall>,
    recording: bool,
    failing_pattern: Option<String>,

    context_lost: bool,
    pending_events: VecDeque<ContextEvent>,

    // Memory tracking
    allocated_bytes: usize,
    peak_bytes: usize,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Creates a device with an active context and call recording enabled.
    pub fn new() -> Self {
        Self {
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            next_handle: 1,
            current_program: None,
            current_framebuffer: None,
            counters: CallCounters::default(),
            calls: Vec::new(),
            recording: true,
            failing_pattern: None,
            context_lost: false,
            pending_events: VecDeque::new(),
            allocated_bytes: 0,
            peak_bytes: 0,
        }
    }

    // --- Inspection ---

    /// The counters accumulated since creation or the last reset.
    pub fn counters(&self) -> CallCounters {
        self.counters
    }

    /// Zeroes the counters.
    pub fn reset_counters(&mut self) {
        self.counters = CallCounters::default();
    }

    /// The recorded calls, oldest first.
    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    /// Drains the recorded calls.
    pub fn take_calls(&mut self) -> Vec<RecordedCall> {
        std::mem::take(&mut self.calls)
    }

    /// Turns call recording on or off. Counters are always kept.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
        if !recording {
            self.calls.clear();
        }
    }

    /// The number of live programs.
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// The number of live buffers.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// The number of live textures.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// The number of live framebuffers.
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    /// The current contents of a buffer.
    pub fn buffer_data(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|entry| entry.data.as_slice())
    }

    /// The usage a buffer was created with.
    pub fn buffer_usage(&self, id: BufferId) -> Option<BufferUsage> {
        self.buffers.get(&id).map(|entry| entry.usage)
    }

    /// The current texels of a texture.
    pub fn texture_data(&self, id: TextureId) -> Option<&[u8]> {
        self.textures.get(&id).map(|entry| entry.data.as_slice())
    }

    /// The label a program was compiled with.
    pub fn program_label(&self, id: ProgramId) -> Option<&str> {
        self.programs.get(&id).map(|entry| entry.label.as_str())
    }

    /// The program made current by the last `use_program`.
    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    /// The framebuffer bound by the last `bind_framebuffer`.
    pub fn current_framebuffer(&self) -> Option<FramebufferId> {
        self.current_framebuffer
    }

    /// Bytes held by live buffers and textures.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    /// The highest value [`HeadlessDevice::allocated_bytes`] reached.
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes
    }

    // --- Fault injection ---

    /// Makes every later program whose vertex or fragment source contains
    /// `pattern` fail to compile. `None` stops forcing failures.
    pub fn fail_programs_containing(&mut self, pattern: Option<&str>) {
        self.failing_pattern = pattern.map(str::to_owned);
    }

    /// Drops the context: every object is gone and a [`ContextEvent::Lost`]
    /// is queued. Does nothing if the context is already lost.
    pub fn simulate_context_loss(&mut self) {
        if self.context_lost {
            return;
        }
        log::warn!(
            "Headless context lost ({} programs, {} buffers, {} textures, {} framebuffers dropped).",
            self.programs.len(),
            self.buffers.len(),
            self.textures.len(),
            self.framebuffers.len()
        );
        self.programs.clear();
        self.buffers.clear();
        self.textures.clear();
        self.framebuffers.clear();
        self.current_program = None;
        self.current_framebuffer = None;
        self.allocated_bytes = 0;
        self.context_lost = true;
        self.pending_events.push_back(ContextEvent::Lost);
    }

    /// Makes the context usable again and queues a [`ContextEvent::Restored`].
    pub fn restore_context(&mut self) {
        if !self.context_lost {
            return;
        }
        log::info!("Headless context restored.");
        self.context_lost = false;
        self.pending_events.push_back(ContextEvent::Restored);
    }

    // --- Internals ---

    fn allocate_handle(&mut self) -> usize {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn record(&mut self, call: RecordedCall) {
        if self.recording {
            self.calls.push(call);
        }
    }

    fn check_context(&self) -> Result<(), ResourceError> {
        if self.context_lost {
            Err(ResourceError::ContextLost)
        } else {
            Ok(())
        }
    }

    fn track_alloc(&mut self, bytes: usize) {
        self.allocated_bytes += bytes;
        self.peak_bytes = self.peak_bytes.max(self.allocated_bytes);
    }

    fn track_free(&mut self, bytes: usize) {
        self.allocated_bytes = self.allocated_bytes.saturating_sub(bytes);
    }

    fn invalid(&mut self, what: std::fmt::Arguments<'_>) {
        log::error!("Invalid headless call: {what}");
        self.counters.invalid_calls += 1;
    }

    /// Common bookkeeping for pipeline state calls. Returns `false` while the
    /// context is lost, in which case the call is ignored.
    fn state_call(&mut self, call: RecordedCall) -> bool {
        if self.context_lost {
            return false;
        }
        self.counters.state_changes += 1;
        self.record(call);
        true
    }
}

impl GraphicsDevice for HeadlessDevice {
    // --- Programs ---

    fn create_program(&mut self, descriptor: &ProgramDescriptor) -> Result<ProgramId, ResourceError> {
        self.check_context()?;

        let forced = self.failing_pattern.as_deref().filter(|pattern| {
            descriptor.vertex_source.contains(pattern) || descriptor.fragment_source.contains(pattern)
        });
        let outcome = match forced {
            Some(pattern) => Err(format!("error: forced failure on '{pattern}'")),
            None => reflection::validate(Stage::Vertex, &descriptor.vertex_source)
                .and_then(|_| reflection::validate(Stage::Fragment, &descriptor.fragment_source)),
        };
        if let Err(log) = outcome {
            self.counters.program_failures += 1;
            return Err(ResourceError::ProgramCompile {
                label: descriptor.label.clone(),
                log,
            });
        }

        let id = ProgramId(self.allocate_handle());
        let reflection = reflection::reflect(&descriptor.vertex_source, &descriptor.fragment_source);
        log::debug!(
            "Compiled program '{}' as {:?} ({} uniforms, {} attributes).",
            descriptor.label,
            id,
            reflection.uniforms.len(),
            reflection.attributes.len()
        );
        self.programs.insert(
            id,
            ProgramEntry {
                label: descriptor.label.clone(),
                reflection,
            },
        );
        self.counters.programs_created += 1;
        self.record(RecordedCall::CreateProgram(id));
        Ok(id)
    }

    fn program_reflection(&self, id: ProgramId) -> Result<ProgramReflection, ResourceError> {
        self.check_context()?;
        self.programs
            .get(&id)
            .map(|entry| entry.reflection.clone())
            .ok_or(ResourceError::InvalidHandle {
                kind: "program",
                id: id.0,
            })
    }

    fn delete_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        self.check_context()?;
        self.programs.remove(&id).ok_or(ResourceError::InvalidHandle {
            kind: "program",
            id: id.0,
        })?;
        if self.current_program == Some(id) {
            self.current_program = None;
        }
        self.counters.programs_deleted += 1;
        self.record(RecordedCall::DeleteProgram(id));
        Ok(())
    }

    // --- Buffers ---

    fn create_buffer(&mut self, descriptor: &BufferDescriptor, data: &[u8]) -> Result<BufferId, ResourceError> {
        self.check_context()?;
        if data.len() != descriptor.size {
            return Err(ResourceError::SizeMismatch {
                expected: descriptor.size,
                actual: data.len(),
            });
        }
        let id = BufferId(self.allocate_handle());
        self.buffers.insert(
            id,
            BufferEntry {
                usage: descriptor.usage,
                data: data.to_vec(),
            },
        );
        self.track_alloc(data.len());
        self.counters.buffers_created += 1;
        self.record(RecordedCall::CreateBuffer(id));
        Ok(id)
    }

    fn update_buffer(&mut self, id: BufferId, offset: usize, data: &[u8]) -> Result<(), ResourceError> {
        self.check_context()?;
        let entry = self.buffers.get_mut(&id).ok_or(ResourceError::InvalidHandle {
            kind: "buffer",
            id: id.0,
        })?;
        let size = entry.data.len();
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= size)
            .ok_or(ResourceError::OutOfBounds {
                offset,
                len: data.len(),
                size,
            })?;
        entry.data[offset..end].copy_from_slice(data);
        self.counters.buffer_updates += 1;
        self.record(RecordedCall::UpdateBuffer(id));
        Ok(())
    }

    fn delete_buffer(&mut self, id: BufferId) -> Result<(), ResourceError> {
        self.check_context()?;
        let entry = self.buffers.remove(&id).ok_or(ResourceError::InvalidHandle {
            kind: "buffer",
            id: id.0,
        })?;
        self.track_free(entry.data.len());
        self.counters.buffers_deleted += 1;
        self.record(RecordedCall::DeleteBuffer(id));
        Ok(())
    }

    // --- Textures & framebuffers ---

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<TextureId, ResourceError> {
        self.check_context()?;
        let size = descriptor.byte_size();
        let texels = match data {
            Some(data) if data.len() != size => {
                return Err(ResourceError::SizeMismatch {
                    expected: size,
                    actual: data.len(),
                })
            }
            Some(data) => data.to_vec(),
            None => vec![0; size],
        };
        let id = TextureId(self.allocate_handle());
        self.textures.insert(
            id,
            TextureEntry {
                descriptor: descriptor.clone(),
                data: texels,
            },
        );
        self.track_alloc(size);
        self.counters.textures_created += 1;
        self.record(RecordedCall::CreateTexture(id));
        Ok(id)
    }

    fn update_texture(&mut self, id: TextureId, data: &[u8]) -> Result<(), ResourceError> {
        self.check_context()?;
        let entry = self.textures.get_mut(&id).ok_or(ResourceError::InvalidHandle {
            kind: "texture",
            id: id.0,
        })?;
        let expected = entry.descriptor.byte_size();
        if data.len() != expected {
            return Err(ResourceError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        entry.data.copy_from_slice(data);
        self.counters.texture_updates += 1;
        self.record(RecordedCall::UpdateTexture(id));
        Ok(())
    }

    fn delete_texture(&mut self, id: TextureId) -> Result<(), ResourceError> {
        self.check_context()?;
        let entry = self.textures.remove(&id).ok_or(ResourceError::InvalidHandle {
            kind: "texture",
            id: id.0,
        })?;
        self.track_free(entry.data.len());
        self.counters.textures_deleted += 1;
        self.record(RecordedCall::DeleteTexture(id));
        Ok(())
    }

    fn create_framebuffer(&mut self, descriptor: &FramebufferDescriptor) -> Result<FramebufferId, ResourceError> {
        self.check_context()?;
        for attachment in [descriptor.color, descriptor.depth].into_iter().flatten() {
            if !self.textures.contains_key(&attachment) {
                return Err(ResourceError::InvalidHandle {
                    kind: "texture",
                    id: attachment.0,
                });
            }
        }
        let id = FramebufferId(self.allocate_handle());
        self.framebuffers.insert(id, descriptor.clone());
        self.counters.framebuffers_created += 1;
        self.record(RecordedCall::CreateFramebuffer(id));
        Ok(id)
    }

    fn delete_framebuffer(&mut self, id: FramebufferId) -> Result<(), ResourceError> {
        self.check_context()?;
        self.framebuffers.remove(&id).ok_or(ResourceError::InvalidHandle {
            kind: "framebuffer",
            id: id.0,
        })?;
        if self.current_framebuffer == Some(id) {
            self.current_framebuffer = None;
        }
        self.counters.framebuffers_deleted += 1;
        self.record(RecordedCall::DeleteFramebuffer(id));
        Ok(())
    }

    // --- Pipeline state ---

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        if !self.state_call(RecordedCall::BindFramebuffer(framebuffer)) {
            return;
        }
        if let Some(id) = framebuffer.filter(|id| !self.framebuffers.contains_key(id)) {
            self.invalid(format_args!("bind_framebuffer({id:?}) on a dead framebuffer"));
        }
        self.current_framebuffer = framebuffer;
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.state_call(RecordedCall::SetViewport(x, y, width, height));
    }

    fn clear(&mut self, color: Option<LinearRgba>, depth: Option<f32>, stencil: Option<u32>) {
        if self.context_lost {
            return;
        }
        self.counters.clears += 1;
        self.record(RecordedCall::Clear(color, depth, stencil));
    }

    fn use_program(&mut self, program: ProgramId) {
        if !self.state_call(RecordedCall::UseProgram(program)) {
            return;
        }
        if !self.programs.contains_key(&program) {
            self.invalid(format_args!("use_program({program:?}) on a dead program"));
        }
        self.current_program = Some(program);
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state_call(RecordedCall::SetBlendMode(mode));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.state_call(RecordedCall::SetDepthTest(enabled));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.state_call(RecordedCall::SetDepthWrite(enabled));
    }

    fn set_depth_func(&mut self, func: CompareFunction) {
        self.state_call(RecordedCall::SetDepthFunc(func));
    }

    fn set_cull_face(&mut self, cull: CullFace) {
        self.state_call(RecordedCall::SetCullFace(cull));
    }

    fn set_front_face(&mut self, front_face: FrontFace) {
        self.state_call(RecordedCall::SetFrontFace(front_face));
    }

    fn set_stencil_state(&mut self, stencil: Option<StencilState>) {
        self.state_call(RecordedCall::SetStencilState(stencil));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        if !self.state_call(RecordedCall::BindTexture(unit, texture)) {
            return;
        }
        if let Some(id) = texture.filter(|id| !self.textures.contains_key(id)) {
            self.invalid(format_args!("bind_texture({unit}, {id:?}) on a dead texture"));
        }
    }

    fn bind_vertex_buffer(&mut self, location: u32, buffer: BufferId, _item_size: u32, _normalized: bool) {
        if !self.state_call(RecordedCall::BindVertexBuffer(location, buffer)) {
            return;
        }
        if !self.buffers.contains_key(&buffer) {
            self.invalid(format_args!("bind_vertex_buffer({location}, {buffer:?}) on a dead buffer"));
        }
    }

    fn bind_index_buffer(&mut self, buffer: Option<BufferId>, _format: IndexFormat) {
        if !self.state_call(RecordedCall::BindIndexBuffer(buffer)) {
            return;
        }
        if let Some(id) = buffer.filter(|id| !self.buffers.contains_key(id)) {
            self.invalid(format_args!("bind_index_buffer({id:?}) on a dead buffer"));
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        if self.context_lost {
            return;
        }
        self.counters.uniform_uploads += 1;
        self.record(RecordedCall::SetUniform(location, *value));

        let declared = self
            .current_program
            .and_then(|id| self.programs.get(&id))
            .and_then(|entry| entry.reflection.uniforms.iter().find(|u| u.location == location))
            .map(|uniform| uniform.ty);
        match declared {
            Some(ty) if ty == value.ty() => {}
            Some(ty) => self.invalid(format_args!(
                "set_uniform({location:?}) with a {:?} value for a {ty:?} uniform",
                value.ty()
            )),
            None => self.invalid(format_args!(
                "set_uniform({location:?}) is not a uniform of the current program"
            )),
        }
    }

    fn draw(&mut self, call: &DrawCall) {
        if self.context_lost {
            return;
        }
        self.counters.draws += 1;
        self.record(RecordedCall::Draw(*call));
        if self.current_program.is_none() {
            self.invalid(format_args!("draw without a program"));
        }
        log::trace!("Headless draw: {} primitives.", call.primitive_count());
    }

    // --- Context ---

    fn poll_context_event(&mut self) -> Option<ContextEvent> {
        self.pending_events.pop_front()
    }

    fn is_context_lost(&self) -> bool {
        self.context_lost
    }
}
