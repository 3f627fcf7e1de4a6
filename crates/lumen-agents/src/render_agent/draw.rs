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

//! Turns render items into device calls.

use ahash::{AHashMap, AHashSet};
use lumen_core::material::{Material, MaterialFeatures, MaterialKind};
use lumen_core::math::{Mat3, Vec2, Vec3};
use lumen_core::renderer::{
    BlendMode, CullFace, DepthState, DrawCall, EnvironmentSignature, FrontFace, GraphicsDevice,
    IndexFormat, PrimitiveTopology, ProgramId, TextureId, UniformValue,
};
use lumen_core::scene::GeometryId;
use lumen_data::geometry::{Attribute, BufferSourceId};
use lumen_data::{Geometry, SceneGraph};
use lumen_lanes::render_lane::RenderItem;
use smallvec::SmallVec;

use super::bindings::{BindingOwner, MaterialBindings, PassSlot};
use super::cache::{CachedProgram, RenderContext};
use super::error::RenderError;
use super::shaders::uniforms;
use super::state::{GpuStateCache, UniformCache};
use super::stats::FrameStats;

/// Texture unit of the material color map.
const MAP_UNIT: u32 = 0;
/// Texture unit of the transmission capture.
const TRANSMISSION_UNIT: u32 = 1;
/// First texture unit handed out to shadow maps.
pub(crate) const FIRST_SHADOW_UNIT: u32 = 2;

/// Uniform values shared by every draw of a pass, written once per program.
#[derive(Debug, Default)]
pub(crate) struct PassUniforms {
    pub(crate) values: Vec<(String, UniformValue)>,
    pub(crate) samplers: Vec<(String, u32, TextureId)>,
}

impl PassUniforms {
    pub(crate) fn clear(&mut self) {
        self.values.clear();
        self.samplers.clear();
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: UniformValue) {
        self.values.push((name.into(), value));
    }

    pub(crate) fn push_sampler(&mut self, name: impl Into<String>, unit: u32, texture: TextureId) {
        self.samplers.push((name.into(), unit, texture));
    }
}

/// Everything a pass needs besides the items themselves.
pub(crate) struct PassParams<'a> {
    /// `None` renders with the internal depth material.
    pub slot: Option<PassSlot>,
    pub environment: EnvironmentSignature,
    pub camera: &'a PassUniforms,
    pub scene: Option<&'a PassUniforms>,
    /// The captured opaque scene and its size.
    pub transmission: Option<(TextureId, (u32, u32))>,
    /// Replaces the culling derived from the material side.
    pub cull: Option<CullFace>,
}

/// The geometry arrays last uploaded for a geometry, to release buffers of
/// arrays it no longer has.
#[derive(Debug, Clone, Default)]
pub(crate) struct GeometryUpload {
    version: u64,
    sources: SmallVec<[BufferSourceId; 8]>,
}

impl GeometryUpload {
    pub(crate) fn sources(&self) -> &[BufferSourceId] {
        &self.sources
    }
}

/// Split borrows of the renderer used while submitting one pass.
pub(crate) struct Submitter<'a> {
    pub device: &'a mut dyn GraphicsDevice,
    pub context: &'a mut RenderContext,
    pub bindings: &'a mut MaterialBindings,
    pub state: &'a mut GpuStateCache,
    pub uniforms: &'a mut UniformCache,
    pub uploads: &'a mut AHashMap<GeometryId, GeometryUpload>,
    pub stats: &'a mut FrameStats,
    pub depth_material: &'a Material,
    pub max_texture_units: u32,
    // Programs whose pass uniforms were written in this pass.
    pub prepared: AHashSet<ProgramId>,
}

impl Submitter<'_> {
    /// Draws one item. Items whose resources are gone or whose program failed
    /// to compile are counted as skipped.
    pub(crate) fn draw_item(
        &mut self,
        scene: &SceneGraph,
        item: &RenderItem,
        pass: &PassParams<'_>,
    ) -> Result<(), RenderError> {
        let (Some(geometry), Some(material)) = (scene.geometry(item.geometry), scene.material(item.material))
        else {
            self.stats.skipped_draws += 1;
            return Ok(());
        };
        let (first, count) = geometry.draw_span();
        if count == 0 || item.instance_count == 0 {
            return Ok(());
        }
        self.release_orphaned_buffers(item.geometry, geometry)?;

        let RenderContext {
            programs,
            buffers,
            textures,
            ..
        } = &mut *self.context;
        let device = &mut *self.device;

        // Stage 1: program and the uniforms shared by the pass.
        let (owner, program_material) = match pass.slot {
            Some(slot) => (BindingOwner::Material(item.material, slot), material),
            None => (BindingOwner::ShadowDepth, self.depth_material),
        };
        let key = program_material.program_key(pass.environment);
        let resolved = self.bindings.resolve(programs, device, owner, program_material, key)?;
        let Some(program) = resolved.handle.and_then(|handle| programs.get(handle)) else {
            self.stats.skipped_draws += 1;
            return Ok(());
        };
        if resolved.edited {
            // The material was edited in place: write all of its state again.
            self.uniforms.forget_program(program.program());
            self.state.forget_material_state();
            self.prepared.remove(&program.program());
        }
        self.state.use_program(device, program.program());
        if self.prepared.insert(program.program()) {
            write_pass_uniforms(device, self.state, self.uniforms, program, pass, self.max_texture_units);
        }

        // Stage 2: fixed-function state.
        let front_face = if item.world_matrix.determinant() < 0.0 {
            FrontFace::Ccw.flipped()
        } else {
            FrontFace::Ccw
        };
        if pass.slot.is_some() {
            self.state.set_blend_mode(device, material.effective_blending());
            self.state.set_depth_state(device, material.depth_state());
            self.state.set_stencil_state(device, material.stencil);
        } else {
            self.state.set_blend_mode(device, BlendMode::None);
            self.state.set_depth_state(device, DepthState::default());
            self.state.set_stencil_state(device, None);
        }
        let cull = pass.cull.unwrap_or(CullFace::from(material.side));
        self.state.set_culling(device, cull, front_face);

        // Stage 3: vertex inputs.
        for input in program.attributes() {
            let Some(attribute) = geometry.attribute(&input.name) else {
                continue;
            };
            let buffer = buffers.acquire(device, attribute.source(), attribute)?;
            self.state.bind_vertex_buffer(
                device,
                input.location,
                buffer,
                attribute.item_size(),
                attribute.is_normalized(),
            );
        }
        let index_format = match geometry.index() {
            Some(index) => {
                let buffer = buffers.acquire(device, index.source(), index)?;
                self.state.bind_index_buffer(device, Some(buffer), index.format());
                Some(index.format())
            }
            None => {
                self.state.bind_index_buffer(device, None, IndexFormat::Uint16);
                None
            }
        };

        // Stage 4: per-draw uniforms and textures.
        let mut set = |device: &mut dyn GraphicsDevice, name: &str, value: UniformValue| {
            upload(self.uniforms, device, program, name, value);
        };
        set(device, uniforms::MODEL_MATRIX, UniformValue::Mat4(item.world_matrix));
        set(
            device,
            uniforms::NORMAL_MATRIX,
            UniformValue::Mat3(Mat3::normal_matrix(&item.world_matrix)),
        );
        if pass.slot.is_some() {
            for (name, value) in material_uniforms(material, item) {
                set(device, name, value);
            }
            if let MaterialKind::Custom(shader) = &material.kind {
                for (name, value) in &shader.uniforms {
                    set(device, name, *value);
                }
            }

            let features = material.feature_key().features;
            if features.contains(MaterialFeatures::MAP) && program.uniform(uniforms::MAP).is_some() {
                // A disposed image samples nothing rather than the previous draw's map.
                let texture = match material.map.and_then(|id| scene.image(id).map(|image| (id, image))) {
                    Some((id, image)) => Some(textures.acquire(device, id, image)?),
                    None => None,
                };
                self.state.bind_texture(device, MAP_UNIT, texture);
                set(device, uniforms::MAP, UniformValue::Sampler(MAP_UNIT));
            }

            let transmissive = features.contains(MaterialFeatures::TRANSMISSION);
            match (transmissive, pass.transmission) {
                (true, Some((texture, (width, height)))) => {
                    self.state.bind_texture(device, TRANSMISSION_UNIT, Some(texture));
                    set(device, uniforms::TRANSMISSION_SAMPLER_MAP, UniformValue::Sampler(TRANSMISSION_UNIT));
                    set(
                        device,
                        uniforms::TRANSMISSION_SAMPLER_SIZE,
                        UniformValue::Vec2(Vec2::new(width as f32, height as f32)),
                    );
                }
                // Inside the capture itself: never sample the target being drawn.
                (true, None) => self.state.bind_texture(device, TRANSMISSION_UNIT, None),
                _ => {}
            }
        }

        // Stage 5: draw.
        let call = DrawCall {
            topology: geometry.topology(),
            first,
            count,
            instance_count: item.instance_count,
            index_format,
        };
        device.draw(&call);
        self.stats.draw_calls += 1;
        if call.topology == PrimitiveTopology::Triangles {
            self.stats.triangles += call.primitive_count();
        }
        Ok(())
    }

    /// Deletes the buffers of arrays a geometry dropped since its last upload.
    fn release_orphaned_buffers(&mut self, id: GeometryId, geometry: &Geometry) -> Result<(), RenderError> {
        let upload = self.uploads.entry(id).or_default();
        if upload.version == geometry.version() && !upload.sources.is_empty() {
            return Ok(());
        }
        let current = geometry.buffer_sources();
        for source in upload.sources.iter().filter(|source| !current.contains(source)) {
            if let Some(entry) = self.context.buffers.get(source).copied() {
                self.context.buffers.release_if_present::<Attribute>(self.device, *source)?;
                self.state.forget_deleted(&[entry.handle], &[]);
            }
        }
        upload.version = geometry.version();
        upload.sources = current;
        Ok(())
    }
}

/// Writes the values shared by every draw of the pass into a program that
/// was just made current, binding shadow maps to their units.
fn write_pass_uniforms(
    device: &mut dyn GraphicsDevice,
    state: &mut GpuStateCache,
    cache: &mut UniformCache,
    program: &CachedProgram,
    pass: &PassParams<'_>,
    max_texture_units: u32,
) {
    for uniforms in std::iter::once(pass.camera).chain(pass.scene) {
        for (name, value) in &uniforms.values {
            upload(cache, device, program, name, *value);
        }
        for (name, unit, texture) in &uniforms.samplers {
            if program.uniform(name).is_none() {
                continue;
            }
            if *unit >= max_texture_units {
                log::warn!("Out of texture units: '{name}' needs unit {unit}, only {max_texture_units} available.");
                continue;
            }
            state.bind_texture(device, *unit, Some(*texture));
            upload(cache, device, program, name, UniformValue::Sampler(*unit));
        }
    }
}

/// The per-material values of the built-in kinds.
fn material_uniforms(material: &Material, item: &RenderItem) -> SmallVec<[(&'static str, UniformValue); 12]> {
    let color = material.color;
    let mut values: SmallVec<[(&'static str, UniformValue); 12]> = SmallVec::new();
    values.push((uniforms::DIFFUSE, UniformValue::Vec3(Vec3::new(color.r, color.g, color.b))));
    values.push((uniforms::OPACITY, UniformValue::Float(material.opacity)));
    values.push((uniforms::ALPHA_TEST, UniformValue::Float(material.alpha_test)));
    values.push((uniforms::RECEIVE_SHADOW, UniformValue::Int(item.receive_shadow as i32)));
    match material.kind {
        MaterialKind::Phong { specular, shininess } => {
            values.push((
                uniforms::SPECULAR,
                UniformValue::Vec3(Vec3::new(specular.r, specular.g, specular.b)),
            ));
            values.push((uniforms::SHININESS, UniformValue::Float(shininess)));
        }
        MaterialKind::Standard {
            metalness,
            roughness,
            transmission,
            thickness,
            ior,
        } => {
            values.push((uniforms::METALNESS, UniformValue::Float(metalness)));
            values.push((uniforms::ROUGHNESS, UniformValue::Float(roughness)));
            values.push((uniforms::TRANSMISSION, UniformValue::Float(transmission)));
            values.push((uniforms::THICKNESS, UniformValue::Float(thickness)));
            values.push((uniforms::IOR, UniformValue::Float(ior)));
        }
        _ => {}
    }
    values
}

/// Writes a uniform if the program has it and its type matches.
fn upload(
    cache: &mut UniformCache,
    device: &mut dyn GraphicsDevice,
    program: &CachedProgram,
    name: &str,
    value: UniformValue,
) {
    let Some(info) = program.uniform(name) else {
        return;
    };
    if info.ty != value.ty() {
        log::trace!(
            "Skipping uniform '{name}' of program '{}': {:?} value for a {:?} uniform.",
            program.label(),
            value.ty(),
            info.ty
        );
        return;
    }
    cache.set(device, program.program(), info.location, value);
}
