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

//! The frame renderer: drives the lanes and submits their output to a device.

use ahash::{AHashMap, AHashSet};
use lumen_core::config::RendererConfig;
use lumen_core::material::Material;
use lumen_core::math::{LinearRgba, Mat4, Vec3, Vec4};
use lumen_core::renderer::{
    BufferId, ContextEvent, CullFace, DepthState, Environment, FramebufferId, GraphicsDevice,
    LightKind, Side, TextureFormat, TextureId, UniformValue,
};
use lumen_core::scene::{GeometryId, NodeId};
use lumen_data::geometry::Attribute;
use lumen_data::scene::Disposal;
use lumen_data::{Camera, RenderTarget, RenderTargetId, SceneError, SceneGraph};
use lumen_lanes::render_lane::{
    collect_lights, count_lights, shadow_views, RenderBucket, RenderListBuilder, RenderView,
    VisibleLight,
};
use lumen_lanes::scene_lane::update_world_matrices;
use smallvec::SmallVec;

use super::bindings::{MaterialBindings, PassSlot};
use super::cache::{RenderContext, TargetDesc, TargetKey};
use super::draw::{GeometryUpload, PassParams, PassUniforms, Submitter, FIRST_SHADOW_UNIT};
use super::error::RenderError;
use super::shaders::uniforms;
use super::state::{GpuStateCache, UniformCache};
use super::stats::FrameStats;

/// Everything the renderer keeps on or about the device.
struct GpuResources<D: GraphicsDevice> {
    device: D,
    context: RenderContext,
    bindings: MaterialBindings,
    state: GpuStateCache,
    uniforms: UniformCache,
    // Arrays last uploaded per geometry.
    uploads: AHashMap<GeometryId, GeometryUpload>,
    // Program used by shadow map passes.
    depth_material: Material,
}

impl<D: GraphicsDevice> GpuResources<D> {
    fn submitter<'a>(&'a mut self, stats: &'a mut FrameStats, max_texture_units: u32) -> Submitter<'a> {
        Submitter {
            device: &mut self.device,
            context: &mut self.context,
            bindings: &mut self.bindings,
            state: &mut self.state,
            uniforms: &mut self.uniforms,
            uploads: &mut self.uploads,
            stats,
            depth_material: &self.depth_material,
            max_texture_units,
            prepared: AHashSet::new(),
        }
    }

    /// Clears the depth (and color) of the currently bound framebuffer.
    fn clear(&mut self, viewport: (u32, u32), color: Option<LinearRgba>) {
        let (width, height) = viewport;
        self.state.set_viewport(&mut self.device, 0, 0, width, height);
        // Depth writes must be on for the clear to reach the depth buffer.
        self.state.set_depth_state(&mut self.device, DepthState::default());
        self.device.clear(color, Some(1.0), color.map(|_| 0));
    }

    /// Drops deleted framebuffers and their attachments from the state snapshot.
    fn forget_deleted_targets(&mut self) {
        let deleted = self.context.targets.take_deleted();
        if deleted.is_empty() {
            return;
        }
        let framebuffers: SmallVec<[FramebufferId; 8]> = deleted.iter().map(|target| target.framebuffer).collect();
        let textures: SmallVec<[TextureId; 16]> = deleted
            .iter()
            .flat_map(|target| target.color.into_iter().chain(target.depth))
            .collect();
        self.state.forget_deleted_framebuffers(&framebuffers);
        self.state.forget_deleted(&[], &textures);
    }

    /// Drops every device object after the context was lost.
    fn forget_everything(&mut self) {
        self.context.invalidate_all();
        self.bindings.clear();
        self.state.reset();
        self.uniforms.clear();
        self.uploads.clear();
    }
}

/// A shadow map rendered this frame.
#[derive(Debug, Clone, Copy)]
struct RenderedShadow {
    kind: LightKind,
    face: u8,
    texture: TextureId,
    matrix: Mat4,
    bias: f32,
}

/// Renders a scene graph through a [`GraphicsDevice`].
///
/// A frame runs in stages: context events, deferred disposals, transform
/// propagation, light collection, shadow maps, render lists, the
/// transmission capture and finally the main pass. Device objects are cached
/// across frames and only touched again when their source data changes.
pub struct FrameRenderer<D: GraphicsDevice> {
    gpu: GpuResources<D>,
    config: RendererConfig,

    // Scratch reused from frame to frame.
    main_lists: RenderListBuilder,
    shadow_lists: RenderListBuilder,
    lights: Vec<VisibleLight>,
    shadows: Vec<RenderedShadow>,
    camera_uniforms: PassUniforms,
    scene_uniforms: PassUniforms,

    // Context loss bookkeeping.
    context_lost: bool,
    loss_reported: bool,
    restored: bool,
    frame_count: u64,
}

impl<D: GraphicsDevice> FrameRenderer<D> {
    /// Creates a renderer drawing through `device`.
    pub fn new(device: D, config: RendererConfig) -> Self {
        log::info!(
            "Frame renderer created: {}x{} surface, shadows {}.",
            config.surface_size.0,
            config.surface_size.1,
            if config.shadows_enabled { "on" } else { "off" }
        );
        Self {
            gpu: GpuResources {
                device,
                context: RenderContext::default(),
                bindings: MaterialBindings::default(),
                state: GpuStateCache::new(),
                uniforms: UniformCache::new(),
                uploads: AHashMap::new(),
                depth_material: Material::depth(),
            },
            config,
            main_lists: RenderListBuilder::new(),
            shadow_lists: RenderListBuilder::new(),
            lights: Vec::new(),
            shadows: Vec::new(),
            camera_uniforms: PassUniforms::default(),
            scene_uniforms: PassUniforms::default(),
            context_lost: false,
            loss_reported: false,
            restored: false,
            frame_count: 0,
        }
    }

    /// The device.
    pub fn device(&self) -> &D {
        &self.gpu.device
    }

    /// The device, mutably. Calls made here bypass the state cache; call
    /// [`FrameRenderer::reset_state`] afterwards.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.gpu.device
    }

    /// Forgets the pipeline state snapshot so the next frame sets everything again.
    pub fn reset_state(&mut self) {
        self.gpu.state.reset();
        self.gpu.uniforms.clear();
    }

    /// The current configuration.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Replaces the configuration. Takes effect on the next frame.
    pub fn set_config(&mut self, config: RendererConfig) {
        self.config = config;
    }

    /// The device object caches, for inspection.
    pub fn context(&self) -> &RenderContext {
        &self.gpu.context
    }

    /// The number of material passes currently bound to a compiled program.
    pub fn bound_programs(&self) -> usize {
        self.gpu.bindings.len()
    }

    /// The number of frames rendered successfully.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Returns `true` between a context loss and its restoration.
    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    /// The color texture a user render target was last drawn into.
    pub fn target_texture(&self, target: RenderTargetId) -> Option<TextureId> {
        self.gpu
            .context
            .targets
            .get(&TargetKey::User(target))
            .and_then(|target| target.color)
    }

    /// Deletes the framebuffer of a render target that will not be drawn again.
    ///
    /// Returns `false` if the target was never drawn into.
    pub fn release_target(&mut self, target: RenderTargetId) -> Result<bool, RenderError> {
        let key = TargetKey::User(target);
        if self.gpu.context.targets.get(&key).is_none() {
            return Ok(false);
        }
        self.gpu.context.targets.release(&mut self.gpu.device, key)?;
        self.gpu.forget_deleted_targets();
        Ok(true)
    }

    /// Renders the subtree under `root` as seen from `camera`, into `target`
    /// or the default surface.
    ///
    /// # Errors
    /// * [`RenderError::ContextLost`] once for every context loss. Later frames
    ///   are skipped until the context comes back.
    /// * [`RenderError::Scene`] if `root` does not exist.
    /// * [`RenderError::Cache`] if a resource changed size in place.
    pub fn render_frame(
        &mut self,
        scene: &mut SceneGraph,
        root: NodeId,
        camera: &Camera,
        target: Option<&RenderTarget>,
    ) -> Result<FrameStats, RenderError> {
        self.poll_context_events();
        if self.context_lost {
            if self.loss_reported {
                return Ok(FrameStats::skipped());
            }
            self.loss_reported = true;
            return Err(RenderError::ContextLost);
        }
        if !scene.contains(root) {
            return Err(SceneError::NodeNotFound(root).into());
        }

        match self.draw_frame(scene, root, camera, target) {
            Ok(mut stats) => {
                stats.context_restored = std::mem::take(&mut self.restored);
                self.frame_count += 1;
                log::trace!("Frame {} done: {stats:?}", self.frame_count);
                Ok(stats)
            }
            Err(RenderError::ContextLost) => {
                self.on_context_lost();
                self.loss_reported = true;
                Err(RenderError::ContextLost)
            }
            Err(err) => Err(err),
        }
    }

    fn poll_context_events(&mut self) {
        while let Some(event) = self.gpu.device.poll_context_event() {
            match event {
                ContextEvent::Lost => {
                    if !self.context_lost {
                        self.on_context_lost();
                    }
                }
                ContextEvent::Restored => {
                    log::info!("Graphics context restored; device objects are rebuilt on demand.");
                    self.context_lost = false;
                    self.loss_reported = false;
                    self.restored = true;
                }
            }
        }
    }

    fn on_context_lost(&mut self) {
        log::warn!("Graphics context lost. Every device object is gone.");
        self.gpu.forget_everything();
        self.context_lost = true;
        self.loss_reported = false;
    }

    fn draw_frame(
        &mut self,
        scene: &mut SceneGraph,
        root: NodeId,
        camera: &Camera,
        target: Option<&RenderTarget>,
    ) -> Result<FrameStats, RenderError> {
        let mut stats = FrameStats::default();
        self.gpu.state.take_changes();
        self.gpu.uniforms.take_uploads();

        // Stage 1: resources the scene let go of.
        for disposal in scene.take_disposals() {
            self.apply_disposal(disposal)?;
        }

        // Stage 2: world matrices.
        stats.transforms = update_world_matrices(scene, false);
        let scene: &SceneGraph = scene;

        // Stage 3: lights and the environment programs are compiled for.
        let shadows_enabled = self.config.shadows_enabled;
        self.lights.clear();
        collect_lights(scene, root, &mut self.lights);
        // Shadow casters first, so light `i` of a kind owns shadow map `i`.
        self.lights
            .sort_by_key(|light| !(shadows_enabled && light.light.casts_shadow()));
        let environment = Environment {
            lights: count_lights(&self.lights, shadows_enabled),
            fog: self.config.fog,
            color_space: self.config.output_color_space,
            tone_mapping: self.config.tone_mapping,
            clipping_planes: self.config.clipping_planes.len() as u32,
        };
        let environment = if target.is_some() {
            environment.for_offscreen()
        } else {
            environment
        };

        // Stage 4: shadow maps.
        self.render_shadow_maps(scene, root, &mut stats)?;
        self.write_scene_uniforms();

        // Stage 5: render lists.
        let view = RenderView::from_camera(camera, environment.signature())
            .with_bounding_box_culling(self.config.cull_with_bounding_box)
            .with_sorting(self.config.sort_objects);
        let lists = self.main_lists.build(scene, root, &view);
        stats.culled = lists.culled();
        stats.opaque = lists.opaque().len() as u32;
        stats.transmissive = lists.transmissive().len() as u32;
        stats.transparent = lists.transparent().len() as u32;

        self.camera_uniforms.clear();
        self.camera_uniforms
            .push(uniforms::VIEW_MATRIX, UniformValue::Mat4(camera.view_matrix()));
        self.camera_uniforms
            .push(uniforms::PROJECTION_MATRIX, UniformValue::Mat4(camera.projection_matrix()));
        self.camera_uniforms
            .push(uniforms::CAMERA_POSITION, UniformValue::Vec3(camera.position()));

        let surface = target.map_or(self.config.surface_size, |target| (target.width(), target.height()));
        let max_units = self.config.max_texture_units;

        // Stage 6: capture of the opaque scene behind transmissive surfaces.
        let transmission = if stats.transmissive > 0 {
            let scale = self.config.transmission_resolution_scale;
            let size = (
                ((surface.0 as f32 * scale) as u32).max(1),
                ((surface.1 as f32 * scale) as u32).max(1),
            );
            let capture = self.gpu.context.targets.acquire(
                &mut self.gpu.device,
                TargetKey::Transmission,
                TargetDesc {
                    width: size.0,
                    height: size.1,
                    color: Some(TextureFormat::Rgba8),
                    depth: true,
                    version: 0,
                },
            )?;
            self.gpu.forget_deleted_targets();
            self.gpu.state.bind_framebuffer(&mut self.gpu.device, Some(capture.framebuffer));
            self.gpu.clear(size, Some(self.config.clear_color));

            let draws_before = stats.draw_calls;
            let pass = PassParams {
                slot: Some(PassSlot::Transmission),
                environment: environment.for_offscreen().signature(),
                camera: &self.camera_uniforms,
                scene: Some(&self.scene_uniforms),
                transmission: None,
                cull: None,
            };
            // Double-sided transmissive surfaces show their back faces through
            // their front faces.
            let back_faces = PassParams {
                cull: Some(CullFace::Front),
                ..pass
            };
            let mut submitter = self.gpu.submitter(&mut stats, max_units);
            for item in lists.opaque() {
                submitter.draw_item(scene, item, &pass)?;
            }
            for item in lists.transmissive() {
                let double_sided = scene
                    .material(item.material)
                    .is_some_and(|material| material.side == Side::Double);
                if double_sided {
                    submitter.draw_item(scene, item, &back_faces)?;
                }
            }
            stats.transmission_pass = true;
            stats.transmission_draws = stats.draw_calls - draws_before;
            capture.color.map(|texture| (texture, size))
        } else {
            self.gpu
                .context
                .targets
                .retain(&mut self.gpu.device, |key| *key != TargetKey::Transmission)?;
            self.gpu.forget_deleted_targets();
            None
        };

        // Stage 7: main pass.
        let framebuffer = match target {
            Some(target) => {
                let gpu_target = self.gpu.context.targets.acquire(
                    &mut self.gpu.device,
                    TargetKey::User(target.id()),
                    TargetDesc {
                        width: target.width(),
                        height: target.height(),
                        color: Some(TextureFormat::Rgba8),
                        depth: target.has_depth(),
                        version: target.version(),
                    },
                )?;
                self.gpu.forget_deleted_targets();
                Some(gpu_target.framebuffer)
            }
            None => None,
        };
        self.gpu.state.bind_framebuffer(&mut self.gpu.device, framebuffer);
        self.gpu.clear(surface, Some(self.config.clear_color));

        let pass = PassParams {
            slot: Some(PassSlot::Main),
            environment: environment.signature(),
            camera: &self.camera_uniforms,
            scene: Some(&self.scene_uniforms),
            transmission,
            cull: None,
        };
        let mut submitter = self.gpu.submitter(&mut stats, max_units);
        for bucket in [RenderBucket::Opaque, RenderBucket::Transmissive, RenderBucket::Transparent] {
            for item in lists.bucket(bucket) {
                submitter.draw_item(scene, item, &pass)?;
            }
        }

        self.forget_deleted_programs();
        if self.gpu.device.is_context_lost() {
            return Err(RenderError::ContextLost);
        }
        stats.state_changes = self.gpu.state.take_changes();
        stats.uniform_uploads = self.gpu.uniforms.take_uploads();
        Ok(stats)
    }

    /// Releases the device objects behind a disposed resource.
    fn apply_disposal(&mut self, disposal: Disposal) -> Result<(), RenderError> {
        let gpu = &mut self.gpu;
        match disposal {
            Disposal::Geometry { id, sources } => {
                let tracked = gpu.uploads.remove(&id);
                let mut deleted: SmallVec<[BufferId; 8]> = SmallVec::new();
                for source in sources.iter().chain(tracked.iter().flat_map(|upload| upload.sources())) {
                    if let Some(entry) = gpu.context.buffers.get(source).copied() {
                        gpu.context
                            .buffers
                            .release_if_present::<Attribute>(&mut gpu.device, *source)?;
                        deleted.push(entry.handle);
                    }
                }
                log::debug!("Geometry {id:?} disposed, {} buffer(s) deleted.", deleted.len());
                gpu.state.forget_deleted(&deleted, &[]);
            }
            Disposal::Material(id) => {
                gpu.bindings
                    .release_material(&mut gpu.context.programs, &mut gpu.device, id)?;
                log::debug!("Material {id:?} disposed.");
            }
            Disposal::Image(id) => {
                if let Some(entry) = gpu.context.textures.get(&id).copied() {
                    gpu.context
                        .textures
                        .release_if_present::<lumen_data::Image>(&mut gpu.device, id)?;
                    gpu.state.forget_deleted(&[], &[entry.handle]);
                    log::debug!("Image {id:?} disposed.");
                }
            }
        }
        Ok(())
    }

    /// Drops state snapshots and cached uniforms of deleted programs.
    fn forget_deleted_programs(&mut self) {
        for program in self.gpu.context.programs.take_deleted() {
            self.gpu.state.forget_program(program);
            self.gpu.uniforms.forget_program(program);
        }
    }

    /// Renders a depth map for every view of every shadow-casting light and
    /// deletes the maps of lights that stopped casting.
    fn render_shadow_maps(
        &mut self,
        scene: &SceneGraph,
        root: NodeId,
        stats: &mut FrameStats,
    ) -> Result<(), RenderError> {
        self.shadows.clear();
        let mut active: AHashSet<TargetKey> = AHashSet::new();

        if self.config.shadows_enabled {
            // The depth program ignores lights and fog.
            let depth_environment = Environment::default().for_offscreen().signature();
            let max_units = self.config.max_texture_units;

            for light in self.lights.iter().take_while(|light| light.light.casts_shadow()) {
                for view in shadow_views(light, self.config.default_shadow_map_size) {
                    let key = TargetKey::Shadow {
                        light: view.light,
                        face: view.face,
                    };
                    let map = self.gpu.context.targets.acquire(
                        &mut self.gpu.device,
                        key,
                        TargetDesc {
                            width: view.map_size,
                            height: view.map_size,
                            color: None,
                            depth: true,
                            version: 0,
                        },
                    )?;
                    self.gpu.forget_deleted_targets();
                    active.insert(key);
                    let Some(texture) = map.depth else {
                        continue;
                    };

                    self.gpu.state.bind_framebuffer(&mut self.gpu.device, Some(map.framebuffer));
                    self.gpu.clear((view.map_size, view.map_size), None);

                    self.camera_uniforms.clear();
                    self.camera_uniforms.push(uniforms::VIEW_MATRIX, UniformValue::Mat4(view.view));
                    self.camera_uniforms
                        .push(uniforms::PROJECTION_MATRIX, UniformValue::Mat4(view.projection));
                    self.camera_uniforms
                        .push(uniforms::CAMERA_POSITION, UniformValue::Vec3(light.position()));

                    let casters = self
                        .shadow_lists
                        .collect_shadow_casters(scene, root, &view.render_view(depth_environment));
                    let pass = PassParams {
                        slot: None,
                        environment: depth_environment,
                        camera: &self.camera_uniforms,
                        scene: None,
                        transmission: None,
                        cull: None,
                    };
                    let mut submitter = self.gpu.submitter(stats, max_units);
                    for item in casters.opaque() {
                        submitter.draw_item(scene, item, &pass)?;
                    }
                    stats.shadow_passes += 1;

                    self.shadows.push(RenderedShadow {
                        kind: light.light.kind,
                        face: view.face,
                        texture,
                        matrix: view.view_projection(),
                        bias: view.bias,
                    });
                }
            }
        }

        self.gpu.context.targets.retain(&mut self.gpu.device, |key| {
            !matches!(key, TargetKey::Shadow { .. }) || active.contains(key)
        })?;
        self.gpu.forget_deleted_targets();
        Ok(())
    }

    /// Fills the per-frame light, fog, clipping and shadow uniforms.
    fn write_scene_uniforms(&mut self) {
        let values = &mut self.scene_uniforms;
        values.clear();

        let mut ambient = Vec3::ZERO;
        let (mut hemi, mut dir, mut point, mut spot) = (0, 0, 0, 0);
        for light in &self.lights {
            let radiance = light.light.radiance();
            match light.light.kind {
                LightKind::Ambient => ambient += radiance,
                LightKind::Hemisphere { ground_color } => {
                    let up = light.world_matrix.transform_vector3(Vec3::Y).normalize();
                    values.push(
                        format!("{}[{hemi}]", uniforms::HEMISPHERE_LIGHT_SKY_COLOR),
                        UniformValue::Vec3(radiance),
                    );
                    values.push(
                        format!("{}[{hemi}]", uniforms::HEMISPHERE_LIGHT_GROUND_COLOR),
                        UniformValue::Vec3(ground_color.scaled_rgb(light.light.intensity)),
                    );
                    values.push(
                        format!("{}[{hemi}]", uniforms::HEMISPHERE_LIGHT_DIRECTION),
                        UniformValue::Vec3(up),
                    );
                    hemi += 1;
                }
                LightKind::Directional => {
                    values.push(
                        format!("{}[{dir}]", uniforms::DIRECTIONAL_LIGHT_DIRECTION),
                        UniformValue::Vec3(light.direction()),
                    );
                    values.push(
                        format!("{}[{dir}]", uniforms::DIRECTIONAL_LIGHT_COLOR),
                        UniformValue::Vec3(radiance),
                    );
                    dir += 1;
                }
                LightKind::Point { range, decay } => {
                    values.push(
                        format!("{}[{point}]", uniforms::POINT_LIGHT_POSITION),
                        UniformValue::Vec3(light.position()),
                    );
                    values.push(format!("{}[{point}]", uniforms::POINT_LIGHT_COLOR), UniformValue::Vec3(radiance));
                    values.push(format!("{}[{point}]", uniforms::POINT_LIGHT_DISTANCE), UniformValue::Float(range));
                    values.push(format!("{}[{point}]", uniforms::POINT_LIGHT_DECAY), UniformValue::Float(decay));
                    point += 1;
                }
                LightKind::Spot {
                    range,
                    angle,
                    penumbra,
                    decay,
                } => {
                    values.push(
                        format!("{}[{spot}]", uniforms::SPOT_LIGHT_POSITION),
                        UniformValue::Vec3(light.position()),
                    );
                    values.push(
                        format!("{}[{spot}]", uniforms::SPOT_LIGHT_DIRECTION),
                        UniformValue::Vec3(light.direction()),
                    );
                    values.push(format!("{}[{spot}]", uniforms::SPOT_LIGHT_COLOR), UniformValue::Vec3(radiance));
                    values.push(format!("{}[{spot}]", uniforms::SPOT_LIGHT_DISTANCE), UniformValue::Float(range));
                    values.push(format!("{}[{spot}]", uniforms::SPOT_LIGHT_DECAY), UniformValue::Float(decay));
                    values.push(
                        format!("{}[{spot}]", uniforms::SPOT_LIGHT_CONE_COS),
                        UniformValue::Float(angle.cos()),
                    );
                    values.push(
                        format!("{}[{spot}]", uniforms::SPOT_LIGHT_PENUMBRA_COS),
                        UniformValue::Float((angle * (1.0 - penumbra)).cos()),
                    );
                    spot += 1;
                }
            }
        }
        values.push(uniforms::AMBIENT_LIGHT_COLOR, UniformValue::Vec3(ambient));

        // Shadow maps, indexed like the casting lights of their kind.
        let (mut dir, mut spot, mut point) = (0usize, 0usize, 0usize);
        let mut unit = FIRST_SHADOW_UNIT;
        for shadow in &self.shadows {
            let (map, matrix, bias, index, bias_index) = match shadow.kind {
                LightKind::Directional => {
                    dir += 1;
                    (
                        uniforms::DIRECTIONAL_SHADOW_MAP,
                        uniforms::DIRECTIONAL_SHADOW_MATRIX,
                        uniforms::DIRECTIONAL_SHADOW_BIAS,
                        dir - 1,
                        dir - 1,
                    )
                }
                LightKind::Spot { .. } => {
                    spot += 1;
                    (
                        uniforms::SPOT_SHADOW_MAP,
                        uniforms::SPOT_SHADOW_MATRIX,
                        uniforms::SPOT_SHADOW_BIAS,
                        spot - 1,
                        spot - 1,
                    )
                }
                LightKind::Point { .. } => {
                    if shadow.face == 0 {
                        point += 1;
                    }
                    let light_index = point - 1;
                    (
                        uniforms::POINT_SHADOW_MAP,
                        uniforms::POINT_SHADOW_MATRIX,
                        uniforms::POINT_SHADOW_BIAS,
                        light_index * 6 + shadow.face as usize,
                        light_index,
                    )
                }
                LightKind::Ambient | LightKind::Hemisphere { .. } => continue,
            };
            values.push_sampler(format!("{map}[{index}]"), unit, shadow.texture);
            values.push(format!("{matrix}[{index}]"), UniformValue::Mat4(shadow.matrix));
            values.push(format!("{bias}[{bias_index}]"), UniformValue::Float(shadow.bias));
            unit += 1;
        }

        let config = &self.config;
        let fog = config.fog_color;
        values.push(uniforms::FOG_COLOR, UniformValue::Vec3(Vec3::new(fog.r, fog.g, fog.b)));
        values.push(uniforms::FOG_NEAR, UniformValue::Float(config.fog_near));
        values.push(uniforms::FOG_FAR, UniformValue::Float(config.fog_far));
        values.push(uniforms::FOG_DENSITY, UniformValue::Float(config.fog_density));
        values.push(
            uniforms::TONE_MAPPING_EXPOSURE,
            UniformValue::Float(config.tone_mapping_exposure),
        );
        for (i, [a, b, c, d]) in config.clipping_planes.iter().copied().enumerate() {
            values.push(
                format!("{}[{i}]", uniforms::CLIPPING_PLANES),
                UniformValue::Vec4(Vec4::new(a, b, c, d)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::Light;
    use lumen_infra::HeadlessDevice;
    use slotmap::KeyData;

    fn renderer() -> FrameRenderer<HeadlessDevice> {
        FrameRenderer::new(HeadlessDevice::new(), RendererConfig::default())
    }

    fn light(id: u64, light: Light) -> VisibleLight {
        VisibleLight {
            node: NodeId::from(KeyData::from_ffi(id)),
            light,
            world_matrix: Mat4::IDENTITY,
        }
    }

    fn value<'a>(uniforms: &'a PassUniforms, name: &str) -> Option<&'a UniformValue> {
        uniforms.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[test]
    fn test_scene_uniforms_sum_ambient_lights() {
        let mut renderer = renderer();
        renderer.lights.push(light(1, Light::ambient(LinearRgba::WHITE, 0.25)));
        renderer.lights.push(light(2, Light::ambient(LinearRgba::rgb(1.0, 0.0, 0.0), 0.5)));

        renderer.write_scene_uniforms();

        assert_eq!(
            value(&renderer.scene_uniforms, uniforms::AMBIENT_LIGHT_COLOR),
            Some(&UniformValue::Vec3(Vec3::new(0.75, 0.25, 0.25)))
        );
    }

    #[test]
    fn test_scene_uniforms_index_lights_per_kind() {
        let mut renderer = renderer();
        renderer.lights.push(light(1, Light::point(LinearRgba::WHITE, 1.0, 10.0)));
        renderer.lights.push(light(2, Light::directional(LinearRgba::WHITE, 1.0)));
        renderer.lights.push(light(3, Light::point(LinearRgba::WHITE, 2.0, 20.0)));

        renderer.write_scene_uniforms();

        let uniforms = &renderer.scene_uniforms;
        assert_eq!(value(uniforms, "pointLightDistance[0]"), Some(&UniformValue::Float(10.0)));
        assert_eq!(value(uniforms, "pointLightDistance[1]"), Some(&UniformValue::Float(20.0)));
        assert!(value(uniforms, "directionalLightColor[0]").is_some());
        assert!(value(uniforms, "directionalLightColor[1]").is_none());
    }

    #[test]
    fn test_spot_cone_uniforms() {
        let mut renderer = renderer();
        renderer
            .lights
            .push(light(1, Light::spot(LinearRgba::WHITE, 1.0, 0.0, 0.5, 0.5)));

        renderer.write_scene_uniforms();

        let Some(UniformValue::Float(cone)) = value(&renderer.scene_uniforms, "spotLightConeCos[0]") else {
            panic!("missing cone uniform");
        };
        let Some(UniformValue::Float(penumbra)) = value(&renderer.scene_uniforms, "spotLightPenumbraCos[0]")
        else {
            panic!("missing penumbra uniform");
        };
        approx::assert_abs_diff_eq!(*cone, 0.5f32.cos());
        approx::assert_abs_diff_eq!(*penumbra, 0.25f32.cos());
    }

    #[test]
    fn test_clipping_planes_become_vec4_uniforms() {
        let mut renderer = renderer();
        renderer.config.clipping_planes = vec![[0.0, 1.0, 0.0, -2.0]];

        renderer.write_scene_uniforms();

        assert_eq!(
            value(&renderer.scene_uniforms, "clippingPlanes[0]"),
            Some(&UniformValue::Vec4(Vec4::new(0.0, 1.0, 0.0, -2.0)))
        );
    }

    #[test]
    fn test_missing_root_is_a_scene_error() {
        let mut renderer = renderer();
        let mut scene = SceneGraph::new();
        scene.create_node();
        let camera = Camera::perspective(1.0, 1.0, 0.1, 100.0);

        let result = renderer.render_frame(&mut scene, NodeId::default(), &camera, None);

        assert!(matches!(result, Err(RenderError::Scene(SceneError::NodeNotFound(_)))));
    }

    #[test]
    fn test_released_target_is_no_longer_bound() {
        // --- 1. ARRANGE ---
        let mut renderer = renderer();
        let mut scene = SceneGraph::new();
        let root = scene.create_node();
        let camera = Camera::perspective(1.0, 1.0, 0.1, 100.0);
        let target = RenderTarget::new(32, 32);
        renderer.render_frame(&mut scene, root, &camera, Some(&target)).unwrap();
        let framebuffer = renderer
            .gpu
            .context
            .targets
            .get(&TargetKey::User(target.id()))
            .map(|target| target.framebuffer);
        assert!(framebuffer.is_some());
        assert_eq!(renderer.gpu.state.bound_framebuffer(), Some(framebuffer));

        // --- 2. ACT ---
        let released = renderer.release_target(target.id()).unwrap();

        // --- 3. ASSERT ---
        assert!(released);
        assert_eq!(renderer.gpu.state.bound_framebuffer(), None);
    }
}
