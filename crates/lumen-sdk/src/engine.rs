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

//! The `Engine` facade over the scene graph and the frame renderer.

use lumen_agents::{FrameRenderer, FrameStats, RenderError};
use lumen_core::material::Material;
use lumen_core::math::{Quaternion, Vec3};
use lumen_core::renderer::{GraphicsDevice, Light};
use lumen_core::scene::{GeometryId, ImageId, MaterialId, NodeId, ResourceHandle};
use lumen_core::RendererConfig;
use lumen_data::{Camera, Geometry, Image, RenderTarget, SceneError, SceneGraph};
use lumen_infra::HeadlessDevice;

use crate::config::EngineConfig;

/// A scene graph and the renderer that draws it.
///
/// Nodes created through the engine hang under a root node owned by the
/// engine, so [`Engine::render`] draws everything the application built.
/// [`Engine::render_frame`] renders any other subtree.
///
/// # Examples
///
/// ```
/// use lumen_sdk::prelude::*;
///
/// let mut engine = Engine::headless(EngineConfig::default());
/// let cube = engine.create_node();
/// let geometry = engine.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
/// let material = engine.add_material(Material::basic(LinearRgba::WHITE));
/// engine.attach_drawable(cube, geometry, material).unwrap();
/// engine.set_local_transform(cube, Vec3::new(0.0, 0.0, -5.0), Quaternion::IDENTITY, Vec3::ONE).unwrap();
///
/// let camera = Camera::perspective(1.0, 16.0 / 9.0, 0.1, 100.0);
/// let stats = engine.render(&camera).unwrap();
/// assert_eq!(stats.draw_calls, 1);
/// ```
pub struct Engine<D: GraphicsDevice = HeadlessDevice> {
    scene: SceneGraph,
    root: NodeId,
    renderer: FrameRenderer<D>,
    config: EngineConfig,
}

impl Engine<HeadlessDevice> {
    /// Creates an engine drawing through a [`HeadlessDevice`].
    pub fn headless(config: EngineConfig) -> Self {
        Self::new(HeadlessDevice::new(), config)
    }
}

impl<D: GraphicsDevice> Engine<D> {
    /// Creates an engine drawing through `device`.
    pub fn new(device: D, config: EngineConfig) -> Self {
        let mut scene = SceneGraph::new();
        let root = scene.create_named_node("root");
        let renderer = FrameRenderer::new(device, config.renderer.clone());
        log::info!("Engine started (log level {:?}).", config.log_level);
        Self {
            scene,
            root,
            renderer,
            config,
        }
    }

    // --- Nodes ---

    /// The node every node created by the engine starts under.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Creates a node under the engine root.
    pub fn create_node(&mut self) -> NodeId {
        let node = self.scene.create_node();
        self.adopt(node)
    }

    /// Creates a named node under the engine root.
    pub fn create_named_node(&mut self, name: impl Into<String>) -> NodeId {
        let node = self.scene.create_named_node(name);
        self.adopt(node)
    }

    fn adopt(&mut self, node: NodeId) -> NodeId {
        // A fresh node has no parent and no children, so this cannot fail.
        if let Err(err) = self.scene.add_child(self.root, node) {
            log::error!("Failed to attach {node:?} to the engine root: {err}");
        }
        node
    }

    /// Re-parents `node`, keeping its world pose. `None` puts it back under the root.
    ///
    /// # Errors
    /// [`SceneError::CyclicParent`] if `parent` is `node` or one of its descendants.
    pub fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        self.scene.set_parent(node, Some(parent.unwrap_or(self.root)))
    }

    /// Sets the local position, rotation and scale of `node`.
    pub fn set_local_transform(
        &mut self,
        node: NodeId,
        position: Vec3,
        rotation: Quaternion,
        scale: Vec3,
    ) -> Result<(), SceneError> {
        self.scene.set_local_transform(node, position, rotation, scale)
    }

    /// Shows or hides `node` and its subtree.
    pub fn set_visible(&mut self, node: NodeId, visible: bool) -> Result<(), SceneError> {
        self.scene.set_visible(node, visible)
    }

    /// Makes `node` render `geometry` with `material`.
    pub fn attach_drawable(
        &mut self,
        node: NodeId,
        geometry: GeometryId,
        material: MaterialId,
    ) -> Result<(), SceneError> {
        self.scene.attach_drawable(node, geometry, material)
    }

    /// Attaches a light to `node`. It shines along the node's `-Z` axis.
    pub fn attach_light(&mut self, node: NodeId, light: Light) -> Result<(), SceneError> {
        self.scene.attach_light(node, light)
    }

    // --- Resources ---

    /// Registers a geometry.
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.scene.add_geometry(geometry)
    }

    /// Registers a material.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.scene.add_material(material)
    }

    /// Registers an image.
    pub fn add_image(&mut self, image: Image) -> ImageId {
        self.scene.add_image(image)
    }

    /// Releases the device objects of a resource at the start of the next frame.
    pub fn dispose_resource(&mut self, handle: ResourceHandle) -> Result<(), SceneError> {
        self.scene.dispose_resource(handle)
    }

    // --- Rendering ---

    /// Renders everything under the engine root to the default surface.
    pub fn render(&mut self, camera: &Camera) -> Result<FrameStats, RenderError> {
        self.render_frame(self.root, camera, None)
    }

    /// Renders the subtree under `scene_root` into `target`, or the default
    /// surface for `None`.
    pub fn render_frame(
        &mut self,
        scene_root: NodeId,
        camera: &Camera,
        target: Option<&RenderTarget>,
    ) -> Result<FrameStats, RenderError> {
        let result = self.renderer.render_frame(&mut self.scene, scene_root, camera, target);
        match &result {
            Ok(stats) => log::debug!(
                "Frame {}: {} draws, {} triangles, {} culled.",
                self.renderer.frame_count(),
                stats.draw_calls,
                stats.triangles,
                stats.culled
            ),
            Err(RenderError::ContextLost) => {
                log::warn!("Frame dropped: the graphics context is lost.")
            }
            Err(err) => log::error!("Frame failed: {err}"),
        }
        result
    }

    // --- Access ---

    /// The scene graph.
    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// The scene graph, mutably, for operations the facade does not wrap.
    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// The frame renderer.
    pub fn renderer(&self) -> &FrameRenderer<D> {
        &self.renderer
    }

    /// The frame renderer, mutably.
    pub fn renderer_mut(&mut self) -> &mut FrameRenderer<D> {
        &mut self.renderer
    }

    /// The device.
    pub fn device(&self) -> &D {
        self.renderer.device()
    }

    /// The device, mutably.
    pub fn device_mut(&mut self) -> &mut D {
        self.renderer.device_mut()
    }

    /// The configuration the engine was created with, with the current
    /// renderer settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replaces the renderer settings. Takes effect on the next frame.
    pub fn set_renderer_config(&mut self, renderer: RendererConfig) {
        self.renderer.set_config(renderer.clone());
        self.config.renderer = renderer;
    }
}
