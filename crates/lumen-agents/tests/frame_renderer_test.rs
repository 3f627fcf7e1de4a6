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

use lumen_agents::{FrameRenderer, RenderError};
use lumen_core::config::RendererConfig;
use lumen_core::material::{Material, MaterialKind};
use lumen_core::math::{LinearRgba, Vec3};
use lumen_core::renderer::{CacheError, Light, ShadowSettings, Side};
use lumen_core::scene::{GeometryId, MaterialId, NodeId, ResourceHandle};
use lumen_data::geometry::{shapes, POSITION};
use lumen_data::{Camera, Image, RenderTarget, SceneGraph};
use lumen_infra::graphics::headless::RecordedCall;
use lumen_infra::HeadlessDevice;

struct Fixture {
    scene: SceneGraph,
    root: NodeId,
    camera: Camera,
    renderer: FrameRenderer<HeadlessDevice>,
}

impl Fixture {
    fn new(config: RendererConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut scene = SceneGraph::new();
        let root = scene.create_named_node("root");
        Self {
            scene,
            root,
            camera: Camera::perspective(1.0, 16.0 / 9.0, 0.1, 100.0),
            renderer: FrameRenderer::new(HeadlessDevice::new(), config),
        }
    }

    /// Adds a unit cube in front of the camera.
    fn add_cube(&mut self, material: Material, x: f32) -> (NodeId, GeometryId, MaterialId) {
        let geometry = self.scene.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
        let material = self.scene.add_material(material);
        let node = self.scene.create_node();
        self.scene.add_child(self.root, node).unwrap();
        self.scene.set_position(node, Vec3::new(x, 0.0, -6.0)).unwrap();
        self.scene.attach_drawable(node, geometry, material).unwrap();
        (node, geometry, material)
    }

    fn add_light(&mut self, light: Light, position: Vec3) -> NodeId {
        let node = self.scene.create_node();
        self.scene.add_child(self.root, node).unwrap();
        self.scene.set_position(node, position).unwrap();
        self.scene.attach_light(node, light).unwrap();
        node
    }

    fn render(&mut self) -> Result<lumen_agents::FrameStats, RenderError> {
        self.renderer.render_frame(&mut self.scene, self.root, &self.camera, None)
    }
}

fn glass() -> Material {
    let mut material = Material::standard(LinearRgba::WHITE, 0.0, 0.1);
    if let MaterialKind::Standard { transmission, .. } = &mut material.kind {
        *transmission = 1.0;
    }
    material
}

#[test]
fn test_equal_materials_share_one_program() {
    // --- 1. ARRANGE ---
    let mut fixture = Fixture::new(RendererConfig::default());
    fixture.add_cube(Material::lambert(LinearRgba::rgb(1.0, 0.0, 0.0)), -1.5);
    fixture.add_cube(Material::lambert(LinearRgba::rgb(0.0, 1.0, 0.0)), 1.5);

    // --- 2. ACT ---
    let stats = fixture.render().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.opaque, 2);
    assert_eq!(fixture.renderer.device().counters().programs_created, 1);
    assert_eq!(fixture.renderer.context().programs.len(), 1);
    assert_eq!(fixture.renderer.bound_programs(), 2);
    assert_eq!(fixture.renderer.device().counters().invalid_calls, 0);
}

#[test]
fn test_unchanged_frame_issues_no_redundant_calls() {
    let mut fixture = Fixture::new(RendererConfig::default());
    fixture.add_cube(Material::basic(LinearRgba::WHITE), 0.0);
    let first = fixture.render().unwrap();
    let counters = fixture.renderer.device().counters();

    let second = fixture.render().unwrap();

    assert!(first.state_changes > 0);
    assert!(first.uniform_uploads > 0);
    assert_eq!(second.draw_calls, 1);
    assert_eq!(second.state_changes, 0);
    assert_eq!(second.uniform_uploads, 0);
    let after = fixture.renderer.device().counters();
    assert_eq!(after.buffers_created, counters.buffers_created);
    assert_eq!(after.buffer_updates, counters.buffer_updates);
    assert_eq!(after.programs_created, counters.programs_created);
}

#[test]
fn test_edited_attribute_is_updated_in_place() {
    let mut fixture = Fixture::new(RendererConfig::default());
    let (_, geometry, _) = fixture.add_cube(Material::basic(LinearRgba::WHITE), 0.0);
    fixture.render().unwrap();
    let created = fixture.renderer.device().counters().buffers_created;

    let attribute = fixture
        .scene
        .geometry_mut(geometry)
        .unwrap()
        .attribute_mut(POSITION)
        .unwrap();
    let shifted: Vec<f32> = attribute.points().flat_map(|p| [p.x, p.y + 0.1, p.z]).collect();
    attribute.set_data(shifted);
    fixture.render().unwrap();

    let counters = fixture.renderer.device().counters();
    assert_eq!(counters.buffers_created, created);
    assert_eq!(counters.buffer_updates, 1);
}

#[test]
fn test_resized_attribute_is_rejected() {
    let mut fixture = Fixture::new(RendererConfig::default());
    let (_, geometry, _) = fixture.add_cube(Material::basic(LinearRgba::WHITE), 0.0);
    fixture.render().unwrap();

    let attribute = fixture
        .scene
        .geometry_mut(geometry)
        .unwrap()
        .attribute_mut(POSITION)
        .unwrap();
    let mut grown: Vec<f32> = attribute.points().flat_map(|p| [p.x, p.y, p.z]).collect();
    grown.extend([0.0, 0.0, 0.0]);
    attribute.set_data(grown);
    let result = fixture.render();

    assert!(matches!(
        result,
        Err(RenderError::Cache(CacheError::InvalidResize { .. }))
    ));
}

#[test]
fn test_failed_program_skips_its_draws_only() {
    // --- 1. ARRANGE ---
    let mut fixture = Fixture::new(RendererConfig::default());
    fixture
        .renderer
        .device_mut()
        .fail_programs_containing(Some("#define MATERIAL_PHONG"));
    fixture.add_cube(Material::phong(LinearRgba::WHITE, 30.0), -1.5);
    fixture.add_cube(Material::basic(LinearRgba::WHITE), 1.5);

    // --- 2. ACT ---
    let first = fixture.render().unwrap();
    let second = fixture.render().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(first.draw_calls, 1);
    assert_eq!(first.skipped_draws, 1);
    assert_eq!(second.draw_calls, 1);
    assert_eq!(second.skipped_draws, 1);
    // The broken key is not compiled again.
    assert_eq!(fixture.renderer.device().counters().program_failures, 1);
}

#[test]
fn test_context_loss_is_reported_once_and_recovered() {
    // --- 1. ARRANGE ---
    let mut fixture = Fixture::new(RendererConfig::default());
    for i in 0..10 {
        fixture.add_cube(Material::lambert(LinearRgba::WHITE), i as f32 - 4.5);
    }
    fixture.render().unwrap();
    let initial = fixture.renderer.device().counters();

    // --- 2. ACT ---
    fixture.renderer.device_mut().simulate_context_loss();
    let lost = fixture.render();
    let while_lost = fixture.render().unwrap();
    fixture.renderer.device_mut().restore_context();
    let restored = fixture.render().unwrap();

    // --- 3. ASSERT ---
    assert!(matches!(lost, Err(RenderError::ContextLost)));
    assert!(while_lost.skipped_frame);
    assert_eq!(while_lost.draw_calls, 0);
    assert!(restored.context_restored);
    assert_eq!(restored.draw_calls, 10);

    // Every cache entry was re-created exactly once.
    let after = fixture.renderer.device().counters();
    assert_eq!(after.programs_created, 2 * initial.programs_created);
    assert_eq!(after.buffers_created, 2 * initial.buffers_created);
    assert_eq!(fixture.renderer.context().programs.len(), 1);
    assert_eq!(fixture.renderer.context().buffers.len(), initial.buffers_created as usize);
    assert_eq!(after.invalid_calls, 0);

    let next = fixture.render().unwrap();
    assert!(!next.context_restored);
}

#[test]
fn test_disposed_resources_free_device_objects() {
    let mut fixture = Fixture::new(RendererConfig::default());
    let (node, geometry, material) = fixture.add_cube(Material::basic(LinearRgba::WHITE), 0.0);
    fixture.render().unwrap();
    assert_eq!(fixture.renderer.device().live_programs(), 1);
    assert!(fixture.renderer.device().live_buffers() > 0);

    fixture.scene.detach_drawable(node).unwrap();
    fixture
        .scene
        .dispose_resource(ResourceHandle::Geometry(geometry))
        .unwrap();
    fixture
        .scene
        .dispose_resource(ResourceHandle::Material(material))
        .unwrap();
    let stats = fixture.render().unwrap();

    assert_eq!(stats.draw_calls, 0);
    assert_eq!(fixture.renderer.device().live_buffers(), 0);
    assert_eq!(fixture.renderer.device().live_programs(), 0);
    assert!(fixture.renderer.context().buffers.is_empty());
    assert!(fixture.renderer.context().programs.is_empty());
}

#[test]
fn test_shadow_maps_follow_casting_lights() {
    // --- 1. ARRANGE ---
    let mut fixture = Fixture::new(RendererConfig::default());
    let (cube, _, _) = fixture.add_cube(Material::lambert(LinearRgba::WHITE), 0.0);
    fixture.scene.node_mut(cube).unwrap().set_cast_shadow(true);
    fixture.scene.node_mut(cube).unwrap().set_receive_shadow(true);
    fixture.add_light(
        Light::directional(LinearRgba::WHITE, 1.0).with_shadow(ShadowSettings::default()),
        Vec3::new(0.0, 0.0, 4.0),
    );
    fixture.add_light(
        Light::point(LinearRgba::WHITE, 1.0, 20.0).with_shadow(ShadowSettings::default()),
        Vec3::new(0.0, 3.0, -6.0),
    );
    fixture.add_light(Light::ambient(LinearRgba::WHITE, 0.2), Vec3::ZERO);

    // --- 2. ACT ---
    let with_shadows = fixture.render().unwrap();
    let mut config = fixture.renderer.config().clone();
    config.shadows_enabled = false;
    fixture.renderer.set_config(config);
    let without_shadows = fixture.render().unwrap();

    // --- 3. ASSERT ---
    // One directional map and six point light faces.
    assert_eq!(with_shadows.shadow_passes, 7);
    assert_eq!(without_shadows.shadow_passes, 0);
    assert_eq!(fixture.renderer.context().targets.len(), 0);
    assert_eq!(fixture.renderer.device().live_framebuffers(), 0);
}

#[test]
fn test_transmissive_items_get_an_opaque_capture() {
    let mut fixture = Fixture::new(RendererConfig::default());
    fixture.add_cube(Material::basic(LinearRgba::WHITE), -1.5);
    fixture.add_cube(glass(), 1.5);

    let stats = fixture.render().unwrap();

    assert!(stats.transmission_pass);
    assert_eq!(stats.opaque, 1);
    assert_eq!(stats.transmissive, 1);
    // The opaque cube is drawn into the capture and into the surface.
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(stats.transmission_draws, 1);
    assert_eq!(fixture.renderer.context().targets.len(), 1);
}

#[test]
fn test_double_sided_glass_is_drawn_into_the_capture() {
    // --- 1. ARRANGE ---
    let mut fixture = Fixture::new(RendererConfig::default());
    fixture.add_cube(Material::basic(LinearRgba::WHITE), -3.0);
    for x in [0.0, 3.0] {
        let mut material = glass();
        material.side = Side::Double;
        fixture.add_cube(material, x);
    }

    // --- 2. ACT ---
    let stats = fixture.render().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(stats.opaque, 1);
    assert_eq!(stats.transmissive, 2);
    // The capture holds the opaque cube and the back faces of both glass cubes.
    assert_eq!(stats.transmission_draws, 3);
    assert_eq!(stats.draw_calls, 6);
    assert_eq!(fixture.renderer.device().counters().invalid_calls, 0);
}

#[test]
fn test_scene_without_transmission_skips_the_capture() {
    let mut fixture = Fixture::new(RendererConfig::default());
    fixture.add_cube(Material::basic(LinearRgba::WHITE), 0.0);

    let stats = fixture.render().unwrap();

    assert!(!stats.transmission_pass);
    assert_eq!(stats.draw_calls, 1);
    assert!(fixture.renderer.context().targets.is_empty());
}

#[test]
fn test_render_target_is_recreated_on_resize() {
    // --- 1. ARRANGE ---
    let mut fixture = Fixture::new(RendererConfig::default());
    fixture.add_cube(Material::basic(LinearRgba::WHITE), 0.0);
    let mut target = RenderTarget::new(64, 64);
    let Fixture {
        scene,
        root,
        camera,
        renderer,
    } = &mut fixture;

    // --- 2. ACT ---
    renderer.render_frame(scene, *root, camera, Some(&target)).unwrap();
    let first = renderer.target_texture(target.id());
    renderer.render_frame(scene, *root, camera, Some(&target)).unwrap();
    let created_once = renderer.device().counters().framebuffers_created;
    target.set_size(128, 128);
    renderer.render_frame(scene, *root, camera, Some(&target)).unwrap();

    // --- 3. ASSERT ---
    assert!(first.is_some());
    assert_eq!(created_once, 1);
    let counters = renderer.device().counters();
    assert_eq!(counters.framebuffers_created, 2);
    assert_eq!(counters.framebuffers_deleted, 1);
    assert!(renderer.release_target(target.id()).unwrap());
    assert!(!renderer.release_target(target.id()).unwrap());
    assert!(renderer.target_texture(target.id()).is_none());
}

#[test]
fn test_hidden_subtree_is_not_drawn() {
    let mut fixture = Fixture::new(RendererConfig::default());
    let (node, _, _) = fixture.add_cube(Material::basic(LinearRgba::WHITE), 0.0);
    fixture.scene.set_visible(node, false).unwrap();

    let stats = fixture.render().unwrap();

    assert_eq!(stats.draw_calls, 0);
    assert_eq!(fixture.renderer.device().counters().buffers_created, 0);
}

#[test]
fn test_object_behind_camera_is_culled() {
    let mut fixture = Fixture::new(RendererConfig::default());
    let (node, _, _) = fixture.add_cube(Material::basic(LinearRgba::WHITE), 0.0);
    fixture.scene.set_position(node, Vec3::new(0.0, 0.0, 10.0)).unwrap();

    let stats = fixture.render().unwrap();

    assert_eq!(stats.culled, 1);
    assert_eq!(stats.draw_calls, 0);
}

#[test]
fn test_edited_material_is_written_again() {
    let mut fixture = Fixture::new(RendererConfig::default());
    let (_, _, material) = fixture.add_cube(Material::basic(LinearRgba::WHITE), 0.0);
    fixture.render().unwrap();
    let programs = fixture.renderer.device().counters().programs_created;

    fixture.scene.material_mut(material).unwrap().needs_update();
    let edited = fixture.render().unwrap();
    let settled = fixture.render().unwrap();

    assert!(edited.uniform_uploads > 0);
    assert!(edited.state_changes > 0);
    assert_eq!(settled.uniform_uploads, 0);
    assert_eq!(settled.state_changes, 0);
    assert_eq!(fixture.renderer.device().counters().programs_created, programs);
}

#[test]
fn test_degenerate_drawables_are_bucketed_without_draws() {
    // --- 1. ARRANGE ---
    let mut fixture = Fixture::new(RendererConfig::default());
    let (_, empty_range, _) = fixture.add_cube(Material::basic(LinearRgba::WHITE), -1.5);
    fixture
        .scene
        .geometry_mut(empty_range)
        .unwrap()
        .set_draw_range(0, Some(0));
    let (no_instances, geometry, material) = fixture.add_cube(glass(), 1.5);
    fixture
        .scene
        .attach_instanced_drawable(no_instances, geometry, material, 0)
        .unwrap();

    // --- 2. ACT ---
    let stats = fixture.render().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(stats.opaque, 1);
    assert_eq!(stats.transmissive, 1);
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(stats.skipped_draws, 0);
    assert_eq!(fixture.renderer.device().counters().draws, 0);
}

#[test]
fn test_instanced_drawable_is_drawn_once_and_never_culled() {
    let mut fixture = Fixture::new(RendererConfig::default());
    let (node, geometry, material) = fixture.add_cube(Material::basic(LinearRgba::WHITE), 0.0);
    fixture
        .scene
        .attach_instanced_drawable(node, geometry, material, 5)
        .unwrap();
    // Behind the camera: a single instance here would be culled.
    fixture.scene.set_position(node, Vec3::new(0.0, 0.0, 10.0)).unwrap();

    let stats = fixture.render().unwrap();

    assert_eq!(stats.culled, 0);
    assert_eq!(stats.draw_calls, 1);
    let draws: Vec<u32> = fixture
        .renderer
        .device()
        .calls()
        .iter()
        .filter_map(|call| match call {
            RecordedCall::Draw(draw) => Some(draw.instance_count),
            _ => None,
        })
        .collect();
    assert_eq!(draws, vec![5]);
}

#[test]
fn test_identical_draws_in_one_frame_share_state_and_uniforms() {
    fn frame_with(copies: usize) -> lumen_agents::FrameStats {
        let mut fixture = Fixture::new(RendererConfig::default());
        let geometry = fixture.scene.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
        let material = fixture.scene.add_material(Material::lambert(LinearRgba::WHITE));
        for _ in 0..copies {
            let node = fixture.scene.create_node();
            fixture.scene.add_child(fixture.root, node).unwrap();
            fixture.scene.set_position(node, Vec3::new(0.0, 0.0, -6.0)).unwrap();
            fixture.scene.attach_drawable(node, geometry, material).unwrap();
        }
        fixture.render().unwrap()
    }

    let single = frame_with(1);
    let many = frame_with(10);

    assert_eq!(many.draw_calls, 10);
    assert_eq!(many.state_changes, single.state_changes);
    assert_eq!(many.uniform_uploads, single.uniform_uploads);
}

#[test]
fn test_disposed_map_is_unbound() {
    // --- 1. ARRANGE ---
    let mut fixture = Fixture::new(RendererConfig::default());
    let image = fixture.scene.add_image(Image::solid([255, 0, 0, 255]));
    let mut textured = Material::basic(LinearRgba::WHITE);
    textured.map = Some(image);
    fixture.add_cube(textured, 0.0);
    fixture.render().unwrap();
    assert_eq!(fixture.renderer.device().live_textures(), 1);

    // --- 2. ACT ---
    fixture
        .scene
        .dispose_resource(ResourceHandle::Image(image))
        .unwrap();
    fixture.renderer.device_mut().take_calls();
    let stats = fixture.render().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(fixture.renderer.device().live_textures(), 0);
    assert!(fixture
        .renderer
        .device()
        .calls()
        .contains(&RecordedCall::BindTexture(0, None)));
    assert_eq!(fixture.renderer.device().counters().invalid_calls, 0);
}
