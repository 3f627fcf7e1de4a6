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

use lumen_core::renderer::ToneMapping;
use lumen_sdk::prelude::*;
use lumen_sdk::LogLevel;

fn engine() -> Engine {
    let _ = env_logger::builder().is_test(true).try_init();
    Engine::headless(EngineConfig::default())
}

fn camera() -> Camera {
    Camera::perspective(1.0, 16.0 / 9.0, 0.1, 100.0)
}

fn place(engine: &mut Engine, node: NodeId, position: Vec3) {
    engine
        .set_local_transform(node, position, Quaternion::IDENTITY, Vec3::ONE)
        .unwrap();
}

#[test]
fn test_end_to_end_frame() {
    // --- 1. ARRANGE ---
    let mut engine = engine();
    let geometry = engine.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
    let material = engine.add_material(Material::phong(LinearRgba::rgb(0.8, 0.2, 0.2), 40.0));
    for i in 0..3 {
        let node = engine.create_node();
        engine.attach_drawable(node, geometry, material).unwrap();
        place(&mut engine, node, Vec3::new(i as f32 * 2.0 - 2.0, 0.0, -8.0));
    }
    let sun = engine.create_named_node("sun");
    engine
        .attach_light(sun, Light::directional(LinearRgba::WHITE, 1.0))
        .unwrap();

    // --- 2. ACT ---
    let stats = engine.render(&camera()).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(stats.draw_calls, 3);
    assert_eq!(stats.opaque, 3);
    assert_eq!(stats.triangles, 3 * 12);
    assert_eq!(engine.device().counters().programs_created, 1);
    assert_eq!(engine.renderer().frame_count(), 1);
}

#[test]
fn test_parenting_moves_children_with_the_parent() {
    let mut engine = engine();
    let geometry = engine.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
    let material = engine.add_material(Material::basic(LinearRgba::WHITE));
    let pivot = engine.create_node();
    let child = engine.create_node();
    engine.attach_drawable(child, geometry, material).unwrap();
    engine.set_parent(child, Some(pivot)).unwrap();

    // Moving the pivot behind the camera takes the child with it.
    place(&mut engine, pivot, Vec3::new(0.0, 0.0, 20.0));
    let behind = engine.render(&camera()).unwrap();
    place(&mut engine, pivot, Vec3::new(0.0, 0.0, -6.0));
    let in_front = engine.render(&camera()).unwrap();

    assert_eq!(behind.draw_calls, 0);
    assert_eq!(behind.culled, 1);
    assert_eq!(in_front.draw_calls, 1);
}

#[test]
fn test_cyclic_parent_is_rejected() {
    let mut engine = engine();
    let a = engine.create_node();
    let b = engine.create_node();
    engine.set_parent(b, Some(a)).unwrap();

    let err = engine.set_parent(a, Some(b)).unwrap_err();

    assert!(matches!(err, SceneError::CyclicParent { .. }));
    assert_eq!(engine.scene().node(b).unwrap().parent(), Some(a));
}

#[test]
fn test_set_parent_none_returns_to_root() {
    let mut engine = engine();
    let a = engine.create_node();
    let b = engine.create_node();
    engine.set_parent(b, Some(a)).unwrap();

    engine.set_parent(b, None).unwrap();

    assert_eq!(engine.scene().node(b).unwrap().parent(), Some(engine.root()));
}

#[test]
fn test_dispose_resource_releases_early() {
    let mut engine = engine();
    let geometry = engine.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
    let material = engine.add_material(Material::basic(LinearRgba::WHITE));
    let node = engine.create_node();
    engine.attach_drawable(node, geometry, material).unwrap();
    place(&mut engine, node, Vec3::new(0.0, 0.0, -5.0));
    engine.render(&camera()).unwrap();
    let created = engine.device().counters().buffers_created;

    engine
        .dispose_resource(ResourceHandle::Geometry(geometry))
        .unwrap();
    let stats = engine.render(&camera()).unwrap();

    // Still drawn, so the buffers are uploaded again after being released.
    assert_eq!(stats.draw_calls, 1);
    let counters = engine.device().counters();
    assert_eq!(counters.buffers_deleted, created);
    assert_eq!(counters.buffers_created, 2 * created);
    assert_eq!(
        engine.dispose_resource(ResourceHandle::Geometry(geometry)),
        Err(SceneError::AlreadyDisposed)
    );
}

#[test]
fn test_context_loss_through_the_facade() {
    let mut engine = engine();
    let geometry = engine.add_geometry(shapes::plane(2.0));
    let material = engine.add_material(Material::lambert(LinearRgba::WHITE));
    let node = engine.create_node();
    engine.attach_drawable(node, geometry, material).unwrap();
    place(&mut engine, node, Vec3::new(0.0, 0.0, -5.0));
    engine.render(&camera()).unwrap();

    engine.device_mut().simulate_context_loss();
    assert!(matches!(engine.render(&camera()), Err(RenderError::ContextLost)));
    engine.device_mut().restore_context();
    let stats = engine.render(&camera()).unwrap();

    assert!(stats.context_restored);
    assert_eq!(stats.draw_calls, 1);
}

#[test]
fn test_config_file_drives_the_renderer() {
    let path = std::env::temp_dir().join(format!("lumen-sdk-config-{}.ron", std::process::id()));
    std::fs::write(
        &path,
        "(log_level: Warn, renderer: (tone_mapping: AcesFilmic, shadows_enabled: false))",
    )
    .unwrap();

    let config = EngineConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    let mut engine = Engine::headless(config);

    assert_eq!(engine.config().log_level, LogLevel::Warn);
    assert_eq!(engine.renderer().config().tone_mapping, ToneMapping::AcesFilmic);
    assert!(!engine.renderer().config().shadows_enabled);

    let mut renderer = engine.config().renderer.clone();
    renderer.shadows_enabled = true;
    engine.set_renderer_config(renderer);
    assert!(engine.renderer().config().shadows_enabled);
    assert!(engine.config().renderer.shadows_enabled);
}
