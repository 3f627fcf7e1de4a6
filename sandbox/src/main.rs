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

use anyhow::{Context, Result};
use lumen_core::math::{FRAC_PI_2, TAU};
use lumen_sdk::prelude::*;

const FRAMES: u32 = 8;
const LOSE_CONTEXT_AT: u32 = 3;
const RESTORE_CONTEXT_AT: u32 = 5;

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => EngineConfig::default(),
    };
    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    let mut engine = Engine::headless(config);
    let pivot = build_scene(&mut engine)?;
    let mut camera = Camera::perspective(1.0, 16.0 / 9.0, 0.1, 100.0);
    camera.look_at(Vec3::new(0.0, 4.0, 10.0), Vec3::ZERO, Vec3::Y);

    for frame in 0..FRAMES {
        if frame == LOSE_CONTEXT_AT {
            log::info!("Simulating a context loss.");
            engine.device_mut().simulate_context_loss();
        }
        if frame == RESTORE_CONTEXT_AT {
            engine.device_mut().restore_context();
        }

        let angle = frame as f32 * 0.25;
        engine.set_local_transform(
            pivot,
            Vec3::ZERO,
            Quaternion::from_axis_angle(Vec3::Y, angle),
            Vec3::ONE,
        )?;

        match engine.render(&camera) {
            Ok(stats) if stats.skipped_frame => log::info!("Frame {frame}: skipped, context still lost."),
            Ok(stats) => log::info!(
                "Frame {frame}: {} draws ({} opaque, {} transmissive, {} transparent), {} culled, \
                 {} shadow passes, {} state changes, {} uniform uploads{}",
                stats.draw_calls,
                stats.opaque,
                stats.transmissive,
                stats.transparent,
                stats.culled,
                stats.shadow_passes,
                stats.state_changes,
                stats.uniform_uploads,
                if stats.context_restored { ", context restored" } else { "" }
            ),
            Err(RenderError::ContextLost) => log::warn!("Frame {frame}: context lost."),
            Err(err) => return Err(err).context("rendering the sandbox scene"),
        }
    }

    // One offscreen frame, as a render-to-texture consumer would.
    let target = RenderTarget::new(256, 256);
    let root = engine.root();
    let stats = engine.render_frame(root, &camera, Some(&target))?;
    log::info!(
        "Offscreen frame: {} draws into texture {:?}.",
        stats.draw_calls,
        engine.renderer().target_texture(target.id())
    );

    let context = engine.renderer().context();
    log::info!(
        "Caches: {} programs, {} buffers, {} textures, {} targets; {} bytes on the device.",
        context.programs.len(),
        context.buffers.len(),
        context.textures.len(),
        context.targets.len(),
        engine.device().allocated_bytes()
    );
    Ok(())
}

/// Builds a floor, a ring of cubes with one material per kind, and lights.
/// Returns the pivot the cubes spin around.
fn build_scene(engine: &mut Engine) -> Result<NodeId> {
    let floor = engine.create_named_node("floor");
    let floor_geometry = engine.add_geometry(shapes::plane(20.0));
    let floor_material = engine.add_material(Material::lambert(LinearRgba::rgb(0.6, 0.6, 0.6)));
    engine.attach_drawable(floor, floor_geometry, floor_material)?;
    engine.set_local_transform(
        floor,
        Vec3::new(0.0, -1.0, 0.0),
        Quaternion::from_axis_angle(Vec3::X, -FRAC_PI_2),
        Vec3::ONE,
    )?;
    if let Some(node) = engine.scene_mut().node_mut(floor) {
        node.set_receive_shadow(true);
    }

    let checker = Image::new(
        2,
        2,
        TextureFormat::Rgba8,
        vec![255, 255, 255, 255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255, 255],
    )
    .context("checker image")?;
    let checker = engine.add_image(checker);

    let mut textured = Material::basic(LinearRgba::WHITE);
    textured.map = Some(checker);
    let mut glass = Material::standard(LinearRgba::rgb(0.9, 0.95, 1.0), 0.0, 0.05);
    if let MaterialKind::Standard { transmission, .. } = &mut glass.kind {
        *transmission = 0.9;
    }
    let mut tinted = Material::phong(LinearRgba::rgb(0.2, 0.4, 1.0), 60.0);
    tinted.transparent = true;
    tinted.opacity = 0.5;

    let materials = [
        textured,
        Material::lambert(LinearRgba::rgb(1.0, 0.3, 0.2)),
        Material::phong(LinearRgba::rgb(0.2, 1.0, 0.3), 30.0),
        Material::standard(LinearRgba::rgb(0.9, 0.8, 0.3), 1.0, 0.3),
        glass,
        tinted,
    ];

    let pivot = engine.create_named_node("pivot");
    let cube = engine.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
    let count = materials.len() as f32;
    for (i, material) in materials.into_iter().enumerate() {
        let material = engine.add_material(material);
        let node = engine.create_node();
        engine.set_parent(node, Some(pivot))?;
        engine.attach_drawable(node, cube, material)?;
        let angle = i as f32 / count * TAU;
        engine.set_local_transform(
            node,
            Vec3::new(angle.cos() * 3.0, 0.0, angle.sin() * 3.0),
            Quaternion::IDENTITY,
            Vec3::ONE,
        )?;
        if let Some(node) = engine.scene_mut().node_mut(node) {
            node.set_cast_shadow(true);
            node.set_receive_shadow(true);
        }
    }

    let ambient = engine.create_named_node("ambient");
    engine.attach_light(ambient, Light::ambient(LinearRgba::WHITE, 0.2))?;

    let sun = engine.create_named_node("sun");
    engine.attach_light(
        sun,
        Light::directional(LinearRgba::rgb(1.0, 0.95, 0.85), 1.2).with_shadow(ShadowSettings {
            map_size: 512,
            ..Default::default()
        }),
    )?;
    engine.set_local_transform(
        sun,
        Vec3::new(0.0, 8.0, 0.0),
        Quaternion::from_axis_angle(Vec3::X, -FRAC_PI_2),
        Vec3::ONE,
    )?;

    let lamp = engine.create_named_node("lamp");
    engine.attach_light(lamp, Light::point(LinearRgba::rgb(1.0, 0.6, 0.3), 2.0, 12.0))?;
    engine.set_local_transform(lamp, Vec3::new(0.0, 2.0, 0.0), Quaternion::IDENTITY, Vec3::ONE)?;

    Ok(pivot)
}
