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

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use lumen_core::material::Material;
use lumen_core::math::{LinearRgba, Vec3};
use lumen_core::renderer::Environment;
use lumen_data::geometry::shapes;
use lumen_data::{Camera, SceneGraph};
use lumen_lanes::render_lane::{RenderListBuilder, RenderView};
use lumen_lanes::scene_lane::update_world_matrices;

fn bench_render_lists(c: &mut Criterion) {
    let mut scene = SceneGraph::new();
    let root = scene.create_node();
    let geometry = scene.add_geometry(shapes::cuboid(1.0, 1.0, 1.0));
    let materials: Vec<_> = (0..8)
        .map(|i| {
            let mut material = Material::basic(LinearRgba::rgb(i as f32 / 8.0, 0.5, 0.5));
            material.transparent = i % 4 == 0;
            scene.add_material(material)
        })
        .collect();

    // Setup 10,000 drawables on a grid, half of them behind the camera.
    for i in 0..10_000 {
        let node = scene.create_node();
        let x = (i % 100) as f32 - 50.0;
        let z = (i / 100) as f32 - 50.0;
        scene.set_position(node, Vec3::new(x, 0.0, z)).unwrap();
        scene.add_child(root, node).unwrap();
        scene
            .attach_drawable(node, geometry, materials[i % materials.len()])
            .unwrap();
    }
    update_world_matrices(&mut scene, false);

    let camera = Camera::perspective(1.0, 16.0 / 9.0, 0.1, 200.0);
    let view = RenderView::from_camera(&camera, Environment::default().signature());
    let mut builder = RenderListBuilder::new();

    let mut group = c.benchmark_group("Render Lists");

    group.bench_function("Build (10k drawables)", |b| {
        b.iter(|| {
            let lists = builder.build(&scene, root, &view);
            black_box(lists.len());
        });
    });

    group.bench_function("Transform propagation (forced)", |b| {
        b.iter(|| black_box(update_world_matrices(&mut scene, true)));
    });

    group.finish();
}

criterion_group!(benches, bench_render_lists);
criterion_main!(benches);
