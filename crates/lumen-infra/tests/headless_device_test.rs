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

use lumen_core::math::LinearRgba;
use lumen_core::renderer::{
    BlendMode, BufferDescriptor, BufferUsage, DrawCall, GraphicsDevice, IndexFormat,
    PrimitiveTopology, ProgramDescriptor,
};
use lumen_infra::graphics::headless::RecordedCall;
use lumen_infra::HeadlessDevice;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_records_a_full_indexed_draw() {
    // --- 1. ARRANGE ---
    init_logger();
    let mut device = HeadlessDevice::new();
    let program = device
        .create_program(&ProgramDescriptor {
            label: "triangle".into(),
            vertex_source: "in vec3 position; void main() { gl_Position = vec4(position, 1.0); }".into(),
            fragment_source: "uniform vec4 color; void main() {}".into(),
        })
        .expect("valid program");
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let vertices = device
        .create_buffer(
            &BufferDescriptor {
                label: Some("positions".into()),
                usage: BufferUsage::Vertex,
                size: 36,
            },
            bytemuck::cast_slice(&positions),
        )
        .unwrap();
    let indices = device
        .create_buffer(
            &BufferDescriptor {
                label: None,
                usage: BufferUsage::Index,
                size: 6,
            },
            &[0, 0, 1, 0, 2, 0],
        )
        .unwrap();
    device.take_calls();

    // --- 2. ACT ---
    device.use_program(program);
    device.set_blend_mode(BlendMode::None);
    device.bind_vertex_buffer(0, vertices, 3, false);
    device.bind_index_buffer(Some(indices), IndexFormat::Uint16);
    let call = DrawCall {
        topology: PrimitiveTopology::Triangles,
        first: 0,
        count: 3,
        instance_count: 1,
        index_format: Some(IndexFormat::Uint16),
    };
    device.clear(Some(LinearRgba::BLACK), Some(1.0), None);
    device.draw(&call);

    // --- 3. ASSERT ---
    assert_eq!(
        device.calls(),
        &[
            RecordedCall::UseProgram(program),
            RecordedCall::SetBlendMode(BlendMode::None),
            RecordedCall::BindVertexBuffer(0, vertices),
            RecordedCall::BindIndexBuffer(Some(indices)),
            RecordedCall::Clear(Some(LinearRgba::BLACK), Some(1.0), None),
            RecordedCall::Draw(call),
        ]
    );
    let counters = device.counters();
    assert_eq!(counters.state_changes, 4);
    assert_eq!(counters.draws, 1);
    assert_eq!(counters.invalid_calls, 0);
    assert_eq!(device.buffer_usage(indices), Some(BufferUsage::Index));
}

#[test]
fn test_handles_are_never_reused_across_context_loss() {
    init_logger();
    let mut device = HeadlessDevice::new();
    let descriptor = BufferDescriptor {
        label: None,
        usage: BufferUsage::Vertex,
        size: 4,
    };
    let before = device.create_buffer(&descriptor, &[0; 4]).unwrap();

    device.simulate_context_loss();
    device.restore_context();
    while device.poll_context_event().is_some() {}
    let after = device.create_buffer(&descriptor, &[0; 4]).unwrap();

    assert_ne!(before, after);
    assert_eq!(device.live_buffers(), 1);
    assert_eq!(device.peak_bytes(), 4);
}
