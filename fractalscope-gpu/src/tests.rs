//! Device-level tests: program building, packed doubles in WGSL, presentation.

use crate::buffers::{storage_buffer, storage_entry};
use crate::readback::read_buffer;
use crate::shaders::mandelbrot::packed_f64_helpers;
use crate::{GpuAvailability, GpuContext, GpuError, ProgramBuilder};

const VALID_PROGRAM: &str = r#"
@group(0) @binding(0) var<storage, read_write> data: array<u32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    if id.x < arrayLength(&data) {
        data[id.x] = data[id.x] * 2u;
    }
}
"#;

fn round_trip_program() -> String {
    format!(
        r#"@group(0) @binding(0) var<storage, read_write> words: array<vec2<u32>>;
@group(0) @binding(1) var<storage, read_write> repacked: array<vec2<u32>>;

{}
@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {{
    if id.x < arrayLength(&words) {{
        repacked[id.x] = pack_f64(unpack_f64(words[id.x]));
    }}
}}
"#,
        packed_f64_helpers()
    )
}

fn two_buffer_layout(context: &GpuContext) -> wgpu::BindGroupLayout {
    context
        .device
        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("test_layout"),
            entries: &[storage_entry(0, false), storage_entry(1, false)],
        })
}

/// Test that GPU initialization doesn't panic.
#[test]
fn gpu_init_does_not_panic() {
    pollster::block_on(async {
        let result = GpuContext::try_init().await;
        match result {
            GpuAvailability::Available(ctx) => {
                println!("GPU available, f64: {}", ctx.supports_f64());
            }
            GpuAvailability::Unavailable(reason) => {
                println!("GPU unavailable: {reason}");
            }
        }
    });
}

#[test]
fn broken_wgsl_reports_compiler_log() {
    pollster::block_on(async {
        let GpuAvailability::Available(ctx) = GpuContext::try_init().await else {
            println!("Skipping test: no GPU available");
            return;
        };

        let result = ProgramBuilder::new(&ctx.device).compute("broken", "fn main( {", &[]);
        match result {
            Err(GpuError::ShaderCompilation { label, log }) => {
                assert_eq!(label, "broken");
                assert!(!log.is_empty());
            }
            Err(other) => panic!("Unexpected error: {other}"),
            Ok(_) => panic!("Broken WGSL compiled"),
        }
    });
}

#[test]
fn valid_program_runs() {
    pollster::block_on(async {
        let GpuAvailability::Available(ctx) = GpuContext::try_init().await else {
            println!("Skipping test: no GPU available");
            return;
        };

        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("double_layout"),
                entries: &[storage_entry(0, false)],
            });
        let pipeline = ProgramBuilder::new(&ctx.device)
            .compute("double", VALID_PROGRAM, &[&layout])
            .expect("valid program should compile");

        let input: Vec<u32> = (0..100).collect();
        let buffer = storage_buffer(&ctx, "double_data", 400).unwrap();
        ctx.queue
            .write_buffer(&buffer, 0, bytemuck::cast_slice(&input));
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(2, 1, 1);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let output: Vec<u32> = read_buffer(&ctx, &buffer).await.unwrap();
        let expected: Vec<u32> = input.iter().map(|v| v * 2).collect();
        assert_eq!(output, expected);
    });
}

/// The WGSL pack/unpack pair must reproduce IEEE-754 bit patterns exactly.
#[test]
fn wgsl_packing_round_trips_bits() {
    pollster::block_on(async {
        let GpuAvailability::Available(ctx) = GpuContext::try_init().await else {
            println!("Skipping test: no GPU available");
            return;
        };
        if !ctx.supports_f64() {
            println!("Skipping test: SHADER_F64 not supported");
            return;
        }

        let values = [
            0.0,
            -1.5,
            1e308,
            0.1,
            std::f64::consts::PI,
            -7.0,
            1.9999999999999998,
            2.5e-300,
            -3.0e-17,
        ];
        let words: Vec<[u32; 2]> = values
            .iter()
            .map(|v| fractalscope_core::packed::pack_f64(*v))
            .collect();
        let bytes = (words.len() * 8) as u64;

        let layout = two_buffer_layout(&ctx);
        let pipeline = ProgramBuilder::new(&ctx.device)
            .compute("packing_round_trip", &round_trip_program(), &[&layout])
            .expect("packing helpers should compile");

        let input = storage_buffer(&ctx, "packing_input", bytes).unwrap();
        let output = storage_buffer(&ctx, "packing_output", bytes).unwrap();
        ctx.queue
            .write_buffer(&input, 0, bytemuck::cast_slice(&words));
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output.as_entire_binding(),
                },
            ],
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let repacked: Vec<[u32; 2]> = read_buffer(&ctx, &output).await.unwrap();
        for ((value, sent), got) in values.iter().zip(&words).zip(&repacked) {
            assert_eq!(sent, got, "{value} changed bits on the GPU");
        }
    });
}
