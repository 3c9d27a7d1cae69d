//! Criterion benchmarks for the routing matrix (`patchbay-core::topology`).
//!
//! Two axes:
//!
//! - **Matrix** - a fully connected N×M topology at a fixed block size
//! - **Block sweep** - an 8×8 stereo topology across standard block sizes
//!
//! Run with: `cargo bench -p patchbay-core -- mixer/`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use patchbay_core::{Channel, FaderTaper, Topology};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZE: usize = 256;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

// ---------------------------------------------------------------------------
// Topology builders
// ---------------------------------------------------------------------------

/// Stereo inputs and outputs, every input sent to every output at -6 dB.
fn make_matrix(inputs: usize, outputs: usize, limiter: bool) -> Topology {
    let mut topology = Topology::new(SAMPLE_RATE, FaderTaper::default());
    for i in 0..inputs {
        let index = topology.add_input();
        let channel = topology.input_mut(index).unwrap();
        channel.add(2 * i);
        channel.add(2 * i + 1);
        channel.set_setting("limiter", f32::from(u8::from(limiter)));
    }
    for o in 0..outputs {
        let index = topology.add_output();
        let channel = topology.output_mut(index).unwrap();
        channel.add(2 * o);
        channel.add(2 * o + 1);
    }
    for i in 0..inputs {
        for o in 0..outputs {
            topology.set_level(i, o, 0.5).unwrap();
        }
    }
    topology
}

fn noise(len: usize) -> Vec<f32> {
    // Cheap deterministic LCG, enough to keep channels non-idle
    let mut state = 0x1234_5678_u32;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Matrix size
// ---------------------------------------------------------------------------

fn bench_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer/matrix");

    for &(inputs, outputs, limiter) in &[
        (2, 2, false),
        (8, 8, false),
        (16, 8, false),
        (8, 8, true),
    ] {
        let mut topology = make_matrix(inputs, outputs, limiter);
        let in_channels = 2 * inputs;
        let out_channels = 2 * outputs;
        let input = noise(BLOCK_SIZE * in_channels);
        let mut output = vec![0.0f32; BLOCK_SIZE * out_channels];

        let name = if limiter {
            format!("{inputs}x{outputs}_limited")
        } else {
            format!("{inputs}x{outputs}")
        };
        group.bench_function(name, |b| {
            b.iter(|| {
                topology.process_block(
                    black_box(&input),
                    in_channels,
                    &mut output,
                    out_channels,
                );
                black_box(&output);
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Block size sweep
// ---------------------------------------------------------------------------

fn bench_block_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer/block_sweep");

    for &block_size in BLOCK_SIZES {
        let mut topology = make_matrix(8, 8, false);
        let input = noise(block_size * 16);
        let mut output = vec![0.0f32; block_size * 16];

        group.bench_with_input(
            BenchmarkId::new("8x8", block_size),
            &block_size,
            |b, _| {
                b.iter(|| {
                    topology.process_block(black_box(&input), 16, &mut output, 16);
                    black_box(&output);
                });
            },
        );
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_matrix, bench_block_sweep);
criterion_main!(benches);
