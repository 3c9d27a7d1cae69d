//! Lock-free hand-off from the input stream to the output stream.
//!
//! cpal delivers capture and playback on separate streams. The input callback
//! pushes whole interleaved frames into an `rtrb` ring; the output callback
//! pops one block's worth and runs the mixer. Missing input reads as silence
//! and input that does not fit is dropped, always in whole frames so the
//! channel interleave never shifts.

use std::sync::Arc;

use patchbay_core::Mixer;
use rtrb::{Consumer, Producer, RingBuffer};

/// Input-stream side of the bridge.
pub struct InputBridge {
    producer: Producer<f32>,
    channels: usize,
}

impl InputBridge {
    /// Push captured samples. Returns how many were queued.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        if self.channels == 0 {
            return 0;
        }
        let room = self.producer.slots() / self.channels * self.channels;
        let whole = samples.len() / self.channels * self.channels;
        let n = room.min(whole);
        for &sample in &samples[..n] {
            if self.producer.push(sample).is_err() {
                break;
            }
        }
        n
    }
}

/// Output-stream side of the bridge: pops input and renders mixer blocks.
pub struct BlockRenderer {
    consumer: Option<Consumer<f32>>,
    mixer: Arc<Mixer>,
    in_channels: usize,
    out_channels: usize,
    scratch: Vec<f32>,
}

impl BlockRenderer {
    /// Renderer with no input stream; every input frame is silent.
    pub fn output_only(mixer: Arc<Mixer>, out_channels: usize) -> Self {
        Self {
            consumer: None,
            mixer,
            in_channels: 0,
            out_channels,
            scratch: Vec::new(),
        }
    }

    /// Fill `output` with one mixed block.
    ///
    /// The scratch buffer only grows, so after the first block of the
    /// largest size this does not allocate.
    pub fn render(&mut self, output: &mut [f32]) {
        if self.out_channels == 0 {
            output.fill(0.0);
            return;
        }
        let frames = output.len() / self.out_channels;
        let needed = frames * self.in_channels;
        if self.scratch.len() < needed {
            self.scratch.resize(needed, 0.0);
        }
        let input = &mut self.scratch[..needed];

        let mut filled = 0;
        if self.in_channels > 0
            && let Some(consumer) = self.consumer.as_mut()
        {
            let available = consumer.slots() / self.in_channels * self.in_channels;
            for slot in input.iter_mut().take(available.min(needed)) {
                match consumer.pop() {
                    Ok(sample) => *slot = sample,
                    Err(_) => break,
                }
                filled += 1;
            }
        }
        input[filled..].fill(0.0);

        self.mixer
            .process_interleaved(input, self.in_channels, output, self.out_channels);
    }
}

/// Build a connected input/renderer pair.
///
/// `capacity_frames` bounds how far capture may run ahead of playback.
pub fn bridge(
    mixer: Arc<Mixer>,
    in_channels: usize,
    out_channels: usize,
    capacity_frames: usize,
) -> (InputBridge, BlockRenderer) {
    let (producer, consumer) = RingBuffer::new((capacity_frames * in_channels).max(1));
    (
        InputBridge {
            producer,
            channels: in_channels,
        },
        BlockRenderer {
            consumer: Some(consumer),
            mixer,
            in_channels,
            out_channels,
            scratch: Vec::new(),
        },
    )
}
