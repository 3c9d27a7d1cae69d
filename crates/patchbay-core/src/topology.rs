//! Channel lists, the routing matrix and the per-block mixing loop.
//!
//! The routing matrix is stored row-wise: each [`InputChannel`] owns one send
//! level per [`OutputChannel`]. Adding or removing an output resizes every row
//! in the same call, so `output_levels().len() == outputs().len()` holds for
//! every input between any two calls.
//!
//! # Block processing
//!
//! ```text
//! zero hardware output, clear output accumulators
//! for each frame:
//!     for each input:  generate(frame); skip if idle
//!                      for each output with level != 0: receive(values, level)
//!     for each output: generate(frame)
//!     clamp frame to [-1, 1]
//! ```

use crate::channel::{Channel, InputChannel, OutputChannel};
use crate::error::{ChannelKind, Error, Result};
use crate::taper::FaderTaper;

/// Peak magnitudes per channel and endpoint, in topology order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterSnapshot {
    /// One entry per input channel, one peak per endpoint.
    pub inputs: Vec<Vec<f32>>,
    /// One entry per output channel, one peak per endpoint.
    pub outputs: Vec<Vec<f32>>,
}

impl MeterSnapshot {
    /// Loudest peak across every channel.
    pub fn max_peak(&self) -> f32 {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .flatten()
            .fold(0.0, |acc: f32, &p| acc.max(p))
    }
}

/// Input and output channels plus the send levels between them.
#[derive(Debug, Clone)]
pub struct Topology {
    inputs: Vec<InputChannel>,
    outputs: Vec<OutputChannel>,
    sample_rate: f32,
    taper: FaderTaper,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(crate::dynamics::DEFAULT_SAMPLE_RATE, FaderTaper::default())
    }
}

impl Topology {
    /// Empty topology.
    pub fn new(sample_rate: f32, taper: FaderTaper) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            sample_rate,
            taper,
        }
    }

    /// Input channels in index order.
    pub fn inputs(&self) -> &[InputChannel] {
        &self.inputs
    }

    /// Output channels in index order.
    pub fn outputs(&self) -> &[OutputChannel] {
        &self.outputs
    }

    /// Input channel `index`.
    pub fn input(&self, index: usize) -> Result<&InputChannel> {
        let len = self.inputs.len();
        self.inputs.get(index).ok_or(Error::ChannelIndex {
            kind: ChannelKind::Input,
            index,
            len,
        })
    }

    /// Mutable input channel `index`.
    pub fn input_mut(&mut self, index: usize) -> Result<&mut InputChannel> {
        let len = self.inputs.len();
        self.inputs.get_mut(index).ok_or(Error::ChannelIndex {
            kind: ChannelKind::Input,
            index,
            len,
        })
    }

    /// Output channel `index`.
    pub fn output(&self, index: usize) -> Result<&OutputChannel> {
        let len = self.outputs.len();
        self.outputs.get(index).ok_or(Error::ChannelIndex {
            kind: ChannelKind::Output,
            index,
            len,
        })
    }

    /// Mutable output channel `index`.
    pub fn output_mut(&mut self, index: usize) -> Result<&mut OutputChannel> {
        let len = self.outputs.len();
        self.outputs.get_mut(index).ok_or(Error::ChannelIndex {
            kind: ChannelKind::Output,
            index,
            len,
        })
    }

    /// Append an input with every send level at zero. Returns its index.
    pub fn add_input(&mut self) -> usize {
        let index = self.inputs.len();
        self.inputs
            .push(InputChannel::new(self.sample_rate, self.outputs.len()));
        #[cfg(feature = "tracing")]
        tracing::debug!("topology: added input {index}");
        index
    }

    /// Append an output and grow every input's row by one zero level.
    /// Returns its index.
    pub fn add_output(&mut self) -> usize {
        let index = self.outputs.len();
        self.outputs.push(OutputChannel::new(self.sample_rate));
        for input in &mut self.inputs {
            input.resize_levels(index + 1);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("topology: added output {index}");
        index
    }

    /// Remove input `index`. Later inputs shift down by one.
    pub fn remove_input(&mut self, index: usize) -> Result<InputChannel> {
        self.input(index)?;
        #[cfg(feature = "tracing")]
        tracing::debug!("topology: removed input {index}");
        Ok(self.inputs.remove(index))
    }

    /// Remove output `index` and erase column `index` from every input's row.
    /// Later outputs and columns shift down by one.
    pub fn remove_output(&mut self, index: usize) -> Result<OutputChannel> {
        self.output(index)?;
        for input in &mut self.inputs {
            input.remove_level(index);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("topology: removed output {index}");
        Ok(self.outputs.remove(index))
    }

    /// Remove every channel.
    pub fn clear(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }

    /// Send level from `input` to `output`.
    pub fn level(&self, input: usize, output: usize) -> Result<f32> {
        self.output(output)?;
        Ok(self.input(input)?.output_levels()[output])
    }

    /// Set the send level from `input` to `output`.
    ///
    /// NaN and infinite levels are refused and leave the matrix unchanged.
    pub fn set_level(&mut self, input: usize, output: usize, level: f32) -> Result<()> {
        self.output(output)?;
        let channel = self.input_mut(input)?;
        if !level.is_finite() {
            return Err(Error::NonFiniteLevel { input, output });
        }
        channel.set_level(output, level);
        Ok(())
    }

    /// Zero the whole routing matrix.
    pub fn clear_levels(&mut self) {
        for input in &mut self.inputs {
            input.clear_levels();
        }
    }

    /// Sample rate the limiters are tuned for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Retune every channel's limiter.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for input in &mut self.inputs {
            input.strip_mut().set_sample_rate(sample_rate);
        }
        for output in &mut self.outputs {
            output.strip_mut().set_sample_rate(sample_rate);
        }
    }

    /// Fader curve used for MIDI gain bindings.
    pub fn taper(&self) -> &FaderTaper {
        &self.taper
    }

    /// Replace the fader curve.
    pub fn set_taper(&mut self, taper: FaderTaper) {
        self.taper = taper;
    }

    /// Dispatch a control change to every input, then every output.
    /// Returns how many channels had the controller bound.
    pub fn handle_midi(&mut self, cc: u8, value: u8) -> usize {
        let taper = self.taper;
        let mut bound = 0;
        for input in &mut self.inputs {
            bound += usize::from(input.handle_midi(cc, value, &taper));
        }
        for output in &mut self.outputs {
            bound += usize::from(output.handle_midi(cc, value, &taper));
        }
        bound
    }

    /// Current peaks without resetting them.
    pub fn meter_snapshot(&self) -> MeterSnapshot {
        MeterSnapshot {
            inputs: self.inputs.iter().map(|c| c.peaks().to_vec()).collect(),
            outputs: self.outputs.iter().map(|c| c.peaks().to_vec()).collect(),
        }
    }

    /// Current peaks, then reset every accumulator.
    pub fn drain_peaks(&mut self) -> MeterSnapshot {
        let snapshot = self.meter_snapshot();
        self.reset_peaks();
        snapshot
    }

    /// Reset every peak accumulator.
    pub fn reset_peaks(&mut self) {
        for input in &mut self.inputs {
            input.reset_peaks();
        }
        for output in &mut self.outputs {
            output.reset_peaks();
        }
    }

    /// Mix one block of interleaved audio.
    ///
    /// `input` holds frames of `in_channels` samples and `output` frames of
    /// `out_channels` samples. The frame count is taken from `output`; input
    /// frames that are missing read as silence. Every output sample is
    /// written and ends up in `[-1, 1]`.
    pub fn process_block(
        &mut self,
        input: &[f32],
        in_channels: usize,
        output: &mut [f32],
        out_channels: usize,
    ) {
        output.fill(0.0);
        if out_channels == 0 {
            return;
        }
        for out in &mut self.outputs {
            out.clear();
        }

        for (frame, out_frame) in output.chunks_exact_mut(out_channels).enumerate() {
            let in_frame = if in_channels == 0 {
                &[][..]
            } else {
                let start = frame * in_channels;
                input.get(start..start + in_channels).unwrap_or(&[])
            };

            for channel in &mut self.inputs {
                channel.generate(in_frame);
                if channel.is_idle() {
                    continue;
                }
                for (out, &level) in self.outputs.iter_mut().zip(channel.output_levels()) {
                    if level != 0.0 {
                        out.receive(channel.strip().values(), level);
                    }
                }
            }

            for out in &mut self.outputs {
                out.generate(out_frame);
            }

            for sample in out_frame.iter_mut() {
                *sample = sample.clamp(-1.0, 1.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels_match(t: &Topology) -> bool {
        t.inputs()
            .iter()
            .all(|i| i.output_levels().len() == t.outputs().len())
    }

    #[test]
    fn test_add_output_grows_rows() {
        let mut t = Topology::default();
        t.add_input();
        t.add_input();
        assert!(levels_match(&t));
        t.add_output();
        t.add_output();
        assert!(levels_match(&t));
        let late = t.add_input();
        assert_eq!(t.input(late).unwrap().output_levels(), &[0.0, 0.0]);
    }

    #[test]
    fn test_remove_output_erases_column() {
        let mut t = Topology::default();
        t.add_input();
        t.add_input();
        for _ in 0..3 {
            t.add_output();
        }
        for (o, level) in [0.2, 0.5, 0.8].into_iter().enumerate() {
            t.set_level(0, o, level).unwrap();
        }
        t.remove_output(1).unwrap();
        assert_eq!(t.input(0).unwrap().output_levels(), &[0.2, 0.8]);
        assert_eq!(t.input(1).unwrap().output_levels(), &[0.0, 0.0]);
        assert!(levels_match(&t));
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut t = Topology::default();
        t.add_output();
        let err = t.remove_output(3).unwrap_err();
        assert_eq!(
            err,
            Error::ChannelIndex {
                kind: ChannelKind::Output,
                index: 3,
                len: 1
            }
        );
        assert!(t.remove_input(0).is_err());
        assert_eq!(t.outputs().len(), 1);
    }

    #[test]
    fn test_set_level_bounds() {
        let mut t = Topology::default();
        t.add_input();
        t.add_output();
        assert!(t.set_level(0, 0, 0.5).is_ok());
        assert_eq!(t.level(0, 0).unwrap(), 0.5);
        assert!(t.set_level(0, 1, 0.5).is_err());
        assert!(t.set_level(1, 0, 0.5).is_err());
    }

    #[test]
    fn test_non_finite_level_refused() {
        let mut t = Topology::default();
        let i = t.add_input();
        let o = t.add_output();
        t.input_mut(i).unwrap().add(0);
        t.output_mut(o).unwrap().add(0);
        t.set_level(i, o, 1.0).unwrap();

        assert_eq!(
            t.set_level(i, o, f32::NAN),
            Err(Error::NonFiniteLevel { input: i, output: o })
        );
        assert!(t.set_level(i, o, f32::INFINITY).is_err());
        assert_eq!(t.level(i, o).unwrap(), 1.0);

        let input = [0.5; 4];
        let mut output = [0.0; 4];
        t.process_block(&input, 1, &mut output, 1);
        assert_eq!(output, [0.5; 4]);
    }

    #[test]
    fn test_limiter_tail_reaches_output() {
        let mut t = Topology::default();
        let i = t.add_input();
        let o = t.add_output();
        t.input_mut(i).unwrap().add(0);
        t.input_mut(i).unwrap().set_setting("limiter", 1.0);
        t.output_mut(o).unwrap().add(0);
        t.set_level(i, o, 1.0).unwrap();
        let latency = t.input(i).unwrap().strip().limiter().latency_samples();

        // One frame per block so idle can be observed after every frame
        let signal = latency + 100;
        let mut out = [0.0];
        for _ in 0..signal {
            t.process_block(&[0.25], 1, &mut out, 1);
        }
        assert!(out[0] > 0.2, "signal should be through the delay: {}", out[0]);

        for n in 0..latency {
            t.process_block(&[0.0], 1, &mut out, 1);
            assert!(!t.input(i).unwrap().is_idle(), "idle too early at tail frame {n}");
            assert!(out[0] > 0.2 && out[0] <= 0.25, "tail frame {n}: {}", out[0]);
        }

        for _ in 0..10 {
            t.process_block(&[0.0], 1, &mut out, 1);
            assert!(t.input(i).unwrap().is_idle());
            assert_eq!(out[0], 0.0);
        }
    }

    #[test]
    fn test_end_to_end_unity() {
        let mut t = Topology::default();
        let i = t.add_input();
        let o = t.add_output();
        t.input_mut(i).unwrap().add(0);
        t.output_mut(o).unwrap().add(0);
        t.set_level(i, o, 1.0).unwrap();

        let input = [0.5; 64];
        let mut output = [0.0; 64];
        t.process_block(&input, 1, &mut output, 1);
        assert!(output.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_stereo_pass_through() {
        let mut t = Topology::default();
        let i = t.add_input();
        let o = t.add_output();
        t.input_mut(i).unwrap().add(0);
        t.input_mut(i).unwrap().add(1);
        t.output_mut(o).unwrap().add(1);
        t.output_mut(o).unwrap().add(0);
        t.set_level(i, o, 1.0).unwrap();

        let input = [0.1, 0.2, 0.3, 0.4];
        let mut output = [0.0; 4];
        t.process_block(&input, 2, &mut output, 2);
        // Output endpoints are swapped
        assert_eq!(output, [0.2, 0.1, 0.4, 0.3]);
    }

    #[test]
    fn test_silence_leaves_outputs_untouched() {
        let mut t = Topology::default();
        let i = t.add_input();
        let o = t.add_output();
        t.input_mut(i).unwrap().add(0);
        t.output_mut(o).unwrap().add(0);
        t.set_level(i, o, 1.0).unwrap();

        let input = [0.0; 32];
        let mut output = [1.0; 32];
        t.process_block(&input, 1, &mut output, 1);
        assert!(t.input(i).unwrap().is_idle());
        assert!(output.iter().all(|&s| s == 0.0));
        assert_eq!(t.output(o).unwrap().strip().values(), &[0.0]);
        assert_eq!(t.output(o).unwrap().peaks(), &[0.0]);
    }

    #[test]
    fn test_output_clamped() {
        let mut t = Topology::default();
        let a = t.add_input();
        let b = t.add_input();
        let o = t.add_output();
        t.input_mut(a).unwrap().add(0);
        t.input_mut(b).unwrap().add(1);
        t.output_mut(o).unwrap().add(0);
        t.set_level(a, o, 1.0).unwrap();
        t.set_level(b, o, 1.0).unwrap();

        let input = [0.8, 0.8, -0.9, -0.9];
        let mut output = [0.0; 2];
        t.process_block(&input, 2, &mut output, 1);
        assert_eq!(output, [1.0, -1.0]);
        // Meters see the pre-clamp sum
        assert!(t.output(o).unwrap().peaks()[0] > 1.7);
    }

    #[test]
    fn test_frames_do_not_leak() {
        let mut t = Topology::default();
        let i = t.add_input();
        let o = t.add_output();
        t.input_mut(i).unwrap().add(0);
        t.output_mut(o).unwrap().add(0);
        t.set_level(i, o, 0.5).unwrap();

        let input = [0.4, 0.0, 0.2];
        let mut output = [0.0; 3];
        t.process_block(&input, 1, &mut output, 1);
        assert_eq!(output, [0.2, 0.0, 0.1]);
    }

    #[test]
    fn test_short_input_reads_silence() {
        let mut t = Topology::default();
        let i = t.add_input();
        let o = t.add_output();
        t.input_mut(i).unwrap().add(0);
        t.output_mut(o).unwrap().add(0);
        t.set_level(i, o, 1.0).unwrap();

        let input = [0.5];
        let mut output = [0.0; 3];
        t.process_block(&input, 1, &mut output, 1);
        assert_eq!(output, [0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_handle_midi_dispatch() {
        let mut t = Topology::default();
        let i = t.add_input();
        let o = t.add_output();
        t.input_mut(i).unwrap().add_midi_link("gain", 1);
        t.output_mut(o).unwrap().add_midi_link("gain", 1);
        t.output_mut(o).unwrap().add_midi_link("gain", 2);

        assert_eq!(t.handle_midi(1, 0), 2);
        assert_eq!(t.input(i).unwrap().strip().gain(), 0.0);
        assert_eq!(t.output(o).unwrap().strip().gain(), 0.0);

        assert_eq!(t.handle_midi(2, 127), 1);
        assert_eq!(t.handle_midi(3, 127), 0);
    }

    #[test]
    fn test_drain_peaks() {
        let mut t = Topology::default();
        let i = t.add_input();
        t.input_mut(i).unwrap().add(0);
        let mut output = [0.0; 2];
        t.process_block(&[0.3, -0.6], 1, &mut output, 1);

        let snapshot = t.drain_peaks();
        assert_eq!(snapshot.inputs, vec![vec![0.6]]);
        assert_eq!(snapshot.max_peak(), 0.6);
        assert_eq!(t.meter_snapshot().inputs, vec![vec![0.0]]);
    }

    #[test]
    fn test_no_output_channels() {
        let mut t = Topology::default();
        t.add_input();
        let mut output = [0.5; 4];
        t.process_block(&[0.1; 4], 1, &mut output, 0);
        assert_eq!(output, [0.0; 4]);
    }
}
