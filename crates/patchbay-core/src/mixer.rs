//! Lock-guarded topology shared by the audio callback and the control plane.
//!
//! [`Mixer`] wraps a [`Topology`] in a single `parking_lot::Mutex`. The audio
//! callback, the MIDI callback and every control-plane edit take the same
//! lock, so an edit that returns before a block starts is fully visible to
//! that block and no block ever sees a half-applied edit.
//!
//! The lock is blocking. Control-plane closures passed to [`Mixer::access`]
//! should be short; long work (file parsing, device queries) belongs outside.

use parking_lot::Mutex;

use crate::taper::{DEFAULT_MAX_DB, FaderTaper};
use crate::topology::{MeterSnapshot, Topology};

/// Settings the mixer needs from the control plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerConfig {
    /// Device sample rate in Hz.
    pub sample_rate: f32,
    /// Fader headroom at full MIDI travel, in dB.
    pub max_db: f32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::dynamics::DEFAULT_SAMPLE_RATE,
            max_db: DEFAULT_MAX_DB,
        }
    }
}

/// Thread-safe handle to the routing topology.
///
/// # Example
///
/// ```rust
/// use patchbay_core::{Channel, Mixer, MixerConfig};
///
/// let mixer = Mixer::new(MixerConfig::default());
/// mixer.access(|t| {
///     let i = t.add_input();
///     let o = t.add_output();
///     t.input_mut(i)?.add(0);
///     t.output_mut(o)?.add(0);
///     t.set_level(i, o, 1.0)
/// })?;
///
/// let mut out = [0.0; 4];
/// mixer.process_interleaved(&[0.5; 4], 1, &mut out, 1);
/// assert_eq!(out, [0.5; 4]);
/// # Ok::<(), patchbay_core::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Mixer {
    topology: Mutex<Topology>,
}

impl Mixer {
    /// Empty mixer.
    pub fn new(config: MixerConfig) -> Self {
        Self {
            topology: Mutex::new(Topology::new(
                config.sample_rate,
                FaderTaper::new(config.max_db),
            )),
        }
    }

    /// Run `f` with exclusive access to the topology.
    pub fn access<R>(&self, f: impl FnOnce(&mut Topology) -> R) -> R {
        let mut topology = self.topology.lock();
        f(&mut topology)
    }

    /// Mix one interleaved block. Called from the audio callback.
    #[inline]
    pub fn process_interleaved(
        &self,
        input: &[f32],
        in_channels: usize,
        output: &mut [f32],
        out_channels: usize,
    ) {
        self.topology
            .lock()
            .process_block(input, in_channels, output, out_channels);
    }

    /// Dispatch a control change. Returns how many channels had it bound.
    pub fn handle_midi(&self, cc: u8, value: u8) -> usize {
        self.topology.lock().handle_midi(cc, value)
    }

    /// Collect and reset every peak meter.
    pub fn drain_peaks(&self) -> MeterSnapshot {
        self.topology.lock().drain_peaks()
    }

    /// Apply a new sample rate and fader headroom.
    pub fn configure(&self, config: MixerConfig) {
        let mut topology = self.topology.lock();
        topology.set_sample_rate(config.sample_rate);
        topology.set_taper(FaderTaper::new(config.max_db));
    }
}
