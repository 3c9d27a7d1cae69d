//! Patchbay Core - realtime routing matrix and channel DSP
//!
//! This crate holds everything that runs inside the audio callback: channel
//! strips, the dynamics stage, the routing matrix and the block mixing loop.
//! It performs no I/O; device and configuration handling live in
//! `patchbay-io` and `patchbay-config`.
//!
//! # Core Abstractions
//!
//! ## Channels
//!
//! - [`ChannelStrip`] - endpoints, working samples, peaks, gain, limiter, MIDI links
//! - [`Channel`] - shared operations over both channel kinds
//! - [`InputChannel`] - reads the hardware input frame, owns a routing row
//! - [`OutputChannel`] - sums sends and writes the hardware output frame
//!
//! ## Routing
//!
//! - [`Topology`] - channel lists, send levels, block processing
//! - [`Mixer`] - the topology behind one lock, shared with the audio thread
//! - [`MeterSnapshot`] - peak meters collected by the control plane
//!
//! ## Dynamics
//!
//! - [`Compressor`] - linked envelope-follower gain reduction
//! - [`Limiter`] - lookahead brickwall built on the compressor
//!
//! ## Utilities
//!
//! - [`FaderTaper`] - fourth-power MIDI fader curve
//! - [`math`] - dB conversions and time constants
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{Channel, Topology};
//!
//! let mut topology = Topology::default();
//! let mic = topology.add_input();
//! let speakers = topology.add_output();
//! topology.input_mut(mic)?.add(0);
//! topology.output_mut(speakers)?.add(0);
//! topology.output_mut(speakers)?.add(1);
//! topology.set_level(mic, speakers, 0.5)?;
//!
//! // One mono input frame, one stereo output frame
//! let mut out = [0.0; 2];
//! topology.process_block(&[0.8], 1, &mut out, 2);
//! assert_eq!(out, [0.4, 0.4]);
//! # Ok::<(), patchbay_core::Error>(())
//! ```

pub mod channel;
pub mod dynamics;
pub mod error;
pub mod math;
pub mod mixer;
pub mod taper;
pub mod topology;

pub use channel::{Channel, ChannelStrip, InputChannel, MidiParam, OutputChannel};
pub use dynamics::{Compressor, DEFAULT_LOOKAHEAD, Limiter};
pub use error::{ChannelKind, Error, Result};
pub use mixer::{Mixer, MixerConfig};
pub use taper::{DEFAULT_MAX_DB, FaderTaper};
pub use topology::{MeterSnapshot, Topology};
