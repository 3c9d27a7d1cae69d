//! Device layer for the patchbay mixer.
//!
//! This crate connects a [`patchbay_core::Mixer`] to hardware:
//!
//! - **Audio**: the [`AudioBackend`] trait and its cpal implementation
//!   [`CpalBackend`]
//! - **MIDI**: the [`MidiBackend`] trait and its midir implementation
//!   [`MidirBackend`]
//! - **Discovery**: [`list_devices`], [`find_device`] and named [`Endpoint`]s
//! - **Lifecycle**: [`Processor`], which opens devices, installs the
//!   callbacks and moves between `Closed`, `Configuring` and `Streaming`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use patchbay_io::{CpalBackend, DeviceConfig, MidirBackend, Processor};
//!
//! let mut processor = Processor::new(
//!     Box::new(CpalBackend::new()),
//!     Box::new(MidirBackend::new("patchbay")),
//!     DeviceConfig::default(),
//! );
//! processor.init()?;
//!
//! let left = processor.find_endpoint("Input 1", true);
//! processor.mixer().access(|topology| {
//!     let mic = topology.add_input();
//!     // ...
//! });
//! ```

pub mod backend;
mod bridge;
pub mod cpal_backend;
mod devices;
pub mod midi;
mod processor;

pub use backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, InputCallback, MidiBackend, MidiCallback,
    MidiSink, OutputCallback, StreamHandle,
};
pub use bridge::{BlockRenderer, InputBridge, bridge};
pub use cpal_backend::CpalBackend;
pub use devices::{
    AudioDevice, Endpoint, default_device, endpoints_for, find_device, find_port, list_devices,
};
pub use midi::{ControlChange, MidirBackend};
pub use processor::{ControlHook, DeviceConfig, Processor, ProcessorState};

/// Error types for audio and MIDI device operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The selected device cannot play audio.
    #[error("Device has no output channels: {0}")]
    NoOutputChannels(String),

    /// MIDI subsystem or connection error.
    #[error("MIDI error: {0}")]
    Midi(String),

    /// The requested MIDI port was not found.
    #[error("MIDI port not found: {0}")]
    MidiPortNotFound(String),
}

/// Convenience result type for device operations.
pub type Result<T> = std::result::Result<T, Error>;
