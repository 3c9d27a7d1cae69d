//! Pluggable audio and MIDI backend abstraction.
//!
//! [`AudioBackend`] and [`MidiBackend`] keep the [`Processor`](crate::Processor)
//! free of any platform API. The defaults wrap cpal and midir; tests drive the
//! processor through in-memory backends instead.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │            Processor             │
//! │   init / deinit / find_endpoint  │
//! └───────┬──────────────────┬───────┘
//!         │ AudioBackend     │ MidiBackend
//!         ▼                  ▼
//! ┌──────────────┐   ┌──────────────┐
//! │ CpalBackend  │   │ MidirBackend │
//! └──────────────┘   └──────────────┘
//! ```
//!
//! Both traits are object-safe: callbacks are boxed closures and every open
//! stream or connection comes back as a [`StreamHandle`] that closes it on drop.

use crate::{AudioDevice, Result};

/// Configuration for building an audio stream.
#[derive(Debug, Clone)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Device name (uses the system default if `None`).
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
            channels: 2,
            device_name: None,
        }
    }
}

/// Type-erased stream or connection handle.
///
/// The wrapped object stays open while this handle exists; dropping the
/// handle closes it.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wrap a backend-specific stream or connection.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Audio output callback.
///
/// Receives an interleaved buffer of `frames * channels` samples to fill.
/// Runs on the audio thread.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Audio input callback.
///
/// Receives captured interleaved samples. Runs on the audio thread.
pub type InputCallback = Box<dyn FnMut(&[f32]) + Send>;

/// Stream error callback, called with a human-readable message.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// MIDI input callback, called with one raw message per invocation.
pub type MidiCallback = Box<dyn FnMut(&[u8]) + Send>;

/// Platform audio API.
pub trait AudioBackend: Send {
    /// Human-readable name of this backend (e.g. "cpal", "mock").
    fn name(&self) -> &str;

    /// List all available audio devices.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// Get the default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Get the default input device, if any.
    fn default_input_device(&self) -> Result<Option<AudioDevice>>;

    /// Build and start an output stream.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;

    /// Build and start an input stream.
    fn build_input_stream(
        &self,
        config: &BackendStreamConfig,
        callback: InputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}

/// Sends raw MIDI messages to an open output port.
pub trait MidiSink: Send {
    /// Send one message.
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

/// Platform MIDI API.
pub trait MidiBackend: Send {
    /// Human-readable name of this backend.
    fn name(&self) -> &str;

    /// Names of the available input ports.
    fn input_ports(&self) -> Result<Vec<String>>;

    /// Names of the available output ports.
    fn output_ports(&self) -> Result<Vec<String>>;

    /// Open input port `port` (exact name) and deliver its messages to `callback`.
    fn connect_input(&self, port: &str, callback: MidiCallback) -> Result<StreamHandle>;

    /// Open output port `port` (exact name).
    fn connect_output(&self, port: &str) -> Result<Box<dyn MidiSink>>;
}
