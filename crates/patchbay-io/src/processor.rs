//! Device lifecycle around a shared [`Mixer`].
//!
//! ```text
//!            init()                 devices open
//! Closed ──────────▶ Configuring ────────────────▶ Streaming
//!   ▲                    │ any failure                 │
//!   └────────────────────┴──────── deinit() ◀──────────┘
//! ```
//!
//! `init()` always starts with `deinit()`, so calling it again reopens
//! everything with the current [`DeviceConfig`]. A failed `init()` drops
//! whatever it had opened and leaves the processor `Closed`.

use std::sync::Arc;

use parking_lot::Mutex;
use patchbay_core::{Mixer, MixerConfig};

use crate::backend::{
    AudioBackend, BackendStreamConfig, ErrorCallback, MidiBackend, MidiCallback, MidiSink,
    StreamHandle,
};
use crate::bridge::{BlockRenderer, bridge};
use crate::devices::{AudioDevice, Endpoint, endpoints_for, find_device, find_port};
use crate::midi::ControlChange;
use crate::{Error, Result};

/// How many blocks of capture may queue up ahead of playback.
const BRIDGE_BLOCKS: usize = 4;

/// Lifecycle state of a [`Processor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// No device is open.
    Closed,
    /// `init()` is opening devices.
    Configuring,
    /// Audio is running.
    Streaming,
}

/// Which devices to open and how.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Audio device name or index (system default if `None`).
    pub audio_device: Option<String>,
    /// MIDI input port (none opened if `None` or empty).
    pub midi_in: Option<String>,
    /// MIDI output port for thru (none opened if `None` or empty).
    pub midi_out: Option<String>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Buffer size in frames.
    pub buffer_size: u32,
    /// Fader headroom at full MIDI travel, in dB.
    pub max_db: f32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            audio_device: None,
            midi_in: None,
            midi_out: None,
            sample_rate: 48000,
            buffer_size: 512,
            max_db: patchbay_core::DEFAULT_MAX_DB,
        }
    }
}

/// Control-plane observer for incoming control changes.
///
/// Called on the MIDI thread after the change has been applied to the mixer.
pub type ControlHook = Arc<dyn Fn(ControlChange) + Send + Sync>;

fn non_empty(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

/// Owns the device connections feeding a [`Mixer`].
pub struct Processor {
    mixer: Arc<Mixer>,
    audio: Box<dyn AudioBackend>,
    midi: Box<dyn MidiBackend>,
    config: DeviceConfig,
    state: ProcessorState,
    device: Option<AudioDevice>,
    endpoints: Vec<Endpoint>,
    streams: Vec<StreamHandle>,
    midi_input: Option<StreamHandle>,
    midi_output: Option<Arc<Mutex<Box<dyn MidiSink>>>>,
    control_hook: Arc<Mutex<Option<ControlHook>>>,
}

impl Processor {
    /// Create a closed processor with an empty mixer.
    pub fn new(
        audio: Box<dyn AudioBackend>,
        midi: Box<dyn MidiBackend>,
        config: DeviceConfig,
    ) -> Self {
        let mixer = Arc::new(Mixer::new(MixerConfig {
            sample_rate: config.sample_rate as f32,
            max_db: config.max_db,
        }));
        Self {
            mixer,
            audio,
            midi,
            config,
            state: ProcessorState::Closed,
            device: None,
            endpoints: Vec::new(),
            streams: Vec::new(),
            midi_input: None,
            midi_output: None,
            control_hook: Arc::new(Mutex::new(None)),
        }
    }

    /// The mixer driven by this processor.
    pub fn mixer(&self) -> &Arc<Mixer> {
        &self.mixer
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Device configuration used by the next `init()`.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// The open audio device, if any.
    pub fn device(&self) -> Option<&AudioDevice> {
        self.device.as_ref()
    }

    /// Endpoints of the open device (empty when closed).
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Audio backend, for device listings.
    pub fn audio_backend(&self) -> &dyn AudioBackend {
        self.audio.as_ref()
    }

    /// MIDI backend, for port listings.
    pub fn midi_backend(&self) -> &dyn MidiBackend {
        self.midi.as_ref()
    }

    /// Install a hook that sees every control change. Takes effect immediately.
    pub fn set_control_hook(&self, hook: impl Fn(ControlChange) + Send + Sync + 'static) {
        *self.control_hook.lock() = Some(Arc::new(hook));
    }

    /// Remove the control hook.
    pub fn clear_control_hook(&self) {
        *self.control_hook.lock() = None;
    }

    /// Index of the endpoint called `name` on the given side.
    ///
    /// Always `None` while closed.
    pub fn find_endpoint(&self, name: &str, is_input: bool) -> Option<usize> {
        if self.state == ProcessorState::Closed {
            return None;
        }
        self.endpoints
            .iter()
            .find(|e| e.is_input == is_input && e.name == name)
            .map(|e| e.index)
    }

    /// Open audio and MIDI devices and start streaming.
    pub fn init(&mut self) -> Result<()> {
        self.deinit();
        self.state = ProcessorState::Configuring;

        match self.open() {
            Ok(()) => {
                self.state = ProcessorState::Streaming;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to open devices");
                self.deinit();
                Err(e)
            }
        }
    }

    /// Stop streaming and close every device. Safe to call in any state.
    pub fn deinit(&mut self) {
        // MIDI first so no control change lands mid-teardown
        self.midi_input = None;
        self.midi_output = None;
        // Dropped front to back: capture before playback
        self.streams.clear();
        if self.state != ProcessorState::Closed {
            tracing::info!("devices closed");
        }
        self.endpoints.clear();
        self.device = None;
        self.state = ProcessorState::Closed;
    }

    /// Replace the device configuration and reopen everything.
    pub fn reconfigure(&mut self, config: DeviceConfig) -> Result<()> {
        self.config = config;
        self.init()
    }

    /// Close and reopen only the MIDI ports, keeping audio running.
    pub fn reopen_midi(&mut self) -> Result<()> {
        self.midi_input = None;
        self.midi_output = None;
        if self.state != ProcessorState::Streaming {
            return Ok(());
        }
        self.open_midi()
    }

    fn open(&mut self) -> Result<()> {
        self.mixer.configure(MixerConfig {
            sample_rate: self.config.sample_rate as f32,
            max_db: self.config.max_db,
        });
        self.open_audio()?;
        self.open_midi()
    }

    fn resolve_devices(&self) -> Result<(Option<AudioDevice>, AudioDevice)> {
        match non_empty(self.config.audio_device.as_deref()) {
            Some(wanted) => {
                let devices = self.audio.list_devices()?;
                let Some(device) = find_device(&devices, wanted) else {
                    tracing::error!(device = wanted, "no audio device with that name");
                    for d in &devices {
                        tracing::info!(name = %d.name, "available audio device");
                    }
                    return Err(Error::DeviceNotFound(wanted.to_string()));
                };
                if !device.is_output || device.output_channels == 0 {
                    return Err(Error::NoOutputChannels(device.name.clone()));
                }
                let input = (device.is_input && device.input_channels > 0).then(|| device.clone());
                Ok((input, device.clone()))
            }
            None => {
                let output = self.audio.default_output_device()?.ok_or(Error::NoDevice)?;
                if output.output_channels == 0 {
                    return Err(Error::NoOutputChannels(output.name));
                }
                let input = self
                    .audio
                    .default_input_device()?
                    .filter(|d| d.input_channels > 0);
                Ok((input, output))
            }
        }
    }

    fn open_audio(&mut self) -> Result<()> {
        let (input, output) = self.resolve_devices()?;
        let in_channels = input.as_ref().map_or(0, |d| d.input_channels);
        let out_channels = output.output_channels;

        tracing::info!(
            device = %output.name,
            inputs = in_channels,
            outputs = out_channels,
            sample_rate = self.config.sample_rate,
            buffer_size = self.config.buffer_size,
            "opening audio device"
        );

        let stream_config = |device: &AudioDevice, channels: u16| BackendStreamConfig {
            sample_rate: self.config.sample_rate,
            buffer_size: self.config.buffer_size,
            channels,
            device_name: Some(device.name.clone()),
        };

        let mut renderer = match &input {
            Some(device) => {
                let capacity = self.config.buffer_size as usize * BRIDGE_BLOCKS;
                let (mut feed, renderer) = bridge(
                    Arc::clone(&self.mixer),
                    usize::from(in_channels),
                    usize::from(out_channels),
                    capacity,
                );
                let handle = self.audio.build_input_stream(
                    &stream_config(device, in_channels),
                    Box::new(move |data: &[f32]| {
                        feed.push(data);
                    }),
                    stream_error("input"),
                )?;
                self.streams.push(handle);
                renderer
            }
            None => BlockRenderer::output_only(Arc::clone(&self.mixer), usize::from(out_channels)),
        };

        let handle = self.audio.build_output_stream(
            &stream_config(&output, out_channels),
            Box::new(move |data: &mut [f32]| renderer.render(data)),
            stream_error("output"),
        )?;
        self.streams.push(handle);

        self.endpoints = endpoints_for(in_channels, out_channels);
        for endpoint in &self.endpoints {
            tracing::debug!(
                index = endpoint.index,
                name = %endpoint.name,
                input = endpoint.is_input,
                "endpoint"
            );
        }
        self.device = Some(output);
        Ok(())
    }

    fn open_midi(&mut self) -> Result<()> {
        if let Some(wanted) = non_empty(self.config.midi_out.as_deref()) {
            let ports = self.midi.output_ports()?;
            let port = find_port(&ports, wanted).ok_or_else(|| {
                log_ports("MIDI output", &ports);
                Error::MidiPortNotFound(wanted.to_string())
            })?;
            let sink = self.midi.connect_output(port)?;
            self.midi_output = Some(Arc::new(Mutex::new(sink)));
        }

        if let Some(wanted) = non_empty(self.config.midi_in.as_deref()) {
            let ports = self.midi.input_ports()?;
            let port = find_port(&ports, wanted).ok_or_else(|| {
                log_ports("MIDI input", &ports);
                Error::MidiPortNotFound(wanted.to_string())
            })?;
            let handle = self.midi.connect_input(port, self.midi_callback())?;
            self.midi_input = Some(handle);
        }

        Ok(())
    }

    fn midi_callback(&self) -> MidiCallback {
        let mixer = Arc::clone(&self.mixer);
        let thru = self.midi_output.clone();
        let hook = Arc::clone(&self.control_hook);

        Box::new(move |data: &[u8]| {
            if let Some(out) = &thru
                && let Err(e) = out.lock().send(data)
            {
                tracing::warn!(error = %e, "MIDI thru failed");
            }

            let Some(cc) = ControlChange::parse(data) else {
                return;
            };
            let bound = mixer.handle_midi(cc.controller, cc.value);
            tracing::trace!(
                controller = cc.controller,
                value = cc.value,
                bound,
                "control change"
            );

            let hook = hook.lock().clone();
            if let Some(hook) = hook {
                hook(cc);
            }
        })
    }
}

impl Drop for Processor {
    fn drop(&mut self) {
        self.deinit();
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("audio", &self.audio.name())
            .field("midi", &self.midi.name())
            .field("state", &self.state)
            .field("device", &self.device)
            .field("endpoints", &self.endpoints.len())
            .finish_non_exhaustive()
    }
}

fn stream_error(kind: &'static str) -> ErrorCallback {
    Box::new(move |message: &str| {
        tracing::error!(stream = kind, "{message}");
    })
}

fn log_ports(kind: &str, ports: &[String]) {
    tracing::error!("no {kind} port with that name");
    for port in ports {
        tracing::info!(port = %port, "available {kind} port");
    }
}
