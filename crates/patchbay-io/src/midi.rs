//! MIDI message parsing and the midir backend.

use midir::{MidiInput, MidiOutput, MidiOutputConnection};

use crate::backend::{MidiBackend, MidiCallback, MidiSink, StreamHandle};
use crate::{Error, Result};

/// A Control Change message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlChange {
    /// MIDI channel (0-15).
    pub channel: u8,
    /// Controller number (0-127).
    pub controller: u8,
    /// Controller value (0-127).
    pub value: u8,
}

impl ControlChange {
    /// Parse raw bytes. Returns `None` for anything but a 3-byte CC message.
    pub fn parse(data: &[u8]) -> Option<Self> {
        match *data {
            [status, controller, value, ..] if status & 0xF0 == 0xB0 => Some(Self {
                channel: status & 0x0F,
                controller: controller & 0x7F,
                value: value & 0x7F,
            }),
            _ => None,
        }
    }

    /// Encode back to raw bytes.
    pub fn to_bytes(self) -> [u8; 3] {
        [0xB0 | (self.channel & 0x0F), self.controller & 0x7F, self.value & 0x7F]
    }
}

/// midir-based MIDI backend.
pub struct MidirBackend {
    client_name: String,
}

impl MidirBackend {
    /// Create a backend that registers with the system as `client_name`.
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn input(&self) -> Result<MidiInput> {
        MidiInput::new(&format!("{}-in", self.client_name)).map_err(|e| Error::Midi(e.to_string()))
    }

    fn output(&self) -> Result<MidiOutput> {
        MidiOutput::new(&format!("{}-out", self.client_name))
            .map_err(|e| Error::Midi(e.to_string()))
    }
}

impl Default for MidirBackend {
    fn default() -> Self {
        Self::new("patchbay")
    }
}

struct MidirSink(MidiOutputConnection);

impl MidiSink for MidirSink {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.0.send(message).map_err(|e| Error::Midi(e.to_string()))
    }
}

impl MidiBackend for MidirBackend {
    fn name(&self) -> &'static str {
        "midir"
    }

    fn input_ports(&self) -> Result<Vec<String>> {
        let midi_in = self.input()?;
        Ok(midi_in
            .ports()
            .iter()
            .filter_map(|p| midi_in.port_name(p).ok())
            .collect())
    }

    fn output_ports(&self) -> Result<Vec<String>> {
        let midi_out = self.output()?;
        Ok(midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect())
    }

    fn connect_input(&self, port: &str, mut callback: MidiCallback) -> Result<StreamHandle> {
        let midi_in = self.input()?;
        let target = midi_in
            .ports()
            .into_iter()
            .find(|p| midi_in.port_name(p).is_ok_and(|n| n == port))
            .ok_or_else(|| Error::MidiPortNotFound(port.to_string()))?;

        let connection = midi_in
            .connect(
                &target,
                &format!("{}-in", self.client_name),
                move |_timestamp, data, _| callback(data),
                (),
            )
            .map_err(|e| Error::Midi(e.to_string()))?;

        tracing::info!(port, "MIDI input connected");
        Ok(StreamHandle::new(connection))
    }

    fn connect_output(&self, port: &str) -> Result<Box<dyn MidiSink>> {
        let midi_out = self.output()?;
        let target = midi_out
            .ports()
            .into_iter()
            .find(|p| midi_out.port_name(p).is_ok_and(|n| n == port))
            .ok_or_else(|| Error::MidiPortNotFound(port.to_string()))?;

        let connection = midi_out
            .connect(&target, &format!("{}-out", self.client_name))
            .map_err(|e| Error::Midi(e.to_string()))?;

        tracing::info!(port, "MIDI output connected");
        Ok(Box::new(MidirSink(connection)))
    }
}
