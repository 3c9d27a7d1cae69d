//! Device discovery, name matching and endpoint naming.

use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

use crate::Result;

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Audio device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Channels in the default input configuration (0 if none).
    pub input_channels: u16,
    /// Channels in the default output configuration (0 if none).
    pub output_channels: u16,
}

/// One hardware channel of the open device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Position within the interleaved frame.
    pub index: usize,
    /// Display name, e.g. `"Input 1"`.
    pub name: String,
    /// Capture side if `true`, playback side otherwise.
    pub is_input: bool,
}

fn describe(device: &Device, name: String) -> AudioDevice {
    let input = device.default_input_config().ok();
    let output = device.default_output_config().ok();
    let default_sample_rate = output
        .as_ref()
        .or(input.as_ref())
        .map(|c| c.sample_rate())
        .unwrap_or(48000);

    AudioDevice {
        name,
        is_input: input.is_some(),
        is_output: output.is_some(),
        default_sample_rate,
        input_channels: input.map(|c| c.channels()).unwrap_or(0),
        output_channels: output.map(|c| c.channels()).unwrap_or(0),
    }
}

/// List all available audio devices on the default host.
///
/// A device that offers both capture and playback is listed once.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices: Vec<AudioDevice> = Vec::new();

    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device_name(&device) {
                devices.push(describe(&device, name));
            }
        }
    }

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device_name(&device) {
                // Skip if already added as input
                if devices.iter().any(|d| d.name == name) {
                    continue;
                }
                devices.push(describe(&device, name));
            }
        }
    }

    Ok(devices)
}

/// Default input and output devices of the default host.
pub fn default_device() -> Result<(Option<AudioDevice>, Option<AudioDevice>)> {
    let host = cpal::default_host();

    let input = host
        .default_input_device()
        .and_then(|d| device_name(&d).ok().map(|name| describe(&d, name)));
    let output = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok().map(|name| describe(&d, name)));

    Ok((input, output))
}

/// Find a device by exact name, index, or case-insensitive partial name,
/// in that order.
///
/// An exact name wins over an index, so a device called `"2"` is still
/// reachable by name. When several devices match partially the first is
/// returned and the ambiguity is logged.
pub fn find_device<'a>(devices: &'a [AudioDevice], name_or_index: &str) -> Option<&'a AudioDevice> {
    if let Some(device) = devices.iter().find(|d| d.name == name_or_index) {
        return Some(device);
    }

    if let Ok(index) = name_or_index.parse::<usize>() {
        return devices.get(index);
    }

    let search_lower = name_or_index.to_lowercase();
    let matches: Vec<_> = devices
        .iter()
        .filter(|d| d.name.to_lowercase().contains(&search_lower))
        .collect();

    if matches.len() > 1 {
        let names: Vec<_> = matches.iter().map(|d| d.name.as_str()).collect();
        tracing::warn!(
            search = name_or_index,
            ?names,
            "device name is ambiguous, using first match"
        );
    }
    matches.first().copied()
}

/// Find a port by exact name, then case-insensitive partial name.
pub fn find_port<'a>(ports: &'a [String], wanted: &str) -> Option<&'a str> {
    if let Some(port) = ports.iter().find(|p| *p == wanted) {
        return Some(port);
    }
    let wanted_lower = wanted.to_lowercase();
    ports
        .iter()
        .find(|p| p.to_lowercase().contains(&wanted_lower))
        .map(String::as_str)
}

/// Endpoints for a device with the given channel counts.
///
/// Inputs are named `Input 1..=n` and outputs `Output 1..=m`; the index is
/// the zero-based position in the interleaved frame.
pub fn endpoints_for(input_channels: u16, output_channels: u16) -> Vec<Endpoint> {
    let inputs = (0..usize::from(input_channels)).map(|index| Endpoint {
        index,
        name: format!("Input {}", index + 1),
        is_input: true,
    });
    let outputs = (0..usize::from(output_channels)).map(|index| Endpoint {
        index,
        name: format!("Output {}", index + 1),
        is_input: false,
    });
    inputs.chain(outputs).collect()
}
