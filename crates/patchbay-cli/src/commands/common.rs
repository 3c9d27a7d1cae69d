//! Helpers shared by the commands.

use std::fmt::Write as _;
use std::path::PathBuf;

use patchbay_config::{ChannelLayout, Settings};
use patchbay_core::math::linear_to_db;
use patchbay_core::{Channel, ChannelKind, MeterSnapshot, Topology};
use patchbay_io::DeviceConfig;

/// `--config` if given, otherwise the user configuration directory.
pub fn config_dir(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(patchbay_config::user_config_dir)
}

/// Device configuration from `settings.toml`.
pub fn device_config(settings: &Settings) -> DeviceConfig {
    DeviceConfig {
        audio_device: settings.audio_device.clone(),
        midi_in: settings.midi_in.clone(),
        midi_out: settings.midi_out.clone(),
        sample_rate: settings.sample_rate,
        buffer_size: settings.buffer_size,
        max_db: settings.max_db,
    }
}

fn channel_name(layout: &ChannelLayout, kind: ChannelKind, index: usize) -> String {
    layout
        .name_of(kind, index)
        .map_or_else(|| format!("{kind} {index}"), str::to_string)
}

/// One line per channel: endpoints, settings and (for inputs) sends.
pub fn describe_topology(layout: &ChannelLayout, topology: &Topology) -> String {
    let mut out = String::new();

    for (index, input) in topology.inputs().iter().enumerate() {
        let name = channel_name(layout, ChannelKind::Input, index);
        let sends: Vec<String> = input
            .output_levels()
            .iter()
            .enumerate()
            .filter(|&(_, &level)| level != 0.0)
            .map(|(o, level)| {
                format!("{}={level}", channel_name(layout, ChannelKind::Output, o))
            })
            .collect();
        let _ = writeln!(
            out,
            "  in  {name:<16} {:?} {} -> [{}]",
            input.strip().endpoints(),
            input.settings(),
            sends.join(", ")
        );
    }

    for (index, output) in topology.outputs().iter().enumerate() {
        let name = channel_name(layout, ChannelKind::Output, index);
        let _ = writeln!(
            out,
            "  out {name:<16} {:?} {}",
            output.strip().endpoints(),
            output.settings()
        );
    }

    if out.is_empty() {
        out.push_str("  (no channels)\n");
    }
    out
}

fn format_peaks(peaks: &[f32]) -> String {
    peaks
        .iter()
        .map(|&p| {
            if p > 0.0 {
                format!("{:6.1}", linear_to_db(p))
            } else {
                "  -inf".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Peak levels in dBFS, one line per channel.
pub fn describe_meters(layout: &ChannelLayout, meters: &MeterSnapshot) -> String {
    let mut out = String::new();
    for (index, peaks) in meters.inputs.iter().enumerate() {
        let name = channel_name(layout, ChannelKind::Input, index);
        let _ = writeln!(out, "  in  {name:<16} {}", format_peaks(peaks));
    }
    for (index, peaks) in meters.outputs.iter().enumerate() {
        let name = channel_name(layout, ChannelKind::Output, index);
        let _ = writeln!(out, "  out {name:<16} {}", format_peaks(peaks));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_config::{ChannelSpec, Kind};

    fn layout() -> ChannelLayout {
        ChannelLayout::default()
            .with_channel(ChannelSpec::new(Kind::Input, "Mic"))
            .with_channel(ChannelSpec::new(Kind::Output, "Mains"))
    }

    #[test]
    fn test_device_config_copies_settings() {
        let settings = Settings {
            audio_device: Some("Scarlett".into()),
            buffer_size: 64,
            ..Settings::default()
        };
        let config = device_config(&settings);
        assert_eq!(config.audio_device.as_deref(), Some("Scarlett"));
        assert_eq!(config.buffer_size, 64);
        assert_eq!(config.sample_rate, 48000);
    }

    #[test]
    fn test_describe_topology_names_channels() {
        let mut topology = Topology::default();
        let i = topology.add_input();
        let o = topology.add_output();
        topology.add_input();
        topology.set_level(i, o, 0.5).unwrap();

        let text = describe_topology(&layout(), &topology);
        assert!(text.contains("Mic"), "{text}");
        assert!(text.contains("Mains=0.5"), "{text}");
        // No layout name for the second input
        assert!(text.contains("input 1"), "{text}");
    }

    #[test]
    fn test_describe_empty_topology() {
        let text = describe_topology(&layout(), &Topology::default());
        assert_eq!(text, "  (no channels)\n");
    }

    #[test]
    fn test_describe_meters() {
        let meters = MeterSnapshot {
            inputs: vec![vec![1.0, 0.0]],
            outputs: vec![vec![]],
        };
        let text = describe_meters(&layout(), &meters);
        assert!(text.contains("   0.0   -inf"), "{text}");
        assert!(text.contains("out Mains"), "{text}");
    }
}
