//! Configuration validation command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use patchbay_config::{LoadReport, Session};
use patchbay_core::{FaderTaper, Topology};
use patchbay_io::{
    AudioDevice, Endpoint, MidiBackend, MidirBackend, default_device, endpoints_for, find_device,
    find_port, list_devices,
};

use super::common;

#[derive(Args)]
pub struct CheckArgs {
    /// Configuration directory
    #[arg(short, long)]
    config: Option<PathBuf>,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let dir = common::config_dir(args.config);
    println!("Checking {}", dir.display());

    let session = Session::load(&dir)
        .with_context(|| format!("invalid configuration in {}", dir.display()))?;
    println!(
        "  {} channel(s), {} route(s), {} button(s)",
        session.layout.channels.len(),
        session.routing.routes.len(),
        session.settings.buttons.len()
    );

    let device = configured_device(&session)?;
    let endpoints = match &device {
        Some(d) => {
            println!(
                "  Device: {} ({} in / {} out)",
                d.name, d.input_channels, d.output_channels
            );
            Some(endpoints_for(d.input_channels, d.output_channels))
        }
        None => {
            println!("  Device: not found, endpoint names not checked");
            None
        }
    };

    check_ports(&session);

    let report = check_session(&session, endpoints.as_deref());
    if report.is_clean() {
        println!("\nOK");
        return Ok(());
    }

    println!();
    for issue in report.issues() {
        println!("  skipped: {issue}");
    }
    anyhow::bail!("{} entries would be skipped", report.issues().len())
}

fn configured_device(session: &Session) -> anyhow::Result<Option<AudioDevice>> {
    match session.settings.audio_device.as_deref().map(str::trim) {
        Some(wanted) if !wanted.is_empty() => {
            let devices = list_devices()?;
            Ok(find_device(&devices, wanted).cloned())
        }
        _ => Ok(default_device()?.1),
    }
}

fn check_ports(session: &Session) {
    let midi = MidirBackend::default();
    let wanted = [
        ("MIDI input", session.settings.midi_in.as_deref(), midi.input_ports()),
        ("MIDI output", session.settings.midi_out.as_deref(), midi.output_ports()),
    ];
    for (label, name, ports) in wanted {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };
        match ports {
            Ok(ports) => match find_port(&ports, name) {
                Some(port) => println!("  {label}: {port}"),
                None => println!("  {label}: '{name}' not found"),
            },
            Err(e) => println!("  {label}: unavailable ({e})"),
        }
    }
}

/// Apply the session to a scratch topology and collect what would be skipped.
///
/// With no endpoint list every endpoint name is accepted.
pub fn check_session(session: &Session, endpoints: Option<&[Endpoint]>) -> LoadReport {
    let settings = &session.settings;
    let mut topology = Topology::new(
        settings.sample_rate as f32,
        FaderTaper::new(settings.max_db),
    );
    session.apply(&mut topology, |name, is_input| match endpoints {
        Some(endpoints) => endpoints
            .iter()
            .find(|e| e.is_input == is_input && e.name == name)
            .map(|e| e.index),
        None => Some(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_config::{Issue, paths};
    use tempfile::TempDir;

    fn session(channels: &str, routing: &str) -> (TempDir, Session) {
        let dir = TempDir::new().unwrap();
        std::fs::write(paths::channels_path(dir.path()), channels).unwrap();
        std::fs::write(paths::routing_path(dir.path()), routing).unwrap();
        let session = Session::load(dir.path()).unwrap();
        (dir, session)
    }

    const CHANNELS: &str = r#"
        [[channels]]
        kind = "input"
        name = "Mic"
        endpoints = ["Input 1", "Input 5"]

        [[channels]]
        kind = "output"
        name = "Mains"
        endpoints = ["Output 1"]
    "#;

    #[test]
    fn test_reports_missing_endpoint() {
        let (_dir, session) = session(CHANNELS, "");
        let endpoints = endpoints_for(2, 2);

        let report = check_session(&session, Some(&endpoints));

        assert_eq!(
            report.issues(),
            &[Issue::UnknownEndpoint {
                channel: "Mic".into(),
                endpoint: "Input 5".into()
            }]
        );
    }

    #[test]
    fn test_without_device_only_structure_is_checked() {
        let routing = r#"
            [[routes]]
            channel = "Mic"
            kind = "input"
            outputs = ["Phones"]
        "#;
        let (_dir, session) = session(CHANNELS, routing);

        let report = check_session(&session, None);

        assert_eq!(report.issues().len(), 1);
        assert!(matches!(&report.issues()[0], Issue::UnknownOutput { output, .. } if output == "Phones"));
    }
}
