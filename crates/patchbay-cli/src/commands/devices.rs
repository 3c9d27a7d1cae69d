//! Device and port listing command.

use clap::Args;
use patchbay_io::{MidiBackend, MidirBackend, default_device, list_devices};

#[derive(Args)]
pub struct DevicesArgs {
    /// Also list the endpoint names of each device
    #[arg(long)]
    endpoints: bool,
}

pub fn run(args: DevicesArgs) -> anyhow::Result<()> {
    let devices = list_devices()?;
    let (default_input, default_output) = default_device()?;
    let is_default = |name: &str| {
        default_input.as_ref().is_some_and(|d| d.name == name)
            || default_output.as_ref().is_some_and(|d| d.name == name)
    };

    println!("Audio Devices");
    println!("=============\n");

    if devices.is_empty() {
        println!("  No audio devices found.");
    }
    for (idx, device) in devices.iter().enumerate() {
        let marker = if is_default(&device.name) { " (default)" } else { "" };
        println!(
            "  [{}] {}{} - {} in / {} out, {} Hz",
            idx,
            device.name,
            marker,
            device.input_channels,
            device.output_channels,
            device.default_sample_rate
        );
        if args.endpoints {
            let names: Vec<_> = patchbay_io::endpoints_for(device.input_channels, device.output_channels)
                .into_iter()
                .map(|e| e.name)
                .collect();
            println!("      {}", names.join(", "));
        }
    }

    let midi = MidirBackend::default();
    println!("\nMIDI Inputs");
    println!("===========\n");
    print_ports(midi.input_ports());
    println!("\nMIDI Outputs");
    println!("============\n");
    print_ports(midi.output_ports());

    println!();
    println!("Tip: set audio_device, midi_in and midi_out in settings.toml");
    println!("  to a device index or (partial) name from these lists.");

    Ok(())
}

fn print_ports(ports: patchbay_io::Result<Vec<String>>) {
    match ports {
        Ok(ports) if ports.is_empty() => println!("  None"),
        Ok(ports) => {
            for port in ports {
                println!("  - {port}");
            }
        }
        Err(e) => println!("  Unavailable: {e}"),
    }
}
