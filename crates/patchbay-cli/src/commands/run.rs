//! The mixer control loop.
//!
//! Opens the configured devices, builds the topology from the configuration
//! directory, then reads one command per line from stdin until `quit`,
//! end of input or Ctrl-C.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::Command;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use clap::Args;
use patchbay_config::{Button, Session};
use patchbay_io::{CpalBackend, MidirBackend, Processor};

use super::common;

#[derive(Args)]
pub struct RunArgs {
    /// Configuration directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print meters every N milliseconds (0 = only on `meters`)
    #[arg(long, default_value = "0")]
    meter_ms: u64,

    /// Write routing.toml on exit
    #[arg(long)]
    save_on_exit: bool,
}

/// A line of control input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Control {
    /// Re-read every configuration file and rebuild the topology.
    Reload,
    /// Write the current routing to routing.toml.
    Save,
    /// Close and reopen every device.
    Reopen,
    /// Close and reopen the MIDI ports only.
    Midi,
    /// Print the channels and their sends.
    List,
    /// Print and reset peak meters.
    Meters,
    /// Print the command list.
    Help,
    /// Stop.
    Quit,
    /// Anything else.
    Unknown(String),
}

impl Control {
    /// `None` for a blank line.
    fn parse(line: &str) -> Option<Self> {
        let word = line.trim();
        if word.is_empty() {
            return None;
        }
        Some(match word.to_lowercase().as_str() {
            "reload" | "r" => Self::Reload,
            "save" | "s" => Self::Save,
            "reopen" => Self::Reopen,
            "midi" => Self::Midi,
            "list" | "ls" | "l" => Self::List,
            "meters" | "m" => Self::Meters,
            "help" | "h" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(word.to_string()),
        })
    }
}

const HELP: &str = "\
Commands:
  reload   re-read configuration and rebuild channels
  save     write current routing to routing.toml
  reopen   close and reopen audio and MIDI devices
  midi     close and reopen MIDI ports only
  list     show channels, settings and sends
  meters   show peak levels since the last call
  quit     stop";

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let dir = common::config_dir(args.config);
    let mut session = Session::load(&dir)?;
    tracing::info!(dir = %session.dir().display(), "configuration loaded");

    let mut processor = Processor::new(
        Box::new(CpalBackend::new()),
        Box::new(MidirBackend::default()),
        common::device_config(&session.settings),
    );
    processor.init()?;
    apply_session(&processor, &session);
    install_buttons(&processor, &session.settings.buttons);

    let (tx, rx) = mpsc::channel();
    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(Control::Quit);
    })?;
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if let Some(control) = Control::parse(&line)
                && tx.send(control).is_err()
            {
                return;
            }
        }
        // End of input
        let _ = tx.send(Control::Quit);
    });

    if let Some(device) = processor.device() {
        println!("Running on {}. Type 'help' for commands.", device.name);
    }

    let tick = (args.meter_ms > 0).then(|| Duration::from_millis(args.meter_ms));
    loop {
        let control = match tick {
            Some(tick) => match rx.recv_timeout(tick) {
                Ok(control) => control,
                Err(RecvTimeoutError::Timeout) => Control::Meters,
                Err(RecvTimeoutError::Disconnected) => Control::Quit,
            },
            None => rx.recv().unwrap_or(Control::Quit),
        };

        match control {
            Control::Quit => break,
            other => handle(other, &mut processor, &mut session),
        }
    }

    if args.save_on_exit {
        save_routing(&processor, &mut session);
    }
    processor.deinit();
    println!("Stopped.");
    Ok(())
}

fn handle(control: Control, processor: &mut Processor, session: &mut Session) {
    match control {
        Control::Reload => reload(processor, session),
        Control::Save => save_routing(processor, session),
        Control::Reopen => {
            // Keep live edits across the rebuild
            processor
                .mixer()
                .access(|t| session.capture_routing(t));
            match processor.init() {
                Ok(()) => apply_session(processor, session),
                Err(e) => tracing::error!(error = %e, "reopen failed"),
            }
        }
        Control::Midi => {
            if let Err(e) = processor.reopen_midi() {
                tracing::error!(error = %e, "MIDI reopen failed");
            }
        }
        Control::List => {
            let text = processor
                .mixer()
                .access(|t| common::describe_topology(&session.layout, t));
            print!("{text}");
        }
        Control::Meters => {
            let meters = processor.mixer().drain_peaks();
            print!("{}", common::describe_meters(&session.layout, &meters));
        }
        Control::Help => println!("{HELP}"),
        Control::Unknown(word) => println!("Unknown command '{word}'. Type 'help'."),
        Control::Quit => {}
    }
}

/// Rebuild the topology from the session against the open device.
fn apply_session(processor: &Processor, session: &Session) {
    let report = processor
        .mixer()
        .access(|t| session.apply(t, |name, is_input| processor.find_endpoint(name, is_input)));
    report.log();
}

fn reload(processor: &mut Processor, session: &mut Session) {
    if let Err(e) = session.reload() {
        tracing::error!(error = %e, "reload failed, keeping current configuration");
        return;
    }

    let config = common::device_config(&session.settings);
    if config != *processor.config() {
        tracing::info!("device settings changed, reopening");
        if let Err(e) = processor.reconfigure(config) {
            tracing::error!(error = %e, "failed to open devices");
            return;
        }
    }
    install_buttons(processor, &session.settings.buttons);
    apply_session(processor, session);
}

fn save_routing(processor: &Processor, session: &mut Session) {
    processor
        .mixer()
        .access(|t| session.capture_routing(t));
    if let Err(e) = session.save_routing() {
        tracing::error!(error = %e, "failed to save routing");
    }
}

/// Run each button's command when its controller goes non-zero.
fn install_buttons(processor: &Processor, buttons: &[Button]) {
    if buttons.is_empty() {
        processor.clear_control_hook();
        return;
    }
    let buttons = buttons.to_vec();
    processor.set_control_hook(move |cc| {
        if cc.value == 0 {
            return;
        }
        if let Some(button) = buttons.iter().find(|b| b.cc == cc.controller) {
            spawn_command(&button.command);
        }
    });
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

/// Run `command` through the shell without blocking the MIDI thread.
fn spawn_command(command: &str) {
    let command = command.to_string();
    tracing::info!(%command, "button");
    std::thread::spawn(move || match shell(&command).status() {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::warn!(%command, %status, "button command failed"),
        Err(e) => tracing::warn!(%command, error = %e, "button command did not start"),
    });
}
