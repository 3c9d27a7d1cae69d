//! patchbay: realtime audio routing and mixing from the command line.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchbay")]
#[command(author, version, about = "Realtime audio routing matrix", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List audio devices and MIDI ports
    Devices(commands::devices::DevicesArgs),

    /// Validate configuration files against the configured device
    Check(commands::check::CheckArgs),

    /// Open devices and run the mixer
    Run(commands::run::RunArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices(args) => commands::devices::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Run(args) => commands::run::run(args),
    }
}
