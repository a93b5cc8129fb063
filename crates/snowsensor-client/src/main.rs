//! Single-shot CLI for the snow-depth sensor.
//!
//! Connects, runs one command (`measure` by default), prints the result and
//! exits. Any failure is logged and terminates the process with a nonzero
//! status; there is no recover-and-continue mode.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use snowsensor_client::{ProtocolVariant, SensorConfig, Session};

#[derive(Parser)]
#[command(name = "snowsensor", about = "Read a calibrated height from a Wenglor snow-depth sensor")]
struct Cli {
    /// Configuration file.
    #[arg(long, default_value = "sensor.conf")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone, Copy)]
enum CliCommand {
    /// Take one calibrated measurement (default).
    Measure,
    /// Switch the measurement laser on.
    LaserOn,
    /// Switch the measurement laser off.
    LaserOff,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (config, used_defaults) = SensorConfig::load(&cli.config)?;
    if used_defaults {
        // First run: persist the defaults so operators have a file to edit.
        if let Err(e) = config.store(&cli.config) {
            warn!("failed to store configuration: {}", e);
        }
    }

    let mut session = Session::connect(ProtocolVariant::Wenglor, &config)?;
    let result = match cli.command.unwrap_or(CliCommand::Measure) {
        CliCommand::Measure => session.get_measurement().map(|m| {
            println!("timestamp=\"{}\" value=\"{:.1}\"", m.timestamp, m.height);
        }),
        CliCommand::LaserOn => session.set_laser(true).map(|()| {
            println!("laser has been switched on");
        }),
        CliCommand::LaserOff => session.set_laser(false).map(|()| {
            println!("laser has been switched off");
        }),
    };
    session.close();

    result.map_err(Into::into)
}
