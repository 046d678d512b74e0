use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;

mod commands;

use commands::run::{ModeArg, RunOptions};

#[derive(Parser)]
#[command(name = "talon")]
#[command(about = "Talon SRX device configuration and simulation tool")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List transport backends
    Backends,

    /// Validate a devices file and print each device's settings
    Check {
        /// Devices file (YAML or TOML); defaults to talon.yaml/.yml/.toml here
        config: Option<PathBuf>,
    },

    /// Drive one configured device in a simulated control loop
    Run {
        /// Devices file (YAML or TOML)
        config: PathBuf,
        /// Device name in the file
        #[arg(short = 'd', long = "device")]
        device: String,
        /// Control mode
        #[arg(short = 'm', long = "mode", value_enum)]
        mode: ModeArg,
        /// Setpoint in the mode's units (fraction, rotations, RPM, A, V)
        #[arg(short = 's', long = "setpoint", allow_hyphen_values = true)]
        setpoint: f64,
        /// Number of control cycles
        #[arg(short = 'n', long = "cycles", default_value_t = 50)]
        cycles: u32,
        /// Simulated control period; defaults to the device's configured period
        #[arg(short = 'p', long = "period-ms")]
        period_ms: Option<u32>,
        /// Print one JSON object per cycle
        #[arg(long = "json")]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run_command(cli.command) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Backends => {
            commands::backends::run_backends();
            Ok(())
        }
        Commands::Check { config } => commands::check::run_check(config),
        Commands::Run {
            config,
            device,
            mode,
            setpoint,
            cycles,
            period_ms,
            json,
        } => commands::run::run_device(RunOptions {
            config,
            device,
            mode,
            setpoint,
            cycles,
            period_ms,
            json,
        }),
    }
}
