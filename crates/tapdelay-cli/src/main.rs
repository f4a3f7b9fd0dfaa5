//! tapdelay CLI - play, render and convert audio through the multi-tap delay.

mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "tapdelay")]
#[command(author, version, about = "Real-time multi-tap feedback delay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a WAV file through the delay, with live parameter control on stdin
    Play(commands::play::PlayArgs),

    /// Render a WAV file through the delay into another WAV file
    Process(commands::process::ProcessArgs),

    /// Wrap headerless PCM in a WAV container
    Convert(commands::convert::ConvertArgs),

    /// List audio output devices
    Devices,
}

fn main() -> ExitCode {
    use tracing_subscriber::EnvFilter;

    // Warnings only by default so log lines stay out of the command prompt.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play(args) => commands::play::run(args),
        Commands::Process(args) => commands::process::run(args),
        Commands::Convert(args) => commands::convert::run(args),
        Commands::Devices => commands::devices::run(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
