//! Raw PCM to WAV conversion command.

use clap::Args;
use std::path::PathBuf;
use tapdelay_io::convert_raw_to_wav;

#[derive(Args)]
pub struct ConvertArgs {
    /// Headerless little-endian PCM file
    #[arg(value_name = "RAW")]
    input: PathBuf,

    /// Output WAV file, overwritten if it exists
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Interleaved channel count
    #[arg(short, long, default_value = "2")]
    channels: u16,

    /// Bits per sample (16 or 24)
    #[arg(short, long, default_value = "16")]
    bits: u16,

    /// Sample rate in Hz
    #[arg(short = 'r', long, default_value = "44100")]
    sample_rate: u32,
}

pub fn run(args: ConvertArgs) -> anyhow::Result<()> {
    let frames = convert_raw_to_wav(
        &args.input,
        &args.output,
        args.channels,
        args.bits,
        args.sample_rate,
    )?;
    println!(
        "Wrote {} frames ({} channel(s), {}-bit, {} Hz) to {}",
        frames,
        args.channels,
        args.bits,
        args.sample_rate,
        args.output.display()
    );
    Ok(())
}
