//! Offline rendering of a WAV file through the delay.

use super::common::{SessionArgs, describe};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tapdelay_core::{EngineConfig, I24, Sample, SampleFormat, render_offline};
use tapdelay_io::{FileSource, WavInfo, WavOutput, probe_wav};

#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file (16- or 24-bit integer PCM)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file, overwritten if it exists
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    session: SessionArgs,
}

pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let config = args.session.resolve()?;

    println!("Reading {}...", args.input.display());
    let info = probe_wav(&args.input)?;
    println!("  {}", describe(&info));
    println!("\n{}\n", config.effect);

    let pb = ProgressBar::new(info.frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let frames = match info.format {
        SampleFormat::I16 => render::<i16>(&args, &info, &config, &pb)?,
        SampleFormat::I24 => render::<I24>(&args, &info, &config, &pb)?,
    };
    pb.finish_with_message("done");

    println!("\nWrote {} frames to {}", frames, args.output.display());
    Ok(())
}

fn render<S: Sample>(
    args: &ProcessArgs,
    info: &WavInfo,
    config: &EngineConfig,
    pb: &ProgressBar,
) -> anyhow::Result<u64> {
    let source = FileSource::open(&args.input, info.data_range.clone())?;
    let mut output = WavOutput::create(&args.output, info.channels, info.sample_rate, info.format)?;
    let channels = usize::from(info.channels);

    let frames = render_offline(source, channels, config.effect, config, |seg: &[S]| {
        output.write(seg)?;
        pb.inc((seg.len() / channels) as u64);
        Ok(())
    })?;
    output.finalize()?;
    Ok(frames)
}
