//! Live playback with parameter control on stdin.

use super::common::{SessionArgs, describe};
use clap::Args;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tapdelay_core::{
    ControlChannel, ControlLoop, EngineConfig, FormatSession, I24, ParameterStore,
    PlaybackEngine, SampleFormat, StopSignal, spawn_line_reader,
};
use tapdelay_io::{CpalSink, FileSource, WavInfo, probe_wav};

#[derive(Args)]
pub struct PlayArgs {
    /// Output device (`default`, index, exact name, or partial name)
    #[arg(value_name = "DEVICE")]
    device: String,

    /// WAV file to play (16- or 24-bit integer PCM)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    #[command(flatten)]
    session: SessionArgs,
}

type Session = FormatSession<FileSource, CpalSink<i16>, CpalSink<I24>>;

pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let config = args.session.resolve()?;
    let info = probe_wav(&args.file)?;
    println!("Playing {}", args.file.display());
    println!("  {}", describe(&info));

    let store = Arc::new(ParameterStore::new(config.effect, config.history_frames)?);
    let stop = StopSignal::new();
    let mut session = open_session(&args, &info, &config, &store, &stop)?;

    let ctrlc_stop = stop.clone();
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        ctrlc_stop.request();
    })?;

    let lines = spawn_line_reader(BufReader::new(io::stdin()))?;
    let control = ControlLoop::spawn(
        ControlChannel::new(Arc::clone(&store), stop.clone(), io::stdout()),
        lines,
    )?;

    let result = session.run();
    // The engine raises the stop signal on exit, which ends the control loop.
    control.join();

    let stats = result?;
    tracing::info!(
        segments = stats.segments_played,
        underruns = stats.underruns,
        "playback finished"
    );
    println!("Playback finished");
    Ok(())
}

fn open_session(
    args: &PlayArgs,
    info: &WavInfo,
    config: &EngineConfig,
    store: &Arc<ParameterStore>,
    stop: &StopSignal,
) -> anyhow::Result<Session> {
    let source = FileSource::open(&args.file, info.data_range.clone())?;
    let session = match info.format {
        SampleFormat::I16 => Session::I16(PlaybackEngine::new(
            source,
            CpalSink::open(
                &args.device,
                info.channels,
                info.sample_rate,
                config.period_frames,
            )?,
            Arc::clone(store),
            stop.clone(),
            config.staging_segments,
        )?),
        SampleFormat::I24 => Session::I24(PlaybackEngine::new(
            source,
            CpalSink::open(
                &args.device,
                info.channels,
                info.sample_rate,
                config.period_frames,
            )?,
            Arc::clone(store),
            stop.clone(),
            config.staging_segments,
        )?),
    };
    Ok(session)
}
