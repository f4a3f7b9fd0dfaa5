//! Integration tests for tapdelay-io: WAV files through the delay engine.

use std::sync::Arc;
use tapdelay_core::{
    CaptureSink, EffectParameters, EngineConfig, FormatSession, I24, ParameterStore,
    PlaybackEngine, SampleFormat, StopSignal, render_offline,
};
use tapdelay_io::{FileSource, WavOutput, convert_raw_to_wav, probe_wav};
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn impulse_wav(frames: usize, channels: u16, amplitude: i16) -> NamedTempFile {
    let mut samples = vec![0i16; frames * usize::from(channels)];
    samples[0] = amplitude;
    let file = NamedTempFile::new().unwrap();
    let mut out = WavOutput::create(file.path(), channels, 48000, SampleFormat::I16).unwrap();
    out.write(&samples).unwrap();
    out.finalize().unwrap();
    file
}

fn params(n_delay: u32, n_taps: u32) -> EffectParameters {
    EffectParameters {
        n_delay,
        n_taps,
        ..EffectParameters::STARTUP
    }
}

// ---------------------------------------------------------------------------
// Offline processing
// ---------------------------------------------------------------------------

#[test]
fn process_wav_file_to_wav_file() {
    let input = impulse_wav(2000, 2, 12000);
    let info = probe_wav(input.path()).unwrap();
    let source = FileSource::open(input.path(), info.data_range.clone()).unwrap();

    let output = NamedTempFile::new().unwrap();
    let mut wav =
        WavOutput::create(output.path(), info.channels, info.sample_rate, info.format).unwrap();
    let config = EngineConfig {
        period_frames: 128,
        history_frames: 1024,
        ..EngineConfig::default()
    };
    let frames = render_offline(
        source,
        usize::from(info.channels),
        params(100, 3),
        &config,
        |seg: &[i16]| wav.write(seg),
    )
    .unwrap();
    wav.finalize().unwrap();
    assert_eq!(frames, 2000);

    let result = probe_wav(output.path()).unwrap();
    assert_eq!(result.frames, info.frames);
    assert_eq!(result.format, SampleFormat::I16);

    let samples: Vec<i16> = hound::WavReader::open(output.path())
        .unwrap()
        .into_samples()
        .map(|s| s.unwrap())
        .collect();
    assert_eq!(samples[0], 6000);
    assert_eq!(samples[200], -3000, "tap 1 at frame 100, inverted");
    assert_eq!(samples[400], 2000, "tap 2 at frame 200");
    assert_eq!(samples[600], -1500, "tap 3 at frame 300");
    assert_eq!(samples[800], 0);
}

// ---------------------------------------------------------------------------
// Live sessions from files
// ---------------------------------------------------------------------------

#[test]
fn live_session_from_converted_raw_file() {
    let mut raw_samples = vec![I24::default(); 3000];
    raw_samples[0] = I24::new(-800_000).unwrap();
    let raw = NamedTempFile::new().unwrap();
    std::fs::write(raw.path(), tapdelay_core::encode_le(&raw_samples)).unwrap();

    let wav = NamedTempFile::new().unwrap();
    convert_raw_to_wav(raw.path(), wav.path(), 1, 24, 44100).unwrap();
    let info = probe_wav(wav.path()).unwrap();
    assert_eq!(info.format, SampleFormat::I24);

    let store = Arc::new(ParameterStore::new(params(50, 2), 4096).unwrap());
    let mut engine = PlaybackEngine::new(
        FileSource::open(wav.path(), info.data_range.clone()).unwrap(),
        CaptureSink::<I24>::new(64, 1),
        store,
        StopSignal::new(),
        3,
    )
    .unwrap();
    engine.run().unwrap();

    let out = engine.into_parts().1.into_samples();
    assert!(out.len() >= 3000);
    assert_eq!(out[0].get(), -400_000);
    assert_eq!(out[50].get(), 200_000);
    assert_eq!(out[100].get(), -800_000 / 3 / 2);
    assert_eq!(out[150].get(), 0);
}

#[test]
fn format_session_dispatches_on_probed_depth() {
    let input = impulse_wav(512, 1, 1000);
    let info = probe_wav(input.path()).unwrap();
    let store = Arc::new(ParameterStore::new(params(10, 1), 1024).unwrap());
    let source = FileSource::open(input.path(), info.data_range.clone()).unwrap();

    let mut session = match info.format {
        SampleFormat::I16 => FormatSession::I16(
            PlaybackEngine::new(
                source,
                CaptureSink::<i16>::new(32, 1),
                store,
                StopSignal::new(),
                2,
            )
            .unwrap(),
        ),
        SampleFormat::I24 => FormatSession::I24(
            PlaybackEngine::new(
                source,
                CaptureSink::<I24>::new(32, 1),
                store,
                StopSignal::new(),
                2,
            )
            .unwrap(),
        ),
    };
    let stats = session.run().unwrap();
    assert_eq!(stats.segments_played, 512 / 32);
}
