//! Integration tests for tapdelay-cli.
//!
//! Tests invoke the built binary on temporary WAV and raw files and check
//! the files it writes and the one-line errors it prints.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the `tapdelay` binary built by cargo.
fn tapdelay_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tapdelay"))
}

fn run(args: &[&str]) -> Output {
    tapdelay_bin()
        .args(args)
        .output()
        .expect("failed to run tapdelay")
}

fn write_wav(path: &Path, channels: u16, bits: u16, samples: &[i32]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: 48000,
        bits_per_sample: bits,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

fn read_wav(path: &Path) -> (hound::WavSpec, Vec<i32>) {
    let reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.into_samples::<i32>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ---------------------------------------------------------------------------
// Basic invocation
// ---------------------------------------------------------------------------

#[test]
fn cli_help_lists_subcommands() {
    let output = run(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for cmd in ["play", "process", "convert", "devices"] {
        assert!(stdout.contains(cmd), "help should mention '{cmd}'");
    }
}

#[test]
fn cli_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("tapdelay"));
}

// ---------------------------------------------------------------------------
// `tapdelay process`
// ---------------------------------------------------------------------------

#[test]
fn process_renders_echoes() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");

    let mut samples = vec![0i32; 2 * 3000];
    samples[0] = 20000;
    write_wav(&input, 2, 16, &samples);

    let result = run(&[
        "process",
        path_str(&input),
        path_str(&output),
        "--delay",
        "100",
        "--feedback",
        "1",
        "--alt-polarity",
        "--linear",
    ]);
    assert!(
        result.status.success(),
        "process failed: {}",
        String::from_utf8_lossy(&result.stdout)
    );

    let (spec, out) = read_wav(&output);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(out.len(), samples.len());
    assert_eq!(out[0], 10000);
    assert_eq!(out[200], -5000, "first echo, inverted and halved");
    assert_eq!(out[400], 20000 / 3 / 2, "second echo");
    assert_eq!(out[600], 0);
}

#[test]
fn process_keeps_24_bit_format() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in24.wav");
    let output = dir.path().join("out24.wav");

    let mut samples = vec![0i32; 5000];
    samples[0] = 6_000_000;
    write_wav(&input, 1, 24, &samples);

    let result = run(&[
        "process",
        path_str(&input),
        path_str(&output),
        "--delay",
        "50",
        "--feedback",
        "2",
        "--alt-polarity=false",
        "--linear=false",
    ]);
    assert!(result.status.success());

    let (spec, out) = read_wav(&output);
    assert_eq!(spec.bits_per_sample, 24);
    assert_eq!(out.len(), 5000);
    assert_eq!(out[0], 3_000_000);
    // Exponential divisors: 2 then 4.
    assert_eq!(out[50], 6_000_000 / 2 / 2);
    assert_eq!(out[100], 6_000_000 / 4 / 2);
}

#[test]
fn process_rejects_delay_too_big() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    write_wav(&input, 1, 16, &[0; 100]);

    let result = run(&[
        "process",
        path_str(&input),
        path_str(&dir.path().join("out.wav")),
        "--delay",
        "60000",
        "--feedback",
        "3",
    ]);
    assert!(!result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.starts_with("Error:"), "got: {stdout}");
    assert_eq!(stdout.trim_end().lines().count(), 1);
}

#[test]
fn process_rejects_unsupported_format() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in8.wav");
    write_wav(&input, 1, 8, &[1, 2, 3]);

    let result = run(&[
        "process",
        path_str(&input),
        path_str(&dir.path().join("out.wav")),
    ]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("Unsupported sample format"));
}

#[test]
fn process_missing_input_fails() {
    let result = run(&["process", "/nonexistent/in.wav", "/nonexistent/out.wav"]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stdout).starts_with("Error:"));
}

// ---------------------------------------------------------------------------
// `tapdelay convert`
// ---------------------------------------------------------------------------

#[test]
fn convert_wraps_raw_file() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("in.raw");
    let wav = dir.path().join("out.wav");
    let bytes: Vec<u8> = [100i16, -100, 200, -200]
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();
    std::fs::write(&raw, bytes).unwrap();

    let result = run(&[
        "convert",
        path_str(&raw),
        path_str(&wav),
        "--channels",
        "2",
        "--bits",
        "16",
        "--sample-rate",
        "32000",
    ]);
    assert!(result.status.success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("Wrote 2 frames"));

    let (spec, samples) = read_wav(&wav);
    assert_eq!(spec.sample_rate, 32000);
    assert_eq!(samples, vec![100, -100, 200, -200]);
}

#[test]
fn convert_rejects_bad_depth() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("in.raw");
    std::fs::write(&raw, [0u8; 8]).unwrap();

    let result = run(&[
        "convert",
        path_str(&raw),
        path_str(&dir.path().join("out.wav")),
        "--bits",
        "12",
    ]);
    assert!(!result.status.success());
}

// ---------------------------------------------------------------------------
// `tapdelay play`
// ---------------------------------------------------------------------------

#[test]
fn play_missing_file_fails_before_opening_device() {
    let result = run(&["play", "default", "/nonexistent/in.wav"]);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stdout).starts_with("Error:"));
}

#[test]
fn play_rejects_conflicting_tap_flags() {
    let result = run(&[
        "play",
        "default",
        "in.wav",
        "--feedback",
        "3",
        "--taps",
        "4",
    ]);
    assert!(!result.status.success());
}
