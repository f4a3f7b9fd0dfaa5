//! Audio I/O layer for the tapdelay engine.
//!
//! This crate provides:
//!
//! - **File sources**: [`FileSource`] reads PCM straight from disk at byte offsets
//! - **WAV handling**: [`probe_wav`] locates the PCM payload, [`WavOutput`] writes results,
//!   [`convert_raw_to_wav`] wraps headerless PCM
//! - **Playback**: [`CpalSink`] implements [`tapdelay_core::AudioSink`] on top of cpal
//! - **Devices**: [`list_output_devices`] and [`find_output_device`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tapdelay_core::{EffectParameters, ParameterStore, PlaybackEngine, StopSignal};
//! use tapdelay_io::{CpalSink, FileSource, probe_wav};
//!
//! let info = probe_wav("input.wav")?;
//! let source = FileSource::open("input.wav", info.data_range.clone())?;
//! let sink = CpalSink::<i16>::open("default", info.channels, info.sample_rate, 1024)?;
//!
//! let params = Arc::new(ParameterStore::new(EffectParameters::STARTUP, 65536)?);
//! let mut engine = PlaybackEngine::new(source, sink, params, StopSignal::new(), 2)?;
//! engine.run()?;
//! ```

mod device;
mod sink;
mod source;
mod wav;

pub use device::{OutputDevice, find_output_device, list_output_devices};
pub use sink::CpalSink;
pub use source::FileSource;
pub use wav::{WavInfo, WavOutput, convert_raw_to_wav, probe_wav};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The file's sample encoding cannot be processed.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
