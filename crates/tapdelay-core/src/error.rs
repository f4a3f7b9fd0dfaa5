//! Error types for the delay engine.

use std::path::PathBuf;
use thiserror::Error;

/// Rejected effect parameters or engine geometry.
///
/// Parameter errors are reported to the user and leave the previous value in
/// place; geometry errors abort session setup before any audio is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The value did not parse as a non-negative integer.
    #[error("invalid value entered")]
    InvalidValue(String),

    /// A boolean setter received something other than `0` or `1`.
    #[error("invalid value entered (valid values are \"0\" and \"1\")")]
    NotBoolean(u32),

    /// `n_delay * n_taps` would reach past the history buffer.
    #[error("delay time value is too big")]
    DelayTooBig {
        /// Requested delay in frames.
        n_delay: u32,
        /// Tap count the delay was validated against.
        n_taps: u32,
        /// History capacity in frames.
        history_frames: usize,
    },

    /// The tap count would reach past the history buffer or the accumulator limit.
    #[error("number of feedback loops is too big")]
    TapsTooBig {
        /// Requested tap count.
        n_taps: u32,
        /// Delay the tap count was validated against.
        n_delay: u32,
        /// History capacity in frames.
        history_frames: usize,
    },

    /// The history capacity is not a whole number of segments.
    #[error("history size {history_frames} is not a multiple of the period size {segment_frames}")]
    MisalignedHistory {
        /// History capacity in frames.
        history_frames: usize,
        /// Segment (device period) size in frames.
        segment_frames: usize,
    },

    /// Staging buffers need one segment to fill and one to play.
    #[error("at least 2 staging segments are required, got {0}")]
    TooFewStagingSegments(usize),

    /// Zero-sized segments, histories, or channel counts.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// A history lookup that cannot be answered from the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LookbackError {
    /// The delay would alias onto frames from a different wrap.
    #[error("lookback of {delay} frames exceeds history of {capacity} frames")]
    DelayOutOfRange {
        /// Requested delay in frames.
        delay: usize,
        /// History capacity in frames.
        capacity: usize,
    },

    /// The starting frame lies outside the ring address space.
    #[error("frame {frame} is outside history of {capacity} frames")]
    FrameOutOfRange {
        /// Requested global frame index.
        frame: usize,
        /// History capacity in frames.
        capacity: usize,
    },
}

/// Unrecoverable playback device failures.
///
/// Underruns are not errors: sinks report them through
/// [`WriteStatus::Underrun`](crate::WriteStatus::Underrun).
#[derive(Debug, Error)]
pub enum SinkError {
    /// The device failed while streaming.
    #[error("audio device error: {0}")]
    Device(String),

    /// The sink was used after [`close`](crate::AudioSink::close).
    #[error("audio device is closed")]
    Closed,
}

/// Errors produced while setting up or running a session.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid parameters or engine geometry.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fatal playback device failure.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// A buffer could not be allocated during setup.
    #[error("failed to allocate {samples} samples for the {buffer} buffer")]
    Allocation {
        /// Which buffer failed.
        buffer: &'static str,
        /// Requested size in samples.
        samples: usize,
    },

    /// Failed to read a configuration file.
    #[error("failed to read file '{path}': {source}")]
    ReadConfig {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML configuration.
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Offline output could not be written.
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),

    /// A cycle worker could not be started or panicked.
    #[error("worker thread failed: {0}")]
    Worker(String),
}

impl Error {
    /// Create a read config error.
    pub fn read_config(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::ReadConfig {
            path: path.into(),
            source,
        }
    }
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
