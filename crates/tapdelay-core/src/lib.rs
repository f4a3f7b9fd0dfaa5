//! Tapdelay Core - integer multi-tap delay engine
//!
//! This crate implements a real-time echo effect over integer PCM: a ring of
//! recent input frames, a multi-tap kernel that looks back into it, and a
//! playback cycle that overlaps device writes with loading and processing
//! the next segment.
//!
//! # Core Abstractions
//!
//! ## Buffers
//!
//! - [`RingHistory`] - Segmented circular store of input frames with wrap-aware lookback
//! - [`StagingBuffer`] - N-segment output buffer with rotating `load`/`play` roles
//!
//! ## Processing
//!
//! - [`DelayKernel`] - Multi-tap delay over one segment, frozen to one parameter snapshot
//! - [`render_offline`] - Same kernel run sequentially over a whole source
//!
//! ## Live Control
//!
//! - [`ParameterStore`] - Lock-free packed parameter cell read once per cycle
//! - [`ControlChannel`] / [`ControlLoop`] - Line commands (`setnd:`, `setnf:`, ...) applied to the store
//! - [`StopSignal`] - Shared cooperative stop flag
//!
//! ## Playback
//!
//! - [`PlaybackEngine`] - Preload/Running/Stopping/Stopped state machine
//! - [`AudioSource`] / [`AudioSink`] - Seams to files and devices (see `tapdelay-io`)
//! - [`FormatSession`] - Picks the 16- or 24-bit engine once per session
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tapdelay_core::{
//!     CaptureSink, EffectParameters, MemorySource, ParameterStore, PlaybackEngine, StopSignal,
//! };
//!
//! let input: Vec<i16> = (0..4096).map(|i| ((i % 64) * 100) as i16).collect();
//! let params = Arc::new(ParameterStore::new(EffectParameters::STARTUP, 65536).unwrap());
//!
//! let mut engine = PlaybackEngine::new(
//!     MemorySource::from_samples(&input),
//!     CaptureSink::<i16>::new(256, 2),
//!     params,
//!     StopSignal::new(),
//!     2,
//! )
//! .unwrap();
//!
//! let stats = engine.run().unwrap();
//! assert_eq!(stats.segments_played, 8);
//! ```
//!
//! # Arithmetic
//!
//! All per-sample math is `i32` with truncating division and hard clipping
//! to the sample type's range. No floating point is used outside
//! [`Sample::to_f32`], which exists only for float-only output devices.

pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod history;
pub mod kernel;
pub mod offline;
pub mod param;
pub mod sample;
pub mod sink;
pub mod source;
pub mod staging;
pub mod stop;

// Re-export main types at crate root
pub use config::{DEFAULT_PERIOD_FRAMES, EngineConfig};
pub use control::{
    CONTROL_POLL_INTERVAL, Command, CommandError, ControlChannel, ControlLoop, Reply,
    spawn_line_reader,
};
pub use engine::{FormatSession, PlaybackEngine, PlaybackState, PlaybackStats};
pub use error::{ConfigError, Error, LookbackError, Result, SinkError};
pub use history::{DEFAULT_HISTORY_FRAMES, RingHistory, lookback_index};
pub use kernel::{DelayKernel, tap_divisor, tap_polarity};
pub use offline::render_offline;
pub use param::{DivisorGrowth, EffectParameters, MAX_TAPS, ParameterStore};
pub use sample::{I24, Sample, SampleFormat, decode_le, encode_le, saturate};
pub use sink::{AudioSink, CaptureSink, WriteStatus};
pub use source::{AudioSource, MemorySource, SourceReader};
pub use staging::{DEFAULT_STAGING_SEGMENTS, StagingBuffer};
pub use stop::StopSignal;
