//! Single-pass file-to-file rendering.
//!
//! Runs the same ring history and kernel as a live session, one segment at a
//! time on the calling thread, handing each processed segment to a callback.

use crate::config::EngineConfig;
use crate::error::{ConfigError, Error, Result};
use crate::history::RingHistory;
use crate::kernel::DelayKernel;
use crate::param::EffectParameters;
use crate::sample::Sample;
use crate::source::{AudioSource, SourceReader};
use std::io;

/// Process all of `source` with fixed `params`.
///
/// `emit` receives interleaved processed samples in order; the total
/// equals the whole frames in the source, with the zero-filled tail of the
/// last segment dropped. Returns the number of frames emitted.
pub fn render_offline<S, R, F>(
    source: R,
    channels: usize,
    params: EffectParameters,
    config: &EngineConfig,
    mut emit: F,
) -> Result<u64>
where
    S: Sample,
    R: AudioSource,
    F: FnMut(&[S]) -> io::Result<()>,
{
    params.validate(config.history_frames)?;
    if channels == 0 {
        return Err(ConfigError::Zero("channel count").into());
    }

    let range = source.data_range();
    let frame_bytes = (channels * S::BYTES) as u64;
    let total_frames = range.end.saturating_sub(range.start) / frame_bytes;

    let mut history = RingHistory::<S>::new(config.history_frames, config.period_frames, channels)?;
    let mut reader = SourceReader::new(source);
    let kernel = DelayKernel::new(params);
    let mut out = vec![S::default(); config.period_frames * channels];

    tracing::debug!(total_frames, channels, bits = S::BITS, "offline render");

    let mut remaining = total_frames;
    while remaining > 0 && history.load_next_segment(&mut reader) {
        kernel.process_segment(&history, &mut out);
        let frames = remaining.min(config.period_frames as u64) as usize;
        emit(&out[..frames * channels]).map_err(Error::Output)?;
        remaining -= frames as u64;
        history.advance();
    }

    Ok(total_frames - remaining)
}
