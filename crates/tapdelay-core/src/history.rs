//! Segmented ring buffer of decoded input frames.
//!
//! The history covers `capacity` frames split into equally sized segments
//! matching the device period. Each cycle loads the next segment from the
//! source and the delay kernel reads earlier frames through
//! [`lookback_index`], which wraps around the ring.
//!
//! ```text
//!  segment:   0        1        2        3
//!          [........|........|xxxxxxxx|........]
//!                              ^ current (being processed)
//!          frames before `current` are reached by walking left and
//!          wrapping past 0 to the end of the ring
//! ```

use crate::error::{ConfigError, Error, LookbackError, Result};
use crate::sample::Sample;
use crate::source::{AudioSource, SourceReader};

/// Default history capacity in frames.
pub const DEFAULT_HISTORY_FRAMES: usize = 65536;

/// Wrap-aware global frame index `delay` frames before `current`.
///
/// Both frames live in a circular address space of `capacity` frames.
/// Rejects delays that would alias onto a different wrap and start frames
/// outside the ring.
///
/// ```rust
/// use tapdelay_core::lookback_index;
///
/// assert_eq!(lookback_index(8, 2, 5), Ok(5));
/// assert_eq!(lookback_index(8, 6, 5), Ok(1));
/// assert!(lookback_index(8, 2, 8).is_err());
/// ```
#[inline]
pub fn lookback_index(
    capacity: usize,
    current: usize,
    delay: usize,
) -> core::result::Result<usize, LookbackError> {
    if delay >= capacity {
        return Err(LookbackError::DelayOutOfRange { delay, capacity });
    }
    if current >= capacity {
        return Err(LookbackError::FrameOutOfRange {
            frame: current,
            capacity,
        });
    }
    Ok((current + capacity - delay) % capacity)
}

/// Fixed-capacity circular store of interleaved input frames.
///
/// One contiguous allocation of `capacity * channels` samples. Segments are
/// addressed by index arithmetic only; nothing is copied when the ring
/// advances.
#[derive(Debug, Clone)]
pub struct RingHistory<S> {
    samples: Vec<S>,
    channels: usize,
    capacity: usize,
    segment_frames: usize,
    segment_index: usize,
}

impl<S: Sample> RingHistory<S> {
    /// Allocate a zeroed history.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Zero`] for a zero capacity, segment size or channel count
    /// - [`ConfigError::MisalignedHistory`] if `capacity` is not a multiple of
    ///   `segment_frames`
    /// - [`Error::Allocation`] if the buffer cannot be reserved
    pub fn new(capacity: usize, segment_frames: usize, channels: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ConfigError::Zero("history size").into());
        }
        if segment_frames == 0 {
            return Err(ConfigError::Zero("period size").into());
        }
        if channels == 0 {
            return Err(ConfigError::Zero("channel count").into());
        }
        if capacity % segment_frames != 0 {
            return Err(ConfigError::MisalignedHistory {
                history_frames: capacity,
                segment_frames,
            }
            .into());
        }

        let len = capacity
            .checked_mul(channels)
            .ok_or(Error::Allocation {
                buffer: "history",
                samples: usize::MAX,
            })?;
        let samples = zeroed(len, "history")?;

        Ok(Self {
            samples,
            channels,
            capacity,
            segment_frames,
            segment_index: 0,
        })
    }

    /// Capacity in frames (`H`).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames per segment.
    pub fn segment_frames(&self) -> usize {
        self.segment_frames
    }

    /// Number of segments in the ring (`H / segment_frames`).
    pub fn segment_count(&self) -> usize {
        self.capacity / self.segment_frames
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Index of the segment the next load writes and the kernel reads.
    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    /// Global frame index of the first frame in the current segment.
    pub fn base_frame(&self) -> usize {
        self.segment_index * self.segment_frames
    }

    /// Locate the frame `delay` frames before `current` as
    /// `(segment_index, frame_within_segment)`.
    pub fn lookback(
        &self,
        current: usize,
        delay: usize,
    ) -> core::result::Result<(usize, usize), LookbackError> {
        let prev = lookback_index(self.capacity, current, delay)?;
        Ok((prev / self.segment_frames, prev % self.segment_frames))
    }

    /// All channels of the frame at global index `frame`.
    ///
    /// # Panics
    ///
    /// Panics if `frame >= capacity`.
    #[inline]
    pub fn frame(&self, frame: usize) -> &[S] {
        let start = frame * self.channels;
        &self.samples[start..start + self.channels]
    }

    /// Interleaved samples of segment `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= segment_count()`.
    pub fn segment(&self, index: usize) -> &[S] {
        let len = self.segment_frames * self.channels;
        &self.samples[index * len..(index + 1) * len]
    }

    /// Interleaved samples of the current segment.
    pub fn current_segment(&self) -> &[S] {
        self.segment(self.segment_index)
    }

    /// Mutable view of the current segment.
    pub fn current_segment_mut(&mut self) -> &mut [S] {
        let len = self.segment_frames * self.channels;
        let start = self.segment_index * len;
        &mut self.samples[start..start + len]
    }

    /// Fill the current segment with the next segment of source audio.
    ///
    /// Short reads are zero-filled. Returns `false` when the source had
    /// already reached its end, in which case the segment is left untouched.
    pub fn load_next_segment<R: AudioSource>(&mut self, reader: &mut SourceReader<R>) -> bool {
        reader.read_segment(self.current_segment_mut())
    }

    /// Move to the next segment, wrapping at the end of the ring.
    pub fn advance(&mut self) {
        self.segment_index = (self.segment_index + 1) % self.segment_count();
    }

    /// Zero the whole history and return to segment 0.
    pub fn reset(&mut self) {
        self.samples.fill(S::default());
        self.segment_index = 0;
    }
}

/// Allocate `len` default samples, reporting failure instead of aborting.
pub(crate) fn zeroed<S: Sample>(len: usize, buffer: &'static str) -> Result<Vec<S>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| Error::Allocation {
            buffer,
            samples: len,
        })?;
    v.resize(len, S::default());
    Ok(v)
}
