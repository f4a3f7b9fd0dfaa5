//! N-segment output staging buffer.
//!
//! Processed audio is written into the `load` segment while the device drains
//! the `play` segment. Both role indices advance together on
//! [`rotate`](StagingBuffer::rotate), with `play` always the segment right
//! after `load`, so after `N - 1` fills the `play` role points at the oldest
//! processed segment.

use crate::error::{ConfigError, Result};
use crate::history::zeroed;
use crate::sample::Sample;

/// Default number of staging segments (double buffering).
pub const DEFAULT_STAGING_SEGMENTS: usize = 2;

/// Contiguous ring of `segments` output segments.
#[derive(Debug, Clone)]
pub struct StagingBuffer<S> {
    samples: Vec<S>,
    segment_len: usize,
    segments: usize,
    load: usize,
}

impl<S: Sample> StagingBuffer<S> {
    /// Allocate `segments` zeroed segments of `segment_frames * channels`
    /// samples each.
    pub fn new(segments: usize, segment_frames: usize, channels: usize) -> Result<Self> {
        if segments < 2 {
            return Err(ConfigError::TooFewStagingSegments(segments).into());
        }
        if segment_frames == 0 {
            return Err(ConfigError::Zero("period size").into());
        }
        if channels == 0 {
            return Err(ConfigError::Zero("channel count").into());
        }
        let segment_len = segment_frames * channels;
        let samples = zeroed(segment_len * segments, "staging")?;
        Ok(Self {
            samples,
            segment_len,
            segments,
            load: 0,
        })
    }

    /// Number of segments (`N`).
    pub fn segment_count(&self) -> usize {
        self.segments
    }

    /// Samples per segment.
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Index of the segment being filled.
    pub fn load_index(&self) -> usize {
        self.load
    }

    /// Index of the segment being drained.
    pub fn play_index(&self) -> usize {
        (self.load + 1) % self.segments
    }

    /// The segment currently holding audio for the device.
    pub fn play(&self) -> &[S] {
        self.segment(self.play_index())
    }

    /// The segment currently being filled.
    pub fn load_mut(&mut self) -> &mut [S] {
        let start = self.load * self.segment_len;
        &mut self.samples[start..start + self.segment_len]
    }

    /// Segment `index` regardless of role.
    pub fn segment(&self, index: usize) -> &[S] {
        let start = index * self.segment_len;
        &self.samples[start..start + self.segment_len]
    }

    /// Borrow both roles at once: `(play, load)`.
    pub fn roles(&mut self) -> (&[S], &mut [S]) {
        let len = self.segment_len;
        let load = self.load * len;
        let play = self.play_index() * len;
        if load < play {
            let (head, tail) = self.samples.split_at_mut(play);
            (&tail[..len], &mut head[load..load + len])
        } else {
            let (head, tail) = self.samples.split_at_mut(load);
            (&head[play..play + len], &mut tail[..len])
        }
    }

    /// Advance both roles by one segment.
    #[inline]
    pub fn rotate(&mut self) {
        self.load = (self.load + 1) % self.segments;
    }
}
