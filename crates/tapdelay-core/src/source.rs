//! Random-access audio sources and the sequential segment reader.

use crate::sample::{Sample, encode_le};
use std::io;
use std::ops::Range;

/// Random-access byte source holding interleaved little-endian PCM.
///
/// Frames are `channels * bytes_per_sample` bytes; the audio occupies the
/// byte range returned by [`data_range`](Self::data_range), which may sit
/// inside a larger container (e.g. after a WAV header).
pub trait AudioSource: Send {
    /// Read up to `buf.len()` bytes starting at absolute byte `offset`.
    ///
    /// Returns the number of bytes read; `0` means end of data.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Declared `[data_begin, data_end)` byte range of the audio payload.
    fn data_range(&self) -> Range<u64>;
}

impl<T: AudioSource + ?Sized> AudioSource for Box<T> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }

    fn data_range(&self) -> Range<u64> {
        (**self).data_range()
    }
}

/// In-memory source, mostly useful for tests and offline rendering of
/// generated material.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    bytes: Vec<u8>,
    range: Range<u64>,
}

impl MemorySource {
    /// Treat the whole buffer as audio data.
    pub fn new(bytes: Vec<u8>) -> Self {
        let range = 0..bytes.len() as u64;
        Self { bytes, range }
    }

    /// Audio data occupying only `range` of the buffer.
    pub fn with_range(bytes: Vec<u8>, range: Range<u64>) -> Self {
        Self { bytes, range }
    }

    /// Encode interleaved samples into a new source.
    pub fn from_samples<S: Sample>(samples: &[S]) -> Self {
        Self::new(encode_le(samples))
    }
}

impl AudioSource for MemorySource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.bytes.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.bytes.len() - start);
        buf[..n].copy_from_slice(&self.bytes[start..start + n]);
        Ok(n)
    }

    fn data_range(&self) -> Range<u64> {
        self.range.clone()
    }
}

/// Sequential segment reader over an [`AudioSource`].
///
/// Owns the source cursor (`source_position`). Every call consumes one full
/// segment worth of bytes, zero-filling whatever the source could not
/// provide. A failed read is logged and treated as end of stream.
pub struct SourceReader<R> {
    source: R,
    position: u64,
    end: u64,
    exhausted: bool,
    scratch: Vec<u8>,
}

impl<R: AudioSource> SourceReader<R> {
    /// Start reading at the beginning of the declared data range.
    pub fn new(source: R) -> Self {
        let range = source.data_range();
        Self {
            source,
            position: range.start,
            end: range.end,
            exhausted: range.start >= range.end,
            scratch: Vec::new(),
        }
    }

    /// Current absolute byte offset.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether the cursor has reached the end of data.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted || self.position >= self.end
    }

    /// Bytes of audio data left to read.
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.position)
    }

    /// Fill `dst` with the next segment of samples.
    ///
    /// Returns `false` without touching `dst` when the cursor had already
    /// reached the end of data.
    pub fn read_segment<S: Sample>(&mut self, dst: &mut [S]) -> bool {
        if self.is_exhausted() {
            self.exhausted = true;
            return false;
        }

        let wanted = dst.len() * S::BYTES;
        if self.scratch.len() < wanted {
            self.scratch.resize(wanted, 0);
        }
        let available = self.remaining().min(wanted as u64) as usize;
        let scratch = &mut self.scratch[..wanted];
        scratch.fill(0);

        let mut filled = 0;
        while filled < available {
            let offset = self.position + filled as u64;
            match self.source.read_at(offset, &mut scratch[filled..available]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!(offset, error = %e, "source read failed, ending stream");
                    break;
                }
            }
        }
        if filled < available {
            self.exhausted = true;
        }

        for (sample, bytes) in dst.iter_mut().zip(scratch.chunks_exact(S::BYTES)) {
            *sample = S::from_le_bytes(bytes);
        }
        self.position += wanted as u64;
        true
    }

    /// Give back the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }
}
