//! Seekable file-backed audio source.

use crate::Result;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;
use tapdelay_core::AudioSource;

/// Interleaved PCM read directly from a file at absolute byte offsets.
///
/// The declared data range is clamped to the file's length, so a header
/// that overstates its payload never makes reads run past the end.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    range: Range<u64>,
}

impl FileSource {
    /// Open `path` with audio occupying `range`.
    pub fn open<P: AsRef<Path>>(path: P, range: Range<u64>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let end = range.end.min(len);
        let start = range.start.min(end);
        if end < range.end {
            tracing::warn!(
                path = %path.display(),
                declared_end = range.end,
                file_len = len,
                "data range extends past end of file, truncating"
            );
        }
        Ok(Self {
            file,
            range: start..end,
        })
    }

    /// Open a headerless file; every byte is audio.
    pub fn open_raw<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path, 0..u64::MAX)
    }
}

impl AudioSource for FileSource {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read(buf)
    }

    fn data_range(&self) -> Range<u64> {
        self.range.clone()
    }
}
