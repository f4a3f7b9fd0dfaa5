//! WAV probing and writing.

use crate::{Error, Result};
use hound::{WavReader, WavWriter};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;
use tapdelay_core::{I24, Sample, SampleFormat, decode_le};

/// Frames converted per read in [`convert_raw_to_wav`].
const CONVERT_CHUNK_FRAMES: usize = 4096;

/// WAV file metadata plus the location of its PCM payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavInfo {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Integer sample encoding.
    pub format: SampleFormat,
    /// Byte range `[data_begin, data_end)` of the PCM data.
    pub data_range: Range<u64>,
    /// Frames in the file (samples per channel).
    pub frames: u64,
}

impl WavInfo {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / f64::from(self.sample_rate)
    }
}

/// Read the RIFF header of `path` without loading sample data.
///
/// Only integer PCM at 16 or 24 bits is accepted; float and other depths
/// are rejected with [`Error::UnsupportedFormat`].
pub fn probe_wav<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let file = File::open(path.as_ref())?;
    let reader = WavReader::new(BufReader::new(file))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int {
        return Err(Error::UnsupportedFormat(format!(
            "{}-bit float",
            spec.bits_per_sample
        )));
    }
    let format = SampleFormat::from_bits(spec.bits_per_sample).ok_or_else(|| {
        Error::UnsupportedFormat(format!("{}-bit integer PCM", spec.bits_per_sample))
    })?;
    if spec.channels == 0 {
        return Err(Error::UnsupportedFormat("zero channels".to_string()));
    }

    let samples = u64::from(reader.len());
    // hound stops right at the start of the data chunk.
    let mut inner = reader.into_inner();
    let data_begin = inner.stream_position()?;
    let data_end = data_begin + samples * format.bytes() as u64;

    // hound reports valid bits, not the container width, for extensible
    // headers. Only tightly packed samples can be read as raw PCM.
    if samples > 0 {
        let container = data_chunk_len(&mut inner, data_begin)? / samples;
        if container != format.bytes() as u64 {
            return Err(Error::UnsupportedFormat(format!(
                "{}-bit in {}-bit container",
                spec.bits_per_sample,
                container * 8
            )));
        }
    }

    let info = WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        format,
        data_range: data_begin..data_end,
        frames: samples / u64::from(spec.channels),
    };
    tracing::debug!(
        channels = info.channels,
        sample_rate = info.sample_rate,
        format = %info.format,
        data_begin,
        data_end,
        "probed WAV file"
    );
    Ok(info)
}

/// Size field of the data chunk whose payload starts at `data_begin`.
fn data_chunk_len<R: Read + Seek>(input: &mut R, data_begin: u64) -> Result<u64> {
    let size_at = data_begin
        .checked_sub(4)
        .ok_or_else(|| Error::UnsupportedFormat("truncated data chunk header".to_string()))?;
    input.seek(SeekFrom::Start(size_at))?;
    let mut size = [0u8; 4];
    input.read_exact(&mut size)?;
    Ok(u64::from(u32::from_le_bytes(size)))
}

/// Incremental writer for integer PCM WAV files.
pub struct WavOutput {
    writer: WavWriter<BufWriter<File>>,
    format: SampleFormat,
}

impl WavOutput {
    /// Create `path` with a canonical PCM header.
    pub fn create<P: AsRef<Path>>(
        path: P,
        channels: u16,
        sample_rate: u32,
        format: SampleFormat,
    ) -> Result<Self> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: format.bits(),
            sample_format: hound::SampleFormat::Int,
        };
        Ok(Self {
            writer: WavWriter::create(path, spec)?,
            format,
        })
    }

    /// Encoding of the samples being written.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Append interleaved samples.
    pub fn write<S: Sample>(&mut self, samples: &[S]) -> io::Result<()> {
        debug_assert_eq!(S::BITS, self.format.bits());
        for &s in samples {
            self.writer.write_sample(s.to_i32()).map_err(into_io)?;
        }
        Ok(())
    }

    /// Patch the header lengths and flush.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize()?;
        Ok(())
    }
}

fn into_io(err: hound::Error) -> io::Error {
    match err {
        hound::Error::IoError(e) => e,
        other => io::Error::other(other),
    }
}

/// Wrap headerless little-endian PCM in a WAV container.
///
/// Returns the number of frames written. Trailing bytes that do not form
/// a whole frame are dropped with a warning.
pub fn convert_raw_to_wav<P: AsRef<Path>, Q: AsRef<Path>>(
    raw: P,
    out: Q,
    channels: u16,
    bits: u16,
    sample_rate: u32,
) -> Result<u64> {
    let format = SampleFormat::from_bits(bits)
        .ok_or_else(|| Error::UnsupportedFormat(format!("{bits}-bit integer PCM")))?;
    if channels == 0 {
        return Err(Error::UnsupportedFormat("zero channels".to_string()));
    }

    let input = BufReader::new(File::open(raw.as_ref())?);
    let mut output = WavOutput::create(out, channels, sample_rate, format)?;
    let frames = match format {
        SampleFormat::I16 => copy_frames::<i16, _>(input, &mut output, channels)?,
        SampleFormat::I24 => copy_frames::<I24, _>(input, &mut output, channels)?,
    };
    output.finalize()?;

    tracing::info!(frames, channels, bits, sample_rate, "converted raw PCM to WAV");
    Ok(frames)
}

fn copy_frames<S: Sample, R: Read>(
    mut input: R,
    output: &mut WavOutput,
    channels: u16,
) -> Result<u64> {
    let frame_bytes = S::BYTES * usize::from(channels);
    let mut buf = vec![0u8; frame_bytes * CONVERT_CHUNK_FRAMES];
    let mut frames = 0u64;

    loop {
        let filled = fill(&mut input, &mut buf)?;
        let whole = filled - filled % frame_bytes;
        output.write(&decode_le::<S>(&buf[..whole]))?;
        frames += (whole / frame_bytes) as u64;

        if filled < buf.len() {
            if whole < filled {
                tracing::warn!(
                    dropped_bytes = filled - whole,
                    "raw input ends with a partial frame"
                );
            }
            return Ok(frames);
        }
    }
}

/// Read until `buf` is full or the input ends.
fn fill<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
