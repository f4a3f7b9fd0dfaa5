//! Integer PCM sample types.
//!
//! The engine is generic over [`Sample`]; each implementation carries its own
//! saturation bounds and little-endian wire encoding. [`SampleFormat`] is the
//! runtime tag used to pick an implementation once per session.
//!
//! | Type | Bits | Bytes | Range |
//! |------|------|-------|-------|
//! | `i16` | 16 | 2 | -32768 ..= 32767 |
//! | [`I24`] | 24 | 3 | -8388608 ..= 8388607 |
//!
//! All arithmetic happens in an `i32` accumulator, which is strictly wider
//! than either sample width.

use core::fmt;

/// A signed integer PCM sample.
pub trait Sample: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Significant bits per sample.
    const BITS: u16;
    /// Encoded size in bytes.
    const BYTES: usize;
    /// Smallest representable value.
    const MIN: i32;
    /// Largest representable value.
    const MAX: i32;

    /// Sign-extend into the accumulator width.
    fn to_i32(self) -> i32;

    /// Hard-clip an accumulator value into range.
    fn saturate(acc: i32) -> Self;

    /// Decode from exactly [`Self::BYTES`] little-endian bytes.
    fn from_le_bytes(bytes: &[u8]) -> Self;

    /// Encode into exactly [`Self::BYTES`] little-endian bytes.
    fn write_le_bytes(self, out: &mut [u8]);

    /// Normalize to `[-1.0, 1.0)` for devices that only take float streams.
    #[inline]
    fn to_f32(self) -> f32 {
        self.to_i32() as f32 / -(Self::MIN as f32)
    }
}

/// Clamp `acc` into `[min, max]` without wrapping.
#[inline]
pub fn saturate(acc: i32, min: i32, max: i32) -> i32 {
    acc.clamp(min, max)
}

impl Sample for i16 {
    const BITS: u16 = 16;
    const BYTES: usize = 2;
    const MIN: i32 = i16::MIN as i32;
    const MAX: i32 = i16::MAX as i32;

    #[inline]
    fn to_i32(self) -> i32 {
        i32::from(self)
    }

    #[inline]
    fn saturate(acc: i32) -> Self {
        saturate(acc, <Self as Sample>::MIN, <Self as Sample>::MAX) as i16
    }

    #[inline]
    fn from_le_bytes(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }

    #[inline]
    fn write_le_bytes(self, out: &mut [u8]) {
        out[..2].copy_from_slice(&self.to_le_bytes());
    }
}

/// A 24-bit sample stored in the low bits of an `i32`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct I24(i32);

impl I24 {
    /// Largest 24-bit value.
    pub const MAX: I24 = I24(0x7f_ffff);
    /// Smallest 24-bit value.
    pub const MIN: I24 = I24(-0x80_0000);

    /// Wrap a value, returning `None` when it does not fit in 24 bits.
    pub fn new(value: i32) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0)
            .contains(&value)
            .then_some(Self(value))
    }

    /// The sign-extended value.
    #[inline]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for I24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Sample for I24 {
    const BITS: u16 = 24;
    const BYTES: usize = 3;
    const MIN: i32 = I24::MIN.0;
    const MAX: i32 = I24::MAX.0;

    #[inline]
    fn to_i32(self) -> i32 {
        self.0
    }

    #[inline]
    fn saturate(acc: i32) -> Self {
        I24(saturate(
            acc,
            <Self as Sample>::MIN,
            <Self as Sample>::MAX,
        ))
    }

    #[inline]
    fn from_le_bytes(bytes: &[u8]) -> Self {
        // Place the three bytes in the top of the word, then shift back down
        // arithmetically to sign-extend.
        I24(i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8)
    }

    #[inline]
    fn write_le_bytes(self, out: &mut [u8]) {
        out[..3].copy_from_slice(&self.0.to_le_bytes()[..3]);
    }
}

/// Runtime tag for the supported sample types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// 16-bit signed little-endian.
    I16,
    /// 24-bit signed little-endian, packed in 3 bytes.
    I24,
}

impl SampleFormat {
    /// Pick the format for a PCM bit depth.
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            16 => Some(Self::I16),
            24 => Some(Self::I24),
            _ => None,
        }
    }

    /// Bits per sample.
    pub fn bits(self) -> u16 {
        match self {
            Self::I16 => <i16 as Sample>::BITS,
            Self::I24 => <I24 as Sample>::BITS,
        }
    }

    /// Bytes per encoded sample.
    pub fn bytes(self) -> usize {
        match self {
            Self::I16 => <i16 as Sample>::BYTES,
            Self::I24 => <I24 as Sample>::BYTES,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I16 => f.write_str("16-bit PCM"),
            Self::I24 => f.write_str("24-bit PCM"),
        }
    }
}

/// Decode a little-endian byte buffer into samples.
///
/// Trailing bytes that do not form a whole sample are ignored.
pub fn decode_le<S: Sample>(bytes: &[u8]) -> Vec<S> {
    bytes.chunks_exact(S::BYTES).map(S::from_le_bytes).collect()
}

/// Encode samples into a little-endian byte buffer.
pub fn encode_le<S: Sample>(samples: &[S]) -> Vec<u8> {
    let mut bytes = vec![0u8; samples.len() * S::BYTES];
    for (sample, out) in samples.iter().zip(bytes.chunks_exact_mut(S::BYTES)) {
        sample.write_le_bytes(out);
    }
    bytes
}
