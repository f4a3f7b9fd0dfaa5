//! Integer multi-tap delay kernel.
//!
//! For every frame `g` of the segment being produced and every channel:
//!
//! ```text
//! acc = x[g]
//! for tap in 1..=n_taps:
//!     acc += polarity(tap) * x[g - tap * n_delay] / divisor(tap)
//! out = saturate(acc / 2)
//! ```
//!
//! All arithmetic is `i32` with truncating division. Lookbacks wrap around
//! the [`RingHistory`]. A kernel is built from one parameter snapshot and
//! processes a whole segment with it, so a parameter change never lands in
//! the middle of a segment.

use crate::history::{RingHistory, lookback_index};
use crate::param::{DivisorGrowth, EffectParameters};
use crate::sample::Sample;

/// Attenuation divisor for `tap` (1-based).
///
/// Returns `None` once the divisor no longer fits a positive `i32`, which
/// ends the tap loop for exponential growth past tap 30.
#[inline]
pub fn tap_divisor(tap: u32, growth: DivisorGrowth) -> Option<i32> {
    match growth {
        DivisorGrowth::Linear => i32::try_from(tap).ok()?.checked_add(1),
        DivisorGrowth::Exponential => 1i32.checked_shl(tap).filter(|d| *d > 0),
    }
}

/// Sign applied to `tap` (1-based): odd taps are inverted when alternating.
#[inline]
pub fn tap_polarity(tap: u32, alt_polarity: bool) -> i32 {
    if alt_polarity && tap % 2 == 1 { -1 } else { 1 }
}

/// The delay effect, frozen to one parameter snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayKernel {
    params: EffectParameters,
}

impl DelayKernel {
    /// Kernel for a parameter snapshot.
    pub fn new(params: EffectParameters) -> Self {
        Self { params }
    }

    /// Parameters this kernel applies.
    pub fn params(&self) -> EffectParameters {
        self.params
    }

    /// Process the history's current segment into `out`.
    ///
    /// `out` must hold one segment of interleaved samples. With
    /// `n_taps == 0` the input is copied through unchanged.
    pub fn process_segment<S: Sample>(&self, history: &RingHistory<S>, out: &mut [S]) {
        let input = history.current_segment();
        debug_assert_eq!(input.len(), out.len());

        if self.params.n_taps == 0 {
            out.copy_from_slice(input);
            return;
        }

        let channels = history.channels();
        let base = history.base_frame();
        for (f, (in_frame, out_frame)) in input
            .chunks_exact(channels)
            .zip(out.chunks_exact_mut(channels))
            .enumerate()
        {
            let g = base + f;
            for (c, (x, y)) in in_frame.iter().zip(out_frame.iter_mut()).enumerate() {
                let acc = self.accumulate(history, g, c, x.to_i32());
                *y = S::saturate(acc / 2);
            }
        }
    }

    /// Sum the dry sample and every tap for channel `c` of frame `g`.
    #[inline]
    fn accumulate<S: Sample>(&self, history: &RingHistory<S>, g: usize, c: usize, dry: i32) -> i32 {
        let EffectParameters {
            n_delay,
            n_taps,
            alt_polarity,
            divisor_growth,
        } = self.params;
        let capacity = history.capacity();

        let mut acc = dry;
        for tap in 1..=n_taps {
            let Some(div) = tap_divisor(tap, divisor_growth) else {
                break;
            };
            let delay = u64::from(tap) * u64::from(n_delay);
            let Ok(delay) = usize::try_from(delay) else {
                break;
            };
            let Ok(prev) = lookback_index(capacity, g, delay) else {
                break;
            };
            let x = history.frame(prev)[c].to_i32();
            acc += tap_polarity(tap, alt_polarity) * x / div;
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::I24;
    use crate::source::{MemorySource, SourceReader};

    fn run<S: Sample>(
        params: EffectParameters,
        history_frames: usize,
        segment_frames: usize,
        channels: usize,
        input: &[S],
    ) -> Vec<S> {
        let mut reader = SourceReader::new(MemorySource::from_samples(input));
        let mut history = RingHistory::<S>::new(history_frames, segment_frames, channels).unwrap();
        let kernel = DelayKernel::new(params);
        let mut out = Vec::new();
        let mut seg = vec![S::default(); segment_frames * channels];
        while history.load_next_segment(&mut reader) {
            kernel.process_segment(&history, &mut seg);
            out.extend_from_slice(&seg);
            history.advance();
        }
        out
    }

    fn single_tap(n_delay: u32) -> EffectParameters {
        EffectParameters {
            n_delay,
            n_taps: 1,
            alt_polarity: false,
            divisor_growth: DivisorGrowth::Linear,
        }
    }

    #[test]
    fn single_tap_echo() {
        let input: Vec<i16> = (1..=8).map(|i| i * 100).collect();
        let out = run(single_tap(4), 16, 8, 1, &input);
        assert_eq!(out, vec![50, 100, 150, 200, 275, 350, 425, 500]);
    }

    #[test]
    fn echo_reaches_across_segments() {
        let input: Vec<i16> = (1..=8).map(|i| i * 100).collect();
        let out = run(single_tap(4), 16, 2, 1, &input);
        assert_eq!(out, vec![50, 100, 150, 200, 275, 350, 425, 500]);
    }

    #[test]
    fn echo_wraps_around_history() {
        // Frame 8 wraps onto segment 0 of an 8-frame ring and looks back 2
        // frames to frames 6 and 7 of the previous pass.
        let input: Vec<i16> = (1..=10).map(|i| i * 10).collect();
        let out = run(single_tap(2), 8, 2, 1, &input);
        assert_eq!(out[8], (90 + 70 / 2) / 2);
        assert_eq!(out[9], (100 + 80 / 2) / 2);
    }

    #[test]
    fn channels_are_independent() {
        let input: Vec<i16> = vec![100, -100, 200, -200, 300, -300, 400, -400];
        let out = run(single_tap(1), 8, 4, 2, &input);
        assert_eq!(out, vec![50, -50, 125, -125, 200, -200, 275, -275]);
    }

    #[test]
    fn alternating_polarity_inverts_odd_taps() {
        let params = EffectParameters {
            n_delay: 1,
            n_taps: 2,
            alt_polarity: true,
            divisor_growth: DivisorGrowth::Linear,
        };
        let input: Vec<i16> = vec![0, 0, 600, 0];
        let out = run(params, 8, 4, 1, &input);
        // frame 3: x=0, tap1 -(600/2), tap2 +(0/3)
        assert_eq!(out, vec![0, 0, 300, -150]);
    }

    #[test]
    fn exponential_divisors() {
        let params = EffectParameters {
            n_delay: 1,
            n_taps: 3,
            alt_polarity: false,
            divisor_growth: DivisorGrowth::Exponential,
        };
        let input: Vec<i16> = vec![800, 0, 0, 0];
        let out = run(params, 8, 4, 1, &input);
        assert_eq!(out, vec![400, 200, 100, 50]);
    }

    #[test]
    fn output_saturates() {
        let params = EffectParameters {
            n_delay: 0,
            n_taps: 4,
            alt_polarity: false,
            divisor_growth: DivisorGrowth::Linear,
        };
        let out = run(params, 8, 4, 1, &[i16::MAX; 4]);
        assert!(out.iter().all(|&s| s == i16::MAX));
        let out = run(params, 8, 4, 1, &[i16::MIN; 4]);
        assert!(out.iter().all(|&s| s == i16::MIN));
    }

    #[test]
    fn i24_saturates_at_its_own_bounds() {
        let params = EffectParameters {
            n_delay: 0,
            n_taps: 4,
            alt_polarity: false,
            divisor_growth: DivisorGrowth::Linear,
        };
        let out = run(params, 8, 4, 1, &[I24::MAX; 4]);
        assert!(out.iter().all(|&s| s == I24::MAX));
    }

    #[test]
    fn zero_taps_is_pass_through() {
        let params = EffectParameters {
            n_taps: 0,
            ..EffectParameters::STARTUP
        };
        let input: Vec<i16> = vec![1, -2, 3, -4];
        assert_eq!(run(params, 8, 4, 1, &input), input);
    }

    #[test]
    fn divisor_sequences() {
        assert_eq!(tap_divisor(1, DivisorGrowth::Linear), Some(2));
        assert_eq!(tap_divisor(20, DivisorGrowth::Linear), Some(21));
        assert_eq!(tap_divisor(1, DivisorGrowth::Exponential), Some(2));
        assert_eq!(tap_divisor(30, DivisorGrowth::Exponential), Some(1 << 30));
        assert_eq!(tap_divisor(31, DivisorGrowth::Exponential), None);
        assert_eq!(tap_divisor(40, DivisorGrowth::Exponential), None);
    }

    #[test]
    fn polarity_sequence() {
        assert_eq!(tap_polarity(1, true), -1);
        assert_eq!(tap_polarity(2, true), 1);
        assert_eq!(tap_polarity(1, false), 1);
    }
}
