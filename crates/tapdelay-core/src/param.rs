//! Effect parameters and the lock-free store shared with the control thread.
//!
//! [`EffectParameters`] is a plain value. [`ParameterStore`] packs the whole
//! set into a single `AtomicU64`, so the engine reads a consistent snapshot
//! once per cycle while the control thread replaces fields without locking.
//!
//! # Packed layout
//!
//! | Bits | Field |
//! |------|-------|
//! | 0..32 | `n_delay` |
//! | 32..48 | `n_taps` |
//! | 48 | `alt_polarity` |
//! | 49 | `divisor_growth` (set = exponential) |

use crate::error::ConfigError;
use core::convert::Infallible;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Largest accepted tap count.
///
/// Keeps the summed tap contributions inside the `i32` accumulator for every
/// sample width and fits the packed 16-bit field.
pub const MAX_TAPS: u32 = u16::MAX as u32;

const TAPS_SHIFT: u32 = 32;
const ALT_BIT: u64 = 1 << 48;
const EXP_BIT: u64 = 1 << 49;

/// How quickly successive taps get quieter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivisorGrowth {
    /// Tap `k` is divided by `k + 1`.
    #[default]
    Linear,
    /// Tap `k` is divided by `2^k`.
    Exponential,
}

impl DivisorGrowth {
    /// Console label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Linear => "by one",
            Self::Exponential => "exponential",
        }
    }
}

/// Live parameters of the multi-tap delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectParameters {
    /// Base delay between taps, in frames.
    pub n_delay: u32,
    /// Number of delayed taps. `0` bypasses the effect.
    pub n_taps: u32,
    /// Invert odd-numbered taps.
    pub alt_polarity: bool,
    /// Per-tap attenuation policy.
    pub divisor_growth: DivisorGrowth,
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self::STARTUP
    }
}

impl EffectParameters {
    /// Preset active when a session starts: 240 frames, 20 feedback loops,
    /// alternating polarity, linear divisors.
    pub const STARTUP: Self = Self {
        n_delay: 240,
        n_taps: 21,
        alt_polarity: true,
        divisor_growth: DivisorGrowth::Linear,
    };

    /// Taps beyond the first, as shown to users.
    pub fn feedback_loops(&self) -> u32 {
        self.n_taps.saturating_sub(1)
    }

    /// Longest lookback the kernel will perform, in frames.
    pub fn max_lookback(&self) -> u64 {
        u64::from(self.n_delay) * u64::from(self.n_taps)
    }

    /// Check the full parameter set against a history of `history_frames`.
    pub fn validate(&self, history_frames: usize) -> Result<(), ConfigError> {
        if self.n_taps > MAX_TAPS {
            return Err(self.taps_too_big(history_frames));
        }
        if self.max_lookback() >= history_frames as u64 {
            return Err(ConfigError::DelayTooBig {
                n_delay: self.n_delay,
                n_taps: self.n_taps,
                history_frames,
            });
        }
        Ok(())
    }

    /// Copy with a new base delay, validated against the current tap count.
    pub fn with_n_delay(self, n_delay: u32, history_frames: usize) -> Result<Self, ConfigError> {
        let next = Self { n_delay, ..self };
        if next.max_lookback() >= history_frames as u64 {
            return Err(ConfigError::DelayTooBig {
                n_delay,
                n_taps: self.n_taps,
                history_frames,
            });
        }
        Ok(next)
    }

    /// Copy with `loops + 1` taps, validated against the current delay.
    pub fn with_feedback_loops(
        self,
        loops: u32,
        history_frames: usize,
    ) -> Result<Self, ConfigError> {
        let next = Self {
            n_taps: loops.saturating_add(1),
            ..self
        };
        if loops >= MAX_TAPS || next.max_lookback() >= history_frames as u64 {
            return Err(next.taps_too_big(history_frames));
        }
        Ok(next)
    }

    fn taps_too_big(&self, history_frames: usize) -> ConfigError {
        ConfigError::TapsTooBig {
            n_taps: self.n_taps,
            n_delay: self.n_delay,
            history_frames,
        }
    }

    /// Pack into the store word. `n_taps` must already be within [`MAX_TAPS`].
    fn pack(self) -> u64 {
        let mut word = u64::from(self.n_delay) | (u64::from(self.n_taps.min(MAX_TAPS)) << TAPS_SHIFT);
        if self.alt_polarity {
            word |= ALT_BIT;
        }
        if self.divisor_growth == DivisorGrowth::Exponential {
            word |= EXP_BIT;
        }
        word
    }

    fn unpack(word: u64) -> Self {
        Self {
            n_delay: word as u32,
            n_taps: u32::from((word >> TAPS_SHIFT) as u16),
            alt_polarity: word & ALT_BIT != 0,
            divisor_growth: if word & EXP_BIT != 0 {
                DivisorGrowth::Exponential
            } else {
                DivisorGrowth::Linear
            },
        }
    }
}

impl fmt::Display for EffectParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Delay time (number of samples): {}", self.n_delay)?;
        writeln!(f, "Number of feedback loops: {}", self.feedback_loops())?;
        writeln!(
            f,
            "Alternate feedback polarity: {}",
            if self.alt_polarity { "enabled" } else { "disabled" }
        )?;
        writeln!(f, "Cycle divider increment: {}", self.divisor_growth.label())
    }
}

/// Shared, lock-free cell holding the live [`EffectParameters`].
///
/// Written only by the control channel, read once per cycle by the engine.
/// Every update is validated against the history capacity before it becomes
/// visible; a rejected update leaves the previous value in place.
#[derive(Debug)]
pub struct ParameterStore {
    packed: AtomicU64,
    history_frames: usize,
}

impl ParameterStore {
    /// Create a store for a history of `history_frames` frames.
    pub fn new(initial: EffectParameters, history_frames: usize) -> Result<Self, ConfigError> {
        initial.validate(history_frames)?;
        Ok(Self {
            packed: AtomicU64::new(initial.pack()),
            history_frames,
        })
    }

    /// History capacity the parameters are validated against.
    pub fn history_frames(&self) -> usize {
        self.history_frames
    }

    /// Consistent copy of all fields.
    #[inline]
    pub fn snapshot(&self) -> EffectParameters {
        EffectParameters::unpack(self.packed.load(Ordering::Relaxed))
    }

    /// Apply a validated transformation atomically.
    ///
    /// `f` may run more than once if another writer races this one.
    pub fn update<E, F>(&self, f: F) -> Result<EffectParameters, E>
    where
        F: Fn(EffectParameters) -> Result<EffectParameters, E>,
    {
        let mut current = self.packed.load(Ordering::Relaxed);
        loop {
            let next = f(EffectParameters::unpack(current))?;
            match self.packed.compare_exchange_weak(
                current,
                next.pack(),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Set the base delay in frames.
    pub fn set_n_delay(&self, n_delay: u32) -> Result<EffectParameters, ConfigError> {
        let h = self.history_frames;
        self.update(|p| p.with_n_delay(n_delay, h))
    }

    /// Set the number of taps beyond the first.
    pub fn set_feedback_loops(&self, loops: u32) -> Result<EffectParameters, ConfigError> {
        let h = self.history_frames;
        self.update(|p| p.with_feedback_loops(loops, h))
    }

    /// Enable or disable alternating tap polarity.
    pub fn set_alt_polarity(&self, alt_polarity: bool) -> EffectParameters {
        self.update_infallible(|p| EffectParameters { alt_polarity, ..p })
    }

    /// Select the divisor growth policy.
    pub fn set_divisor_growth(&self, divisor_growth: DivisorGrowth) -> EffectParameters {
        self.update_infallible(|p| EffectParameters {
            divisor_growth,
            ..p
        })
    }

    fn update_infallible(&self, f: impl Fn(EffectParameters) -> EffectParameters) -> EffectParameters {
        match self.update::<Infallible, _>(|p| Ok(f(p))) {
            Ok(next) => next,
            Err(never) => match never {},
        }
    }
}
