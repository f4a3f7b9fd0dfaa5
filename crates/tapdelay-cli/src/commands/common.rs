//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tapdelay_core::{DivisorGrowth, EngineConfig, MAX_TAPS};
use tapdelay_io::WavInfo;

/// Session geometry and effect flags. Flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Engine config file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Device period / segment size in frames
    #[arg(long)]
    pub period: Option<usize>,

    /// Ring history size in frames (multiple of the period)
    #[arg(long)]
    pub history: Option<usize>,

    /// Delay time in frames between taps
    #[arg(short, long)]
    pub delay: Option<u32>,

    /// Number of feedback loops (taps beyond the first)
    #[arg(short, long, conflicts_with = "taps")]
    pub feedback: Option<u32>,

    /// Total number of taps
    #[arg(long)]
    pub taps: Option<u32>,

    /// Alternate tap polarity (`--alt-polarity` or `--alt-polarity=false`)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub alt_polarity: Option<bool>,

    /// Grow the tap divisor by one instead of doubling
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub linear: Option<bool>,
}

impl SessionArgs {
    /// Load the config file if given, apply flag overrides and validate.
    pub fn resolve(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => EngineConfig::default(),
        };

        if let Some(period) = self.period {
            config.period_frames = period;
        }
        if let Some(history) = self.history {
            config.history_frames = history;
        }

        let effect = &mut config.effect;
        if let Some(n_delay) = self.delay {
            effect.n_delay = n_delay;
        }
        if let Some(loops) = self.feedback {
            if loops >= MAX_TAPS {
                anyhow::bail!("number of feedback loops is too big");
            }
            effect.n_taps = loops + 1;
        }
        if let Some(n_taps) = self.taps {
            effect.n_taps = n_taps;
        }
        if let Some(alt) = self.alt_polarity {
            effect.alt_polarity = alt;
        }
        if let Some(linear) = self.linear {
            effect.divisor_growth = if linear {
                DivisorGrowth::Linear
            } else {
                DivisorGrowth::Exponential
            };
        }

        config.validate()?;
        Ok(config)
    }
}

/// One-line description of a probed file.
pub fn describe(info: &WavInfo) -> String {
    format!(
        "{} channel(s), {} Hz, {}, {} frames ({:.2}s)",
        info.channels,
        info.sample_rate,
        info.format,
        info.frames,
        info.duration_secs()
    )
}
