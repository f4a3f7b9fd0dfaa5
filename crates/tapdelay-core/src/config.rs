//! Engine configuration loaded from TOML.
//!
//! # TOML Format
//!
//! ```toml
//! history_frames = 65536
//! staging_segments = 2
//! period_frames = 1024
//!
//! [effect]
//! n_delay = 240
//! n_taps = 21
//! alt_polarity = true
//! divisor_growth = "linear"
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use crate::error::{ConfigError, Error, Result};
use crate::history::DEFAULT_HISTORY_FRAMES;
use crate::param::EffectParameters;
use crate::staging::DEFAULT_STAGING_SEGMENTS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default requested device period in frames.
pub const DEFAULT_PERIOD_FRAMES: usize = 1024;

/// Session geometry plus the startup effect parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Ring history capacity in frames. Must be a multiple of the period.
    pub history_frames: usize,
    /// Number of output staging segments (at least 2).
    pub staging_segments: usize,
    /// Requested device period in frames.
    pub period_frames: usize,
    /// Parameters active when playback starts.
    pub effect: EffectParameters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_frames: DEFAULT_HISTORY_FRAMES,
            staging_segments: DEFAULT_STAGING_SEGMENTS,
            period_frames: DEFAULT_PERIOD_FRAMES,
            effect: EffectParameters::STARTUP,
        }
    }
}

impl EngineConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::read_config(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check geometry and startup parameters.
    ///
    /// The device may still negotiate a different period; the history is
    /// checked against it again when the session starts.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.history_frames == 0 {
            return Err(ConfigError::Zero("history size"));
        }
        if self.period_frames == 0 {
            return Err(ConfigError::Zero("period size"));
        }
        if self.staging_segments < 2 {
            return Err(ConfigError::TooFewStagingSegments(self.staging_segments));
        }
        if self.history_frames % self.period_frames != 0 {
            return Err(ConfigError::MisalignedHistory {
                history_frames: self.history_frames,
                segment_frames: self.period_frames,
            });
        }
        self.effect.validate(self.history_frames)
    }
}
