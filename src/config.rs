//! Options consumed by the fitting and modification engines.
//!
//! The library never holds settings globally: a host keeps whatever mutable
//! settings it likes and hands an [`AdaptationConfig`] snapshot to each
//! operation.

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Largest spacing between generated AI levels.
pub const MAX_AI_SPACING: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default, rename_all = "camelCase")]
pub struct AdaptationConfig {
    /// Lowest AI level predictions are produced for.
    #[serde(rename = "minAI")]
    #[builder(default = 80)]
    pub min_ai: u32,
    /// Highest AI level predictions are produced for.
    #[serde(rename = "maxAI")]
    #[builder(default = 120)]
    pub max_ai: u32,
    /// Fit every stored sample instead of one averaged point per level.
    #[builder(default = false)]
    pub fit_all: bool,
    /// Required distance between the lowest and highest sampled level.
    #[serde(rename = "testMinAIdiffs")]
    #[builder(default = 2)]
    pub test_min_ai_diffs: u32,
    /// Relative deviation from an observed time that counts as a failed level.
    #[builder(default = 0.01)]
    pub test_max_time_pct: f64,
    /// Share of failed levels above which a fit is flagged unreliable.
    #[builder(default = 0.1)]
    pub test_max_fails_pct: f64,
    #[serde(rename = "aiNumLevels")]
    #[builder(default = 5)]
    pub ai_num_levels: u32,
    #[builder(default = 1)]
    pub ai_spacing: u32,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AdaptationConfig {
    /// Parse a JSON options object. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ErrorKind> {
        let config: AdaptationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ErrorKind> {
        if self.min_ai > self.max_ai {
            return Err(ErrorKind::InvalidConfig(format!(
                "minAI ({}) is greater than maxAI ({})",
                self.min_ai, self.max_ai
            )));
        }
        for (name, value) in [
            ("testMaxTimePct", self.test_max_time_pct),
            ("testMaxFailsPct", self.test_max_fails_pct),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ErrorKind::InvalidConfig(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if !(1..=MAX_AI_SPACING).contains(&self.ai_spacing) {
            return Err(ErrorKind::InvalidConfig(format!(
                "aiSpacing must be between 1 and {MAX_AI_SPACING}, got {}",
                self.ai_spacing
            )));
        }
        if self.ai_num_levels == 0 {
            return Err(ErrorKind::InvalidConfig(
                "aiNumLevels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured span of AI levels, inclusive.
    pub fn ai_range(&self) -> std::ops::RangeInclusive<u32> {
        self.min_ai..=self.max_ai
    }
}
