//! Pipeline configuration
//!
//! Loaded from TOML; every field has a default so partial files work.

use crate::error::ConfigError;
use crate::usage::Pricing;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Widest sub-score spread; anything larger spans the whole score scale
pub const MAX_SUB_SCORE_SPREAD: i32 = 100;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FortuneConfig {
    /// Overwrite-generations allowed per key per date (after the first)
    pub max_regenerations_per_day: u32,
    /// Provider call deadline in milliseconds
    pub provider_timeout_ms: u64,
    /// Whole-batch deadline in milliseconds
    pub batch_timeout_ms: u64,
    /// Range the seeded base score is drawn from
    pub base_score_range: (i32, i32),
    /// Max absolute seeded divergence of sub-scores from the base
    pub sub_score_spread: i32,
    /// Offset from UTC used to resolve "today"
    pub utc_offset_hours: i32,
    /// Entries kept by the read-through record cache
    pub read_cache_capacity: u64,
    /// Provider pricing
    pub pricing: Pricing,
}

impl FortuneConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text and validate
    ///
    /// # Errors
    /// Parse failure or out-of-range value
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate
    ///
    /// # Errors
    /// I/O, parse failure or out-of-range value
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// With regeneration quota
    #[inline]
    #[must_use]
    pub fn with_max_regenerations(mut self, quota: u32) -> Self {
        self.max_regenerations_per_day = quota;
        self
    }

    /// With provider timeout
    #[inline]
    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With batch timeout
    #[inline]
    #[must_use]
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With pricing
    #[inline]
    #[must_use]
    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    /// Provider timeout as duration
    #[inline]
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Batch timeout as duration
    #[inline]
    #[must_use]
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (lo, hi) = self.base_score_range;
        if lo > hi || lo < 0 || hi > 100 {
            return Err(ConfigError::Invalid {
                field: "base_score_range",
                reason: format!("expected 0 <= min <= max <= 100, got ({lo}, {hi})"),
            });
        }
        if !(0..=MAX_SUB_SCORE_SPREAD).contains(&self.sub_score_spread) {
            return Err(ConfigError::Invalid {
                field: "sub_score_spread",
                reason: format!(
                    "expected 0..={MAX_SUB_SCORE_SPREAD}, got {}",
                    self.sub_score_spread
                ),
            });
        }
        if self.provider_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "provider_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.batch_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::Invalid {
                field: "utc_offset_hours",
                reason: format!("{} is not a valid offset", self.utc_offset_hours),
            });
        }
        if self.pricing.prompt_cost_per_1k < 0.0 || self.pricing.completion_cost_per_1k < 0.0 {
            return Err(ConfigError::Invalid {
                field: "pricing",
                reason: "costs must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for FortuneConfig {
    fn default() -> Self {
        Self {
            max_regenerations_per_day: 3,
            provider_timeout_ms: 8_000,
            batch_timeout_ms: 20_000,
            base_score_range: (60, 95),
            sub_score_spread: 12,
            utc_offset_hours: 9,
            read_cache_capacity: 10_000,
            pricing: Pricing::default(),
        }
    }
}
