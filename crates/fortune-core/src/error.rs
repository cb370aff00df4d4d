//! Error types for the fortune pipeline
//!
//! Taxonomy:
//! - Input validation failures (fail fast, surfaced to the caller)
//! - Generation failures (only when the deterministic fallback cannot run)
//! - Store failures (fatal, never masked with fabricated data)
//! - Configuration failures
//!
//! Provider failures and write conflicts are recovered locally and never
//! reach this level. Regeneration quota exhaustion is a result variant,
//! not an error.

use crate::types::FortuneType;

/// Top-level pipeline error
#[derive(Debug, thiserror::Error)]
pub enum FortuneError {
    /// Request rejected before any generation attempt
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// Fallback generation could not run
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Record store unavailable
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl FortuneError {
    /// Check if error must abort a whole batch
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Config(_))
    }

    /// Check if the caller may retry the same request unchanged
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Unavailable(_)) | Self::Generation(_)
        )
    }
}

/// Input validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required attribute missing for the fortune type
    #[error("{fortune_type} requires attribute '{attribute}'")]
    MissingAttribute {
        /// Requested fortune type
        fortune_type: FortuneType,
        /// Missing attribute name
        attribute: String,
    },

    /// Attribute present but malformed
    #[error("invalid attribute '{attribute}': {reason}")]
    InvalidAttribute {
        /// Attribute name
        attribute: String,
        /// Human-readable reason
        reason: String,
    },

    /// Unknown fortune type identifier
    #[error("unknown fortune type: {0}")]
    UnknownFortuneType(String),

    /// Unknown package identifier
    #[error("unknown package: {0}")]
    UnknownPackage(String),
}

/// Generation errors that survive fallback
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Deterministic fallback could not produce a payload
    #[error("fallback failed for {fortune_type}: {reason}")]
    FallbackFailed {
        /// Fortune type being generated
        fortune_type: FortuneType,
        /// Failure detail
        reason: String,
    },
}

/// Record store errors (fatal)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse failure
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid config value '{field}': {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Reason
        reason: String,
    },
}
