//! Batch result envelope
//!
//! A batch always returns one entry per package type, in declared order:
//! either the committed record or a typed per-type error. A partial failure
//! is still a successful batch.

use crate::summary::PackageSummary;
use chrono::NaiveDate;
use fortune_cache::RegenerationLimitExceeded;
use fortune_core::{
    FortuneRecord, FortuneType, GenerationError, TokenUsage, UserId, ValidationError,
};
use indexmap::IndexMap;
use ulid::Ulid;

/// Per-type failure inside a batch
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchItemError {
    /// Request for this type was rejected
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Provider and fallback both failed for this type
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Regeneration refused by the daily quota
    #[error("{0}")]
    LimitExceeded(RegenerationLimitExceeded),

    /// Still pending when the batch deadline expired
    #[error("timed out after {after_ms}ms")]
    Timeout {
        /// Batch deadline in milliseconds
        after_ms: u64,
    },
}

impl BatchItemError {
    /// Stable identifier
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Generation(_) => "generation",
            Self::LimitExceeded(_) => "limit_exceeded",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Outcome for one fortune type
pub type BatchItem = Result<FortuneRecord, BatchItemError>;

/// Result of one package generation
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// Batch identifier for log correlation
    pub batch_id: Ulid,
    /// Requesting user
    pub user_id: UserId,
    /// Resolved package
    pub package_id: String,
    /// Target date
    pub date: NaiveDate,
    /// Per-type outcomes in package order
    pub results: IndexMap<FortuneType, BatchItem>,
    /// Summary over successful types; `None` when nothing succeeded
    pub package_summary: Option<PackageSummary>,
    /// Provider usage summed over every call in the batch
    pub token_usage: TokenUsage,
    /// Wall time of the fan-out
    pub elapsed_ms: u64,
}

impl BatchResult {
    /// Successful records in package order
    pub fn succeeded(&self) -> impl Iterator<Item = (FortuneType, &FortuneRecord)> {
        self.results
            .iter()
            .filter_map(|(t, item)| item.as_ref().ok().map(|record| (*t, record)))
    }

    /// Failures in package order
    pub fn failed(&self) -> impl Iterator<Item = (FortuneType, &BatchItemError)> {
        self.results
            .iter()
            .filter_map(|(t, item)| item.as_ref().err().map(|err| (*t, err)))
    }

    /// Record for `fortune_type`, if it succeeded
    #[must_use]
    pub fn record(&self, fortune_type: FortuneType) -> Option<&FortuneRecord> {
        self.results.get(&fortune_type)?.as_ref().ok()
    }

    /// Check if every type succeeded
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.results.values().all(Result::is_ok)
    }

    /// Number of successful types
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    /// Number of failed types
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }
}
