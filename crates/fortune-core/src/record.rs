//! Persisted fortune records and provenance
//!
//! A [`FortuneRecord`] is the committed result for one idempotency key.
//! Callers always receive owned copies; only the cache controller writes
//! the stored instance.

use crate::payload::{FortunePayload, LuckyValue};
use crate::types::{FortuneType, RecordKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Metadata key: generation path (`provider` / `fallback`)
pub const META_SOURCE: &str = "source";
/// Metadata key: why the fallback ran
pub const META_FALLBACK_REASON: &str = "fallback_reason";
/// Metadata key: provider model identifier
pub const META_MODEL: &str = "model";
/// Metadata key: attempt number that produced the content
pub const META_ATTEMPT: &str = "attempt";
/// Metadata key: category tags derived from the scores
pub const META_TAGS: &str = "tags";

/// Why the deterministic fallback produced the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No provider configured
    NoProvider,
    /// Provider call returned an error
    ProviderError,
    /// Provider call exceeded its deadline
    Timeout,
    /// Provider response failed schema validation
    InvalidResponse,
}

impl FallbackReason {
    /// Stable identifier
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoProvider => "no_provider",
            Self::ProviderError => "provider_error",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid_response",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        [
            Self::NoProvider,
            Self::ProviderError,
            Self::Timeout,
            Self::InvalidResponse,
        ]
        .into_iter()
        .find(|r| r.as_str() == s)
    }
}

/// Which generation path produced a record's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    /// External provider succeeded
    Provider {
        /// Model identifier reported by the provider
        model: String,
    },
    /// Deterministic rule-based fallback
    Fallback {
        /// Why the provider path was not used
        reason: FallbackReason,
    },
}

impl Provenance {
    /// Check if content came from the fallback path
    #[inline]
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Write provenance entries into record metadata
    pub fn write_into(&self, metadata: &mut BTreeMap<String, Value>) {
        match self {
            Self::Provider { model } => {
                metadata.insert(META_SOURCE.to_string(), Value::from("provider"));
                metadata.insert(META_MODEL.to_string(), Value::from(model.as_str()));
                metadata.remove(META_FALLBACK_REASON);
            }
            Self::Fallback { reason } => {
                metadata.insert(META_SOURCE.to_string(), Value::from("fallback"));
                metadata.insert(
                    META_FALLBACK_REASON.to_string(),
                    Value::from(reason.as_str()),
                );
                metadata.remove(META_MODEL);
            }
        }
    }

    /// Read provenance back from record metadata
    #[must_use]
    pub fn from_metadata(metadata: &BTreeMap<String, Value>) -> Option<Self> {
        match metadata.get(META_SOURCE)?.as_str()? {
            "provider" => Some(Self::Provider {
                model: metadata
                    .get(META_MODEL)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            "fallback" => Some(Self::Fallback {
                reason: FallbackReason::parse(metadata.get(META_FALLBACK_REASON)?.as_str()?)?,
            }),
            _ => None,
        }
    }
}

/// Committed fortune for one `(user, fortune_type, date)` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FortuneRecord {
    /// Idempotency key
    pub key: RecordKey,
    /// Typed content
    pub payload: FortunePayload,
    /// Free-form metadata (provenance, attempt, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Generations committed for this key today; starts at 1, never decreases
    pub generation_count: u32,
    /// When the current content was generated
    pub created_at: DateTime<Utc>,
}

impl FortuneRecord {
    /// Create new record
    #[inline]
    #[must_use]
    pub fn new(
        key: RecordKey,
        payload: FortunePayload,
        generation_count: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            payload,
            metadata: BTreeMap::new(),
            generation_count,
            created_at,
        }
    }

    /// With metadata entry
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// With provenance entries
    #[inline]
    #[must_use]
    pub fn with_provenance(mut self, provenance: &Provenance) -> Self {
        provenance.write_into(&mut self.metadata);
        self
    }

    /// Fortune type
    #[inline]
    #[must_use]
    pub fn fortune_type(&self) -> FortuneType {
        self.key.fortune_type
    }

    /// Regenerations consumed today
    #[inline]
    #[must_use]
    pub fn regenerations_used(&self) -> u32 {
        self.generation_count.saturating_sub(1)
    }

    /// Provenance recorded in metadata
    #[inline]
    #[must_use]
    pub fn provenance(&self) -> Option<Provenance> {
        Provenance::from_metadata(&self.metadata)
    }

    /// Score map
    #[inline]
    #[must_use]
    pub fn scores(&self) -> BTreeMap<String, i32> {
        self.payload.scores()
    }

    /// Insight map
    #[inline]
    #[must_use]
    pub fn insights(&self) -> BTreeMap<String, String> {
        self.payload.insights()
    }

    /// Lucky item map
    #[inline]
    #[must_use]
    pub fn lucky_items(&self) -> BTreeMap<String, LuckyValue> {
        self.payload.lucky_items()
    }

    /// Flattened persisted shape
    #[must_use]
    pub fn to_stored(&self) -> StoredRecord {
        StoredRecord {
            key: self.key.clone(),
            scores: self.scores(),
            insights: self.insights(),
            lucky_items: self.lucky_items(),
            metadata: self.metadata.clone(),
            generation_count: self.generation_count,
            created_at: self.created_at,
        }
    }
}

/// Map-shaped view of a record for external storage and clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Idempotency key
    pub key: RecordKey,
    /// Scores by field name
    pub scores: BTreeMap<String, i32>,
    /// Insights by field name
    pub insights: BTreeMap<String, String>,
    /// Lucky items by field name
    pub lucky_items: BTreeMap<String, LuckyValue>,
    /// Metadata
    pub metadata: BTreeMap<String, Value>,
    /// Generation count
    pub generation_count: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
