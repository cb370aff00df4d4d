//! Core identifiers and request types
//!
//! Defines:
//! - User identifiers
//! - The closed set of fortune types
//! - The idempotency key `(user, fortune_type, date)`
//! - Fortune requests

use crate::attributes::Attributes;
use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque user identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create new user ID
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Reading category
///
/// Closed set: every variant has a catalog entry and a payload variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FortuneType {
    /// Today's general fortune
    Daily,
    /// Four pillars reading
    Saju,
    /// Yearly Tojeong secret reading
    Tojeong,
    /// Misfortune (sal) detection and remedies
    Salpuli,
    /// Past life reading
    PastLife,
    /// Blood type personality fortune
    BloodType,
    /// Career and work fortune
    Career,
    /// Dream interpretation
    DreamInterpretation,
}

impl FortuneType {
    /// All fortune types in declaration order
    pub const ALL: [FortuneType; 8] = [
        FortuneType::Daily,
        FortuneType::Saju,
        FortuneType::Tojeong,
        FortuneType::Salpuli,
        FortuneType::PastLife,
        FortuneType::BloodType,
        FortuneType::Career,
        FortuneType::DreamInterpretation,
    ];

    /// Wire identifier (kebab-case)
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FortuneType::Daily => "daily",
            FortuneType::Saju => "saju",
            FortuneType::Tojeong => "tojeong",
            FortuneType::Salpuli => "salpuli",
            FortuneType::PastLife => "past-life",
            FortuneType::BloodType => "blood-type",
            FortuneType::Career => "career",
            FortuneType::DreamInterpretation => "dream-interpretation",
        }
    }
}

impl fmt::Display for FortuneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FortuneType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace('_', "-");
        FortuneType::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| ValidationError::UnknownFortuneType(s.to_string()))
    }
}

/// Idempotency key: at most one committed record per key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    /// Owning user
    pub user_id: UserId,
    /// Reading category
    pub fortune_type: FortuneType,
    /// Target calendar date
    pub date: NaiveDate,
}

impl RecordKey {
    /// Create new record key
    #[inline]
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, fortune_type: FortuneType, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            fortune_type,
            date,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.user_id, self.fortune_type, self.date)
    }
}

/// A single-type fortune request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FortuneRequest {
    /// Requesting user
    pub user_id: UserId,
    /// Reading category
    pub fortune_type: FortuneType,
    /// Target calendar date
    pub date: NaiveDate,
    /// Free-form inputs (birth data, category-specific fields)
    #[serde(default)]
    pub attributes: Attributes,
    /// Overwrite today's record instead of returning it
    #[serde(default)]
    pub regenerate: bool,
}

impl FortuneRequest {
    /// Create new request without attributes
    #[inline]
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, fortune_type: FortuneType, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            fortune_type,
            date,
            attributes: Attributes::new(),
            regenerate: false,
        }
    }

    /// With attributes
    #[inline]
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// With regenerate flag
    #[inline]
    #[must_use]
    pub fn with_regenerate(mut self, regenerate: bool) -> Self {
        self.regenerate = regenerate;
        self
    }

    /// Idempotency key for this request
    #[inline]
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.user_id.clone(), self.fortune_type, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fortune_type_round_trips_through_str() {
        for t in FortuneType::ALL {
            assert_eq!(t.as_str().parse::<FortuneType>().unwrap(), t);
        }
    }

    #[test]
    fn fortune_type_accepts_underscores_and_case() {
        assert_eq!(
            "BLOOD_TYPE".parse::<FortuneType>().unwrap(),
            FortuneType::BloodType
        );
        assert!("horoscope".parse::<FortuneType>().is_err());
    }

    #[test]
    fn fortune_type_serde_matches_wire_id() {
        let json = serde_json::to_string(&FortuneType::DreamInterpretation).unwrap();
        assert_eq!(json, "\"dream-interpretation\"");
    }

    #[test]
    fn record_key_display() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let key = RecordKey::new("u1", FortuneType::PastLife, date);
        assert_eq!(key.to_string(), "u1:past-life:2024-01-10");
    }

    #[test]
    fn request_key_matches_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let req = FortuneRequest::new("u1", FortuneType::Saju, date).with_regenerate(true);
        assert_eq!(req.key(), RecordKey::new("u1", FortuneType::Saju, date));
        assert!(req.regenerate);
    }
}
