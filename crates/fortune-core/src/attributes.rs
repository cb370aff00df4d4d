//! Free-form attribute bag
//!
//! Callers send arbitrary JSON-valued fields (birth date, gender, category
//! specific inputs). Typed accessors parse on demand; absent or empty values
//! are treated as missing, never as errors.

use crate::error::ValidationError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Birth date attribute name
pub const BIRTH_DATE: &str = "birth_date";
/// Blood type attribute name
pub const BLOOD_TYPE: &str = "blood_type";
/// Derived age attribute name (years at target date)
pub const AGE: &str = "age";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Known blood types in canonical form
pub const BLOOD_TYPES: [&str; 4] = ["A형", "B형", "O형", "AB형"];

/// Attribute bag keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    /// Create empty attribute bag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With attribute (builder)
    #[inline]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace attribute
    #[inline]
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Check if attribute carries a usable value
    ///
    /// Null and blank strings count as absent.
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        match self.0.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(_) => true,
        }
    }

    /// String value (trimmed); numbers and bools are rendered
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric value; numeric strings are parsed
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.0.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean value; "true"/"false" strings are parsed
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.0.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Parsed birth date
    ///
    /// # Errors
    /// `InvalidAttribute` if present but not `YYYY-MM-DD`
    pub fn birth_date(&self) -> Result<Option<NaiveDate>, ValidationError> {
        let Some(raw) = self.get_str(BIRTH_DATE) else {
            return Ok(None);
        };
        NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map(Some)
            .map_err(|_| ValidationError::InvalidAttribute {
                attribute: BIRTH_DATE.to_string(),
                reason: format!("expected YYYY-MM-DD, got {raw:?}"),
            })
    }

    /// Canonical blood type (`A형`, `B형`, `O형`, `AB형`)
    ///
    /// # Errors
    /// `InvalidAttribute` if present but not a known blood type
    pub fn blood_type(&self) -> Result<Option<&'static str>, ValidationError> {
        let Some(raw) = self.get_str(BLOOD_TYPE) else {
            return Ok(None);
        };
        normalize_blood_type(&raw)
            .map(Some)
            .ok_or_else(|| ValidationError::InvalidAttribute {
                attribute: BLOOD_TYPE.to_string(),
                reason: format!("unknown blood type {raw:?}"),
            })
    }

    /// Copy with derived fields for scoring
    ///
    /// Adds `age` (full years at `on`) when the birth date parses and
    /// rewrites `blood_type` into canonical form. Unparseable inputs are
    /// left untouched.
    #[must_use]
    pub fn with_derived(&self, on: NaiveDate) -> Self {
        let mut derived = self.clone();
        if let Ok(Some(birth)) = self.birth_date() {
            if let Some(age) = age_at(birth, on) {
                derived.insert(AGE, age);
            }
        }
        if let Ok(Some(blood)) = self.blood_type() {
            derived.insert(BLOOD_TYPE, blood);
        }
        derived
    }

    /// Iterate over attributes in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of attributes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Normalize blood type spellings (`a`, `A`, `A형`, `ab형`) to canonical form
#[must_use]
pub fn normalize_blood_type(raw: &str) -> Option<&'static str> {
    let upper = raw.trim().to_ascii_uppercase();
    let letters = upper.trim_end_matches('형').trim_end_matches("TYPE").trim();
    match letters {
        "A" => Some("A형"),
        "B" => Some("B형"),
        "O" => Some("O형"),
        "AB" => Some("AB형"),
        _ => None,
    }
}

/// Full years between `birth` and `on`; `None` if `on` precedes `birth`
#[must_use]
pub fn age_at(birth: NaiveDate, on: NaiveDate) -> Option<i32> {
    if on < birth {
        return None;
    }
    let mut years = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    Some(years)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn blank_values_are_absent() {
        let attrs = Attributes::new()
            .with("name", "  ")
            .with("nothing", Value::Null)
            .with("gender", "female");
        assert!(!attrs.is_present("name"));
        assert!(!attrs.is_present("nothing"));
        assert!(!attrs.is_present("missing"));
        assert!(attrs.is_present("gender"));
    }

    #[test]
    fn numeric_strings_parse() {
        let attrs = Attributes::new()
            .with("experience_years", "12")
            .with("height", json!(171.5));
        assert_eq!(attrs.get_f64("experience_years"), Some(12.0));
        assert_eq!(attrs.get_f64("height"), Some(171.5));
        assert_eq!(attrs.get_f64("missing"), None);
    }

    #[test]
    fn birth_date_parses_and_rejects() {
        let ok = Attributes::new().with(BIRTH_DATE, "1990-06-15");
        assert_eq!(ok.birth_date().unwrap(), Some(date(1990, 6, 15)));

        let bad = Attributes::new().with(BIRTH_DATE, "15/06/1990");
        assert!(matches!(
            bad.birth_date(),
            Err(ValidationError::InvalidAttribute { .. })
        ));

        assert_eq!(Attributes::new().birth_date().unwrap(), None);
    }

    #[test]
    fn blood_type_spellings_normalize() {
        assert_eq!(normalize_blood_type("A형"), Some("A형"));
        assert_eq!(normalize_blood_type("a"), Some("A형"));
        assert_eq!(normalize_blood_type(" ab형 "), Some("AB형"));
        assert_eq!(normalize_blood_type("O type"), Some("O형"));
        assert_eq!(normalize_blood_type("C"), None);
    }

    #[test]
    fn age_respects_birthday() {
        let birth = date(1990, 6, 15);
        assert_eq!(age_at(birth, date(2024, 1, 10)), Some(33));
        assert_eq!(age_at(birth, date(2024, 6, 15)), Some(34));
        assert_eq!(age_at(birth, date(1989, 1, 1)), None);
    }

    #[test]
    fn derived_adds_age_and_canonical_blood_type() {
        let attrs = Attributes::new()
            .with(BIRTH_DATE, "1990-06-15")
            .with(BLOOD_TYPE, "a");
        let derived = attrs.with_derived(date(2024, 1, 10));
        assert_eq!(derived.get_f64(AGE), Some(33.0));
        assert_eq!(derived.get_str(BLOOD_TYPE).as_deref(), Some("A형"));
        assert_eq!(attrs.get_str(BLOOD_TYPE).as_deref(), Some("a"));
    }
}
