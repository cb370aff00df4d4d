//! Provider response validation
//!
//! Checks a completion against the fortune type's catalog schema:
//! - Text bodies must contain one JSON object (a fenced ```json block is accepted)
//! - Every catalog field must be present with the expected JSON type
//! - Scores must be JSON numbers; numeric strings are rejected
//! - Out-of-range scores are clamped into the field's bound
//! - Fields outside the catalog are ignored

use crate::provider::CompletionBody;
use fortune_core::{spec_for, FieldKind, FortunePayload, FortuneType};
use serde_json::{Map, Value};

/// Schema violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Body holds no parseable JSON object
    #[error("response is not JSON: {0}")]
    NotJson(String),

    /// Top-level JSON value is not an object
    #[error("response is not a JSON object")]
    NotAnObject,

    /// Catalog field absent
    #[error("missing field '{0}'")]
    MissingField(String),

    /// Catalog field has the wrong JSON type
    #[error("field '{field}' must be {expected}")]
    WrongType {
        /// Field name
        field: String,
        /// Expected shape
        expected: &'static str,
    },

    /// Typed payload construction failed
    #[error("payload rejected: {0}")]
    Payload(String),
}

/// Validate a completion body into a typed payload
///
/// # Errors
/// The first schema violation found, in catalog field order
pub fn validate_response(
    fortune_type: FortuneType,
    body: &CompletionBody,
) -> Result<FortunePayload, SchemaError> {
    let value = match body {
        CompletionBody::Structured(value) => value.clone(),
        CompletionBody::Text(text) => extract_json(text)?,
    };
    let Value::Object(object) = value else {
        return Err(SchemaError::NotAnObject);
    };

    let spec = spec_for(fortune_type);
    let mut fields = Map::new();
    for field in spec.fields {
        let raw = object
            .get(field.name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| SchemaError::MissingField(field.name.to_string()))?;
        let value = match field.kind {
            FieldKind::Score(bound) => Value::from(bound.clamp(score(field.name, raw)?)),
            FieldKind::Insight => Value::from(text(field.name, raw)?),
            FieldKind::LuckyItem => Value::from(item(field.name, raw)?),
            FieldKind::LuckyList => Value::from(list(field.name, raw)?),
        };
        fields.insert(field.name.to_string(), value);
    }

    FortunePayload::from_fields(fortune_type, fields)
        .map_err(|e| SchemaError::Payload(e.to_string()))
}

/// Extract the JSON value embedded in free text
///
/// # Errors
/// `NotJson` when no fenced block or brace-delimited span parses
pub fn extract_json(text: &str) -> Result<Value, SchemaError> {
    let candidate = fenced(text)
        .or_else(|| {
            let start = text.find('{')?;
            let end = text.rfind('}')?;
            (start < end).then(|| &text[start..=end])
        })
        .unwrap_or(text);
    serde_json::from_str(candidate.trim()).map_err(|e| SchemaError::NotJson(e.to_string()))
}

fn fenced(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the first newline.
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

fn score(field: &str, value: &Value) -> Result<i64, SchemaError> {
    let wrong = || SchemaError::WrongType {
        field: field.to_string(),
        expected: "a number",
    };
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i),
            // Fractional or out-of-i64 scores are rounded, then clamped by the caller.
            #[allow(clippy::cast_possible_truncation)]
            None => n.as_f64().map(|f| f.round() as i64).ok_or_else(wrong),
        },
        _ => Err(wrong()),
    }
}

fn text(field: &str, value: &Value) -> Result<String, SchemaError> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(SchemaError::WrongType {
            field: field.to_string(),
            expected: "a non-empty string",
        }),
    }
}

// Lucky items tolerate bare numbers ("lucky_number": 7).
fn item(field: &str, value: &Value) -> Result<String, SchemaError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(SchemaError::WrongType {
            field: field.to_string(),
            expected: "a string",
        }),
    }
}

fn list(field: &str, value: &Value) -> Result<Vec<String>, SchemaError> {
    let wrong = || SchemaError::WrongType {
        field: field.to_string(),
        expected: "an array of strings",
    };
    value
        .as_array()
        .ok_or_else(wrong)?
        .iter()
        .map(|v| item(field, v).map_err(|_| wrong()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blood_type_json() -> Value {
        json!({
            "overall_luck": 72,
            "personality_match": 80,
            "relationship": 66,
            "work": 58,
            "personality": "꼼꼼함",
            "today_message": "차분하게",
            "advice": "쉬어가세요",
            "lucky_color": "파란색",
            "lucky_item": "손수건",
            "compatible_blood_types": ["O형", "AB형"]
        })
    }

    #[test]
    fn structured_body_validates() {
        let payload = validate_response(
            FortuneType::BloodType,
            &CompletionBody::Structured(blood_type_json()),
        )
        .unwrap();
        assert_eq!(payload.overall_luck(), 72);
    }

    #[test]
    fn fenced_text_validates() {
        let text = format!("여기 결과입니다.\n```json\n{}\n```\n감사합니다.", blood_type_json());
        let payload =
            validate_response(FortuneType::BloodType, &CompletionBody::Text(text)).unwrap();
        assert_eq!(payload.scores()["work"], 58);
    }

    #[test]
    fn bare_object_in_prose_validates() {
        let text = format!("결과: {} 끝", blood_type_json());
        assert!(validate_response(FortuneType::BloodType, &CompletionBody::Text(text)).is_ok());
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let mut value = blood_type_json();
        value["overall_luck"] = json!(140);
        value["personality_match"] = json!(12.6);
        let payload =
            validate_response(FortuneType::BloodType, &CompletionBody::Structured(value)).unwrap();
        assert_eq!(payload.overall_luck(), 95);
        assert_eq!(payload.scores()["personality_match"], 45);
    }

    #[test]
    fn numeric_string_score_is_rejected() {
        let mut value = blood_type_json();
        value["overall_luck"] = json!("72");
        assert_eq!(
            validate_response(FortuneType::BloodType, &CompletionBody::Structured(value)),
            Err(SchemaError::WrongType {
                field: "overall_luck".to_string(),
                expected: "a number",
            })
        );
    }

    #[test]
    fn missing_and_null_fields_are_rejected() {
        let mut value = blood_type_json();
        value.as_object_mut().unwrap().remove("advice");
        assert_eq!(
            validate_response(FortuneType::BloodType, &CompletionBody::Structured(value)),
            Err(SchemaError::MissingField("advice".to_string()))
        );

        let mut value = blood_type_json();
        value["work"] = Value::Null;
        assert!(matches!(
            validate_response(FortuneType::BloodType, &CompletionBody::Structured(value)),
            Err(SchemaError::MissingField(_))
        ));
    }

    #[test]
    fn list_field_must_be_array() {
        let mut value = blood_type_json();
        value["compatible_blood_types"] = json!("O형");
        assert!(matches!(
            validate_response(FortuneType::BloodType, &CompletionBody::Structured(value)),
            Err(SchemaError::WrongType { .. })
        ));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut value = blood_type_json();
        value["horoscope"] = json!("ignored");
        let payload =
            validate_response(FortuneType::BloodType, &CompletionBody::Structured(value)).unwrap();
        assert!(!payload.fields().contains_key("horoscope"));
    }

    #[test]
    fn prose_without_json_fails() {
        assert!(matches!(
            validate_response(
                FortuneType::Daily,
                &CompletionBody::Text("오늘은 좋은 날입니다".to_string())
            ),
            Err(SchemaError::NotJson(_))
        ));
        assert_eq!(
            validate_response(FortuneType::Daily, &CompletionBody::Structured(json!([1, 2]))),
            Err(SchemaError::NotAnObject)
        );
    }
}
