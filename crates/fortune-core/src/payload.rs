//! Typed fortune payloads
//!
//! One struct per fortune type, unified by [`FortunePayload`], an internally
//! tagged union discriminated by `fortune_type`. Field names mirror the
//! catalog so the map views (`scores`, `insights`, `lucky_items`) can be
//! derived generically.

#![allow(missing_docs)]

use crate::catalog::{spec_for, FieldKind};
use crate::types::FortuneType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Lucky item value: single or list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LuckyValue {
    /// Single item
    One(String),
    /// Several items
    Many(Vec<String>),
}

/// `daily`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyReading {
    pub overall_luck: i32,
    pub health: i32,
    pub wealth: i32,
    pub love: i32,
    pub career: i32,
    pub summary: String,
    pub advice: String,
    pub caution: String,
    pub lucky_color: String,
    pub lucky_number: String,
    pub lucky_direction: String,
}

/// `saju`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SajuReading {
    pub overall_luck: i32,
    pub wealth: i32,
    pub health: i32,
    pub love: i32,
    pub career: i32,
    pub day_master: String,
    pub element_balance: String,
    pub yearly_flow: String,
    pub advice: String,
    pub lucky_color: String,
    pub lucky_direction: String,
    pub lucky_element: String,
}

/// `tojeong`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TojeongReading {
    pub overall_luck: i32,
    pub first_half: i32,
    pub second_half: i32,
    pub hexagram: String,
    pub yearly_summary: String,
    pub monthly_highlight: String,
    pub lucky_month: String,
    pub lucky_direction: String,
}

/// `salpuli`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalpuliReading {
    pub overall_luck: i32,
    pub protection: i32,
    pub misfortune_risk: i32,
    pub detected_sal: String,
    pub remedy: String,
    pub advice: String,
    pub talisman_color: String,
    pub ritual_items: Vec<String>,
}

/// `past-life`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastLifeReading {
    pub overall_luck: i32,
    pub karma_balance: i32,
    pub soul_connection: i32,
    pub past_identity: String,
    pub era: String,
    pub lesson: String,
    pub lucky_color: String,
    pub guardian_symbols: Vec<String>,
}

/// `blood-type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodTypeReading {
    pub overall_luck: i32,
    pub personality_match: i32,
    pub relationship: i32,
    pub work: i32,
    pub personality: String,
    pub today_message: String,
    pub advice: String,
    pub lucky_color: String,
    pub lucky_item: String,
    pub compatible_blood_types: Vec<String>,
}

/// `career`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerReading {
    pub overall_luck: i32,
    pub growth: i32,
    pub leadership: i32,
    pub stability: i32,
    pub current_phase: String,
    pub opportunity: String,
    pub advice: String,
    pub lucky_color: String,
    pub recommended_skills: Vec<String>,
}

/// `dream-interpretation`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreamReading {
    pub overall_luck: i32,
    pub symbolism_strength: i32,
    pub fortune_signal: i32,
    pub interpretation: String,
    pub symbol_meaning: String,
    pub advice: String,
    pub lucky_numbers: Vec<String>,
    pub lucky_color: String,
}

/// Fortune content, discriminated by `fortune_type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fortune_type", rename_all = "kebab-case")]
pub enum FortunePayload {
    /// `daily`
    Daily(DailyReading),
    /// `saju`
    Saju(SajuReading),
    /// `tojeong`
    Tojeong(TojeongReading),
    /// `salpuli`
    Salpuli(SalpuliReading),
    /// `past-life`
    PastLife(PastLifeReading),
    /// `blood-type`
    BloodType(BloodTypeReading),
    /// `career`
    Career(CareerReading),
    /// `dream-interpretation`
    DreamInterpretation(DreamReading),
}

impl FortunePayload {
    /// Build a payload from a field map
    ///
    /// The map must hold every catalog field of `fortune_type` with the
    /// right JSON type; any `fortune_type` entry in the map is overwritten.
    ///
    /// # Errors
    /// Returns the deserialization error for missing or mistyped fields
    pub fn from_fields(
        fortune_type: FortuneType,
        mut fields: Map<String, Value>,
    ) -> Result<Self, serde_json::Error> {
        fields.insert(
            "fortune_type".to_string(),
            Value::String(fortune_type.as_str().to_string()),
        );
        serde_json::from_value(Value::Object(fields))
    }

    /// Discriminant
    #[must_use]
    pub fn fortune_type(&self) -> FortuneType {
        match self {
            Self::Daily(_) => FortuneType::Daily,
            Self::Saju(_) => FortuneType::Saju,
            Self::Tojeong(_) => FortuneType::Tojeong,
            Self::Salpuli(_) => FortuneType::Salpuli,
            Self::PastLife(_) => FortuneType::PastLife,
            Self::BloodType(_) => FortuneType::BloodType,
            Self::Career(_) => FortuneType::Career,
            Self::DreamInterpretation(_) => FortuneType::DreamInterpretation,
        }
    }

    /// Headline score shared by every type
    #[must_use]
    pub fn overall_luck(&self) -> i32 {
        match self {
            Self::Daily(r) => r.overall_luck,
            Self::Saju(r) => r.overall_luck,
            Self::Tojeong(r) => r.overall_luck,
            Self::Salpuli(r) => r.overall_luck,
            Self::PastLife(r) => r.overall_luck,
            Self::BloodType(r) => r.overall_luck,
            Self::Career(r) => r.overall_luck,
            Self::DreamInterpretation(r) => r.overall_luck,
        }
    }

    /// Flat field map without the discriminant
    #[must_use]
    pub fn fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("fortune_type");
                map
            }
            _ => Map::new(),
        }
    }

    /// Score view
    #[must_use]
    pub fn scores(&self) -> BTreeMap<String, i32> {
        let fields = self.fields();
        spec_for(self.fortune_type())
            .score_fields()
            .filter_map(|(name, _)| {
                let value = fields.get(name)?.as_i64()?;
                Some((name.to_string(), i32::try_from(value).ok()?))
            })
            .collect()
    }

    /// Insight view
    #[must_use]
    pub fn insights(&self) -> BTreeMap<String, String> {
        let fields = self.fields();
        spec_for(self.fortune_type())
            .insight_fields()
            .filter_map(|name| {
                let text = fields.get(name)?.as_str()?;
                Some((name.to_string(), text.to_string()))
            })
            .collect()
    }

    /// Lucky item view
    #[must_use]
    pub fn lucky_items(&self) -> BTreeMap<String, LuckyValue> {
        let fields = self.fields();
        spec_for(self.fortune_type())
            .lucky_fields()
            .filter_map(|field| {
                let value = fields.get(field.name)?;
                let lucky = match field.kind {
                    FieldKind::LuckyList => LuckyValue::Many(
                        value
                            .as_array()?
                            .iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .collect(),
                    ),
                    _ => LuckyValue::One(value.as_str()?.to_string()),
                };
                Some((field.name.to_string(), lucky))
            })
            .collect()
    }
}
