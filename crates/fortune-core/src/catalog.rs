//! Fortune type catalog
//!
//! Static per-type definitions: output fields with their kinds and score
//! bounds, required request attributes, and the provider prompt template.
//! Both the provider response validator and the fallback composer read
//! their schema from here, so the two paths can never disagree.

use crate::attributes::{BIRTH_DATE, BLOOD_TYPE};
use crate::error::ValidationError;
use crate::types::{FortuneRequest, FortuneType};
use serde::{Deserialize, Serialize};

/// Closed score interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBound {
    /// Inclusive lower bound
    pub min: i32,
    /// Inclusive upper bound
    pub max: i32,
}

impl ScoreBound {
    /// Bound for `overall_luck` on every fortune type
    pub const OVERALL: ScoreBound = ScoreBound::new(50, 95);
    /// Default bound for component scores
    pub const COMPONENT: ScoreBound = ScoreBound::new(40, 100);

    /// Create new bound
    #[inline]
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Silently truncate into the bound
    #[inline]
    #[must_use]
    pub fn clamp(&self, value: i64) -> i32 {
        // Bounds fit in i32, so the clamped value does too.
        i32::try_from(value.clamp(i64::from(self.min), i64::from(self.max))).unwrap_or(self.min)
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Output field kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer score within a bound
    Score(ScoreBound),
    /// Narrative text
    Insight,
    /// Single lucky item
    LuckyItem,
    /// List of lucky items
    LuckyList,
}

/// One output field of a fortune type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name (unique within the type)
    pub name: &'static str,
    /// Field kind
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn score(name: &'static str, bound: ScoreBound) -> Self {
        Self {
            name,
            kind: FieldKind::Score(bound),
        }
    }

    const fn insight(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Insight,
        }
    }

    const fn item(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::LuckyItem,
        }
    }

    const fn list(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::LuckyList,
        }
    }
}

/// Static definition of a fortune type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FortuneSpec {
    /// Fortune type
    pub fortune_type: FortuneType,
    /// Display title
    pub title: &'static str,
    /// Attributes that must be present on the request
    pub required_attributes: &'static [&'static str],
    /// Output fields in declaration order
    pub fields: &'static [FieldSpec],
    /// Provider prompt template with `{{attribute}}` placeholders
    pub prompt_template: &'static str,
}

impl FortuneSpec {
    /// Score fields with bounds
    pub fn score_fields(&self) -> impl Iterator<Item = (&'static str, ScoreBound)> + '_ {
        self.fields.iter().filter_map(|f| match f.kind {
            FieldKind::Score(bound) => Some((f.name, bound)),
            _ => None,
        })
    }

    /// Insight field names
    pub fn insight_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::Insight)
            .map(|f| f.name)
    }

    /// Lucky item fields (single and list)
    pub fn lucky_fields(&self) -> impl Iterator<Item = &FieldSpec> + '_ {
        self.fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::LuckyItem | FieldKind::LuckyList))
    }

    /// Bound for a score field
    #[must_use]
    pub fn bound(&self, field: &str) -> Option<ScoreBound> {
        self.score_fields()
            .find(|(name, _)| *name == field)
            .map(|(_, bound)| bound)
    }

    /// Field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Score field every fortune type carries
pub const OVERALL_LUCK: &str = "overall_luck";

const DAILY: FortuneSpec = FortuneSpec {
    fortune_type: FortuneType::Daily,
    title: "오늘의 운세",
    required_attributes: &[BIRTH_DATE],
    fields: &[
        FieldSpec::score(OVERALL_LUCK, ScoreBound::OVERALL),
        FieldSpec::score("health", ScoreBound::COMPONENT),
        FieldSpec::score("wealth", ScoreBound::COMPONENT),
        FieldSpec::score("love", ScoreBound::COMPONENT),
        FieldSpec::score("career", ScoreBound::COMPONENT),
        FieldSpec::insight("summary"),
        FieldSpec::insight("advice"),
        FieldSpec::insight("caution"),
        FieldSpec::item("lucky_color"),
        FieldSpec::item("lucky_number"),
        FieldSpec::item("lucky_direction"),
    ],
    prompt_template: "생년월일 {{birth_date}}, 성별 {{gender}}인 사용자의 {{date}} 오늘의 운세를 \
                      총운, 건강, 재물, 애정, 직업으로 나누어 알려주세요.",
};

const SAJU: FortuneSpec = FortuneSpec {
    fortune_type: FortuneType::Saju,
    title: "사주팔자",
    required_attributes: &[BIRTH_DATE],
    fields: &[
        FieldSpec::score(OVERALL_LUCK, ScoreBound::OVERALL),
        FieldSpec::score("wealth", ScoreBound::COMPONENT),
        FieldSpec::score("health", ScoreBound::COMPONENT),
        FieldSpec::score("love", ScoreBound::COMPONENT),
        FieldSpec::score("career", ScoreBound::COMPONENT),
        FieldSpec::insight("day_master"),
        FieldSpec::insight("element_balance"),
        FieldSpec::insight("yearly_flow"),
        FieldSpec::insight("advice"),
        FieldSpec::item("lucky_color"),
        FieldSpec::item("lucky_direction"),
        FieldSpec::item("lucky_element"),
    ],
    prompt_template: "생년월일 {{birth_date}}, 태어난 시각 {{birth_time}}, 성별 {{gender}}의 \
                      사주팔자를 분석하고 {{date}} 기준의 흐름을 설명해주세요.",
};

const TOJEONG: FortuneSpec = FortuneSpec {
    fortune_type: FortuneType::Tojeong,
    title: "토정비결",
    required_attributes: &[BIRTH_DATE],
    fields: &[
        FieldSpec::score(OVERALL_LUCK, ScoreBound::OVERALL),
        FieldSpec::score("first_half", ScoreBound::COMPONENT),
        FieldSpec::score("second_half", ScoreBound::COMPONENT),
        FieldSpec::insight("hexagram"),
        FieldSpec::insight("yearly_summary"),
        FieldSpec::insight("monthly_highlight"),
        FieldSpec::item("lucky_month"),
        FieldSpec::item("lucky_direction"),
    ],
    prompt_template: "생년월일 {{birth_date}}인 사용자의 토정비결 괘를 뽑고 {{date}}이 속한 \
                      해의 상반기와 하반기 운세를 풀이해주세요.",
};

const SALPULI: FortuneSpec = FortuneSpec {
    fortune_type: FortuneType::Salpuli,
    title: "살풀이",
    required_attributes: &[BIRTH_DATE],
    fields: &[
        FieldSpec::score(OVERALL_LUCK, ScoreBound::OVERALL),
        FieldSpec::score("protection", ScoreBound::COMPONENT),
        FieldSpec::score("misfortune_risk", ScoreBound::new(10, 70)),
        FieldSpec::insight("detected_sal"),
        FieldSpec::insight("remedy"),
        FieldSpec::insight("advice"),
        FieldSpec::item("talisman_color"),
        FieldSpec::list("ritual_items"),
    ],
    prompt_template: "생년월일 {{birth_date}}, 성별 {{gender}}인 사용자에게 들어온 살을 찾고 \
                      {{date}} 기준의 풀이 방법을 제시해주세요.",
};

const PAST_LIFE: FortuneSpec = FortuneSpec {
    fortune_type: FortuneType::PastLife,
    title: "전생",
    required_attributes: &[BIRTH_DATE],
    fields: &[
        FieldSpec::score(OVERALL_LUCK, ScoreBound::OVERALL),
        FieldSpec::score("karma_balance", ScoreBound::COMPONENT),
        FieldSpec::score("soul_connection", ScoreBound::COMPONENT),
        FieldSpec::insight("past_identity"),
        FieldSpec::insight("era"),
        FieldSpec::insight("lesson"),
        FieldSpec::item("lucky_color"),
        FieldSpec::list("guardian_symbols"),
    ],
    prompt_template: "생년월일 {{birth_date}}, 성별 {{gender}}인 사용자의 전생 이야기와 \
                      현생에 남은 과제를 들려주세요.",
};

const BLOOD_TYPE_SPEC: FortuneSpec = FortuneSpec {
    fortune_type: FortuneType::BloodType,
    title: "혈액형 운세",
    required_attributes: &[BLOOD_TYPE],
    fields: &[
        FieldSpec::score(OVERALL_LUCK, ScoreBound::OVERALL),
        FieldSpec::score("personality_match", ScoreBound::new(45, 100)),
        FieldSpec::score("relationship", ScoreBound::COMPONENT),
        FieldSpec::score("work", ScoreBound::COMPONENT),
        FieldSpec::insight("personality"),
        FieldSpec::insight("today_message"),
        FieldSpec::insight("advice"),
        FieldSpec::item("lucky_color"),
        FieldSpec::item("lucky_item"),
        FieldSpec::list("compatible_blood_types"),
    ],
    prompt_template: "혈액형 {{blood_type}}, 생년월일 {{birth_date}}인 사용자의 성격과 \
                      {{date}} 운세를 알려주세요.",
};

const CAREER: FortuneSpec = FortuneSpec {
    fortune_type: FortuneType::Career,
    title: "직업운",
    required_attributes: &[BIRTH_DATE, "occupation"],
    fields: &[
        FieldSpec::score(OVERALL_LUCK, ScoreBound::OVERALL),
        FieldSpec::score("growth", ScoreBound::COMPONENT),
        FieldSpec::score("leadership", ScoreBound::COMPONENT),
        FieldSpec::score("stability", ScoreBound::COMPONENT),
        FieldSpec::insight("current_phase"),
        FieldSpec::insight("opportunity"),
        FieldSpec::insight("advice"),
        FieldSpec::item("lucky_color"),
        FieldSpec::list("recommended_skills"),
    ],
    prompt_template: "생년월일 {{birth_date}}, 직업 {{occupation}}, 경력 {{experience_years}}년인 \
                      사용자의 {{date}} 직업운과 성장 방향을 알려주세요.",
};

const DREAM: FortuneSpec = FortuneSpec {
    fortune_type: FortuneType::DreamInterpretation,
    title: "꿈 해몽",
    required_attributes: &["dream_content"],
    fields: &[
        FieldSpec::score(OVERALL_LUCK, ScoreBound::OVERALL),
        FieldSpec::score("symbolism_strength", ScoreBound::COMPONENT),
        FieldSpec::score("fortune_signal", ScoreBound::COMPONENT),
        FieldSpec::insight("interpretation"),
        FieldSpec::insight("symbol_meaning"),
        FieldSpec::insight("advice"),
        FieldSpec::list("lucky_numbers"),
        FieldSpec::item("lucky_color"),
    ],
    prompt_template: "다음 꿈을 해몽하고 길흉을 판단해주세요: \"{{dream_content}}\" \
                      (꿈꾼 날짜 {{date}})",
};

/// Catalog entry for a fortune type
#[must_use]
pub fn spec_for(fortune_type: FortuneType) -> &'static FortuneSpec {
    match fortune_type {
        FortuneType::Daily => &DAILY,
        FortuneType::Saju => &SAJU,
        FortuneType::Tojeong => &TOJEONG,
        FortuneType::Salpuli => &SALPULI,
        FortuneType::PastLife => &PAST_LIFE,
        FortuneType::BloodType => &BLOOD_TYPE_SPEC,
        FortuneType::Career => &CAREER,
        FortuneType::DreamInterpretation => &DREAM,
    }
}

/// Validate a request against its fortune type before any generation
///
/// Checks required attributes and the well-formedness of typed attributes
/// that are present (birth date, blood type).
///
/// # Errors
/// - `MissingAttribute` for the first absent required attribute
/// - `InvalidAttribute` for a malformed birth date or unknown blood type
pub fn validate_request(request: &FortuneRequest) -> Result<(), ValidationError> {
    let spec = spec_for(request.fortune_type);

    if let Some(missing) = spec
        .required_attributes
        .iter()
        .find(|name| !request.attributes.is_present(name))
    {
        return Err(ValidationError::MissingAttribute {
            fortune_type: request.fortune_type,
            attribute: (*missing).to_string(),
        });
    }

    request.attributes.birth_date()?;
    request.attributes.blood_type()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attributes;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn request(t: FortuneType, attrs: Attributes) -> FortuneRequest {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        FortuneRequest::new("u1", t, date).with_attributes(attrs)
    }

    #[test]
    fn every_type_has_overall_luck_in_standard_bound() {
        for t in FortuneType::ALL {
            let spec = spec_for(t);
            assert_eq!(spec.fortune_type, t);
            assert_eq!(spec.bound(OVERALL_LUCK), Some(ScoreBound::OVERALL));
        }
    }

    #[test]
    fn field_names_are_unique_per_type() {
        for t in FortuneType::ALL {
            let spec = spec_for(t);
            let names: HashSet<_> = spec.fields.iter().map(|f| f.name).collect();
            assert_eq!(names.len(), spec.fields.len(), "duplicate field in {t}");
        }
    }

    #[test]
    fn blood_type_bounds() {
        let spec = spec_for(FortuneType::BloodType);
        assert_eq!(spec.bound("personality_match"), Some(ScoreBound::new(45, 100)));
        assert_eq!(spec.bound("summary"), None);
    }

    #[test]
    fn clamp_truncates_silently() {
        let bound = ScoreBound::OVERALL;
        assert_eq!(bound.clamp(120), 95);
        assert_eq!(bound.clamp(-3), 50);
        assert_eq!(bound.clamp(70), 70);
        assert_eq!(bound.clamp(i64::MAX), 95);
    }

    #[test]
    fn missing_required_attribute_fails() {
        let err = validate_request(&request(FortuneType::BloodType, Attributes::new()))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingAttribute {
                fortune_type: FortuneType::BloodType,
                attribute: BLOOD_TYPE.to_string(),
            }
        );
    }

    #[test]
    fn malformed_optional_birth_date_fails() {
        let attrs = Attributes::new()
            .with(BLOOD_TYPE, "A형")
            .with(BIRTH_DATE, "yesterday");
        assert!(validate_request(&request(FortuneType::BloodType, attrs)).is_err());
    }

    #[test]
    fn unknown_blood_type_fails() {
        let attrs = Attributes::new().with(BLOOD_TYPE, "Z");
        assert!(matches!(
            validate_request(&request(FortuneType::BloodType, attrs)),
            Err(ValidationError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn complete_request_passes() {
        let attrs = Attributes::new()
            .with(BIRTH_DATE, "1990-06-15")
            .with("occupation", "engineer");
        assert!(validate_request(&request(FortuneType::Career, attrs)).is_ok());
    }
}
