//! Deterministic fallback generation
//!
//! Composes a complete, schema-valid payload from a seeded stream:
//! - Scores from [`ScoreEngine`] under the fortune type's rule table
//! - Insights sampled from grade-keyed sentence pools
//! - Lucky items sampled from static pools or read from fixed trait tables
//!
//! Fields are composed in catalog order from one stream, so a given
//! `(user, date, fortune_type, attempt)` always yields the same payload.

use crate::rules::RuleTable;
use crate::score::{Grade, ScoreEngine, ScoreSet};
use crate::seed::{DeterministicStream, SeedGenerator};
use crate::tables::{self, Sal};
use fortune_core::catalog::OVERALL_LUCK;
use fortune_core::{
    spec_for, Attributes, FieldKind, FortuneConfig, FortunePayload, FortuneRequest, FortuneType,
    GenerationError,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Attribute holding a dream description
pub const DREAM_CONTENT: &str = "dream_content";

/// Produces a payload without any external call
pub trait FallbackGenerator: Send + Sync + fmt::Debug {
    /// Generate content for `request` at `attempt`
    ///
    /// # Errors
    /// `FallbackFailed` when the composition itself cannot run
    fn generate(
        &self,
        request: &FortuneRequest,
        attempt: u32,
    ) -> Result<FortunePayload, GenerationError>;
}

/// Rule-based fallback over seeded streams
#[derive(Debug, Clone)]
pub struct RuleBasedFallback {
    seeds: SeedGenerator,
    engine: ScoreEngine,
    rules: HashMap<FortuneType, RuleTable>,
}

impl RuleBasedFallback {
    /// Create fallback with default scoring and built-in rule tables
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(ScoreEngine::default())
    }

    /// Create fallback from pipeline config
    #[must_use]
    pub fn from_config(config: &FortuneConfig) -> Self {
        Self::with_engine(ScoreEngine::from_config(config))
    }

    /// Create fallback around a score engine
    #[must_use]
    pub fn with_engine(engine: ScoreEngine) -> Self {
        Self {
            seeds: SeedGenerator::new(),
            engine,
            rules: FortuneType::ALL
                .into_iter()
                .map(|t| (t, RuleTable::defaults_for(t)))
                .collect(),
        }
    }

    /// With seed generator
    #[inline]
    #[must_use]
    pub fn with_seed_generator(mut self, seeds: SeedGenerator) -> Self {
        self.seeds = seeds;
        self
    }

    /// With rule table for one fortune type (replaces the built-in table)
    #[inline]
    #[must_use]
    pub fn with_rules(mut self, fortune_type: FortuneType, rules: RuleTable) -> Self {
        self.rules.insert(fortune_type, rules);
        self
    }

    /// Compose payload and the score set it was built from
    ///
    /// # Errors
    /// `FallbackFailed` when a field has no composer or a required trait
    /// lookup fails
    pub fn compose(
        &self,
        request: &FortuneRequest,
        attempt: u32,
    ) -> Result<(FortunePayload, ScoreSet), GenerationError> {
        let fortune_type = request.fortune_type;
        let spec = spec_for(fortune_type);
        let attributes = request.attributes.with_derived(request.date);
        let mut stream = self
            .seeds
            .seed(&request.user_id, request.date, fortune_type, attempt);

        let empty = RuleTable::new();
        let rules = self.rules.get(&fortune_type).unwrap_or(&empty);
        let score_set = self.engine.score(&mut stream, &attributes, rules, spec);

        let mut composer = Composer {
            fortune_type,
            stream,
            attributes: &attributes,
            scores: &score_set,
            sal: None,
        };

        let mut fields = Map::new();
        for field in spec.fields {
            let value = match field.kind {
                FieldKind::Score(_) => score_set.get(field.name).map(Value::from),
                FieldKind::Insight => composer.insight(field.name)?.map(Value::from),
                FieldKind::LuckyItem | FieldKind::LuckyList => composer.lucky(field.name)?,
            };
            let value = value.ok_or_else(|| {
                failed(
                    fortune_type,
                    format!("no composer for field '{}'", field.name),
                )
            })?;
            fields.insert(field.name.to_string(), value);
        }

        let payload = FortunePayload::from_fields(fortune_type, fields)
            .map_err(|e| failed(fortune_type, e.to_string()))?;

        tracing::debug!(
            fortune_type = %fortune_type,
            attempt,
            base = score_set.base,
            rules = ?score_set.applied_rules,
            "Composed fallback payload"
        );

        Ok((payload, score_set))
    }
}

impl Default for RuleBasedFallback {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackGenerator for RuleBasedFallback {
    fn generate(
        &self,
        request: &FortuneRequest,
        attempt: u32,
    ) -> Result<FortunePayload, GenerationError> {
        self.compose(request, attempt).map(|(payload, _)| payload)
    }
}

fn failed(fortune_type: FortuneType, reason: impl Into<String>) -> GenerationError {
    GenerationError::FallbackFailed {
        fortune_type,
        reason: reason.into(),
    }
}

struct Composer<'a> {
    fortune_type: FortuneType,
    stream: DeterministicStream,
    attributes: &'a Attributes,
    scores: &'a ScoreSet,
    sal: Option<&'static Sal>,
}

impl Composer<'_> {
    fn pick(&mut self, pool: &[&'static str]) -> &'static str {
        self.stream.pick(pool).copied().unwrap_or_default()
    }

    fn pick_many(&mut self, pool: &[&'static str], n: usize) -> Vec<String> {
        self.stream
            .pick_many(pool, n)
            .into_iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    fn grade(&self) -> Grade {
        Grade::of(self.scores.overall().unwrap_or_default())
    }

    fn score(&self, field: &str) -> i32 {
        self.scores.get(field).unwrap_or_default()
    }

    // Salpuli's detected sal and remedy must agree.
    fn sal(&mut self) -> &'static Sal {
        if let Some(sal) = self.sal {
            return sal;
        }
        let sal = self.stream.pick(tables::SALS).unwrap_or(&tables::SALS[0]);
        self.sal = Some(sal);
        sal
    }

    fn blood_traits(&self) -> Result<&'static tables::BloodTypeTraits, GenerationError> {
        let canonical = self
            .attributes
            .blood_type()
            .ok()
            .flatten()
            .ok_or_else(|| failed(self.fortune_type, "blood type unavailable"))?;
        tables::blood_type_traits(canonical)
            .ok_or_else(|| failed(self.fortune_type, format!("no traits for {canonical}")))
    }

    fn insight(&mut self, field: &str) -> Result<Option<String>, GenerationError> {
        let grade = self.grade();
        let text = match field {
            "summary" => format!(
                "총운 {}점. {}",
                self.score(OVERALL_LUCK),
                self.pick(tables::outlook(grade))
            ),
            "today_message" | "yearly_summary" | "interpretation" => {
                self.pick(tables::outlook(grade)).to_string()
            }
            "advice" => self.pick(tables::advice(grade)).to_string(),
            "caution" => self.pick(tables::CAUTIONS).to_string(),
            "day_master" => format!("일간은 {}입니다.", self.pick(tables::DAY_MASTERS)),
            "element_balance" => {
                let pair = self.pick_many(tables::ELEMENTS, 2);
                match pair.as_slice() {
                    [strong, weak] => format!("{strong} 기운이 강하고 {weak} 기운이 약합니다."),
                    _ => return Ok(None),
                }
            }
            "yearly_flow" => format!(
                "{} 기운이 들어오는 해입니다. {}",
                self.pick(tables::ELEMENTS),
                self.pick(tables::outlook(grade))
            ),
            "hexagram" => {
                let upper = self.stream.next_int(1, 8);
                let middle = self.stream.next_int(1, 6);
                let lower = self.stream.next_int(1, 3);
                format!("{upper}{middle}{lower}괘")
            }
            "monthly_highlight" => {
                let month = self.stream.next_int(1, 12);
                format!("{month}월에 {}.", self.pick(tables::MONTHLY_NOTES))
            }
            "detected_sal" => self.sal().name.to_string(),
            "remedy" => self.sal().remedy.to_string(),
            "past_identity" => self.pick(tables::PAST_IDENTITIES).to_string(),
            "era" => self.pick(tables::ERAS).to_string(),
            "lesson" => self.pick(tables::LESSONS).to_string(),
            "personality" => self.blood_traits()?.personality.to_string(),
            "current_phase" => format!(
                "성장 {}점, 안정 {}점의 흐름입니다. {}",
                self.score("growth"),
                self.score("stability"),
                self.pick(tables::outlook(grade))
            ),
            "opportunity" => self.pick(tables::OPPORTUNITIES).to_string(),
            "symbol_meaning" => {
                let dream = self.attributes.get_str(DREAM_CONTENT).unwrap_or_default();
                match tables::DREAM_SYMBOLS
                    .iter()
                    .find(|(symbol, _)| dream.contains(symbol))
                {
                    Some((symbol, meaning)) => format!("{symbol}: {meaning}"),
                    None => self.pick(tables::GENERIC_DREAM_MEANINGS).to_string(),
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(text))
    }

    fn lucky(&mut self, field: &str) -> Result<Option<Value>, GenerationError> {
        let value = match field {
            "lucky_color" => Value::from(self.pick(tables::COLORS)),
            "lucky_number" => Value::from(self.stream.next_int(1, 45).to_string()),
            "lucky_direction" => Value::from(self.pick(tables::DIRECTIONS)),
            "lucky_element" => Value::from(self.pick(tables::ELEMENTS)),
            "lucky_month" => Value::from(format!("{}월", self.stream.next_int(1, 12))),
            "lucky_item" => Value::from(self.pick(tables::LUCKY_ITEMS)),
            "talisman_color" => Value::from(self.pick(tables::TALISMAN_COLORS)),
            "ritual_items" => Value::from(self.pick_many(tables::RITUAL_ITEMS, 3)),
            "guardian_symbols" => Value::from(self.pick_many(tables::GUARDIAN_SYMBOLS, 2)),
            "recommended_skills" => Value::from(self.pick_many(tables::SKILLS, 3)),
            "compatible_blood_types" => Value::from(
                self.blood_traits()?
                    .compatible
                    .iter()
                    .map(|s| (*s).to_string())
                    .collect::<Vec<_>>(),
            ),
            "lucky_numbers" => {
                let pool: Vec<i32> = (1..=45).collect();
                let mut numbers: Vec<i32> =
                    self.stream.pick_many(&pool, 3).into_iter().copied().collect();
                numbers.sort_unstable();
                Value::from(
                    numbers
                        .into_iter()
                        .map(|n| n.to_string())
                        .collect::<Vec<_>>(),
                )
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fortune_core::attributes::{BIRTH_DATE, BLOOD_TYPE};
    use fortune_core::payload::BloodTypeReading;
    use fortune_core::LuckyValue;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn full_attributes() -> Attributes {
        Attributes::new()
            .with(BIRTH_DATE, "1990-06-15")
            .with(BLOOD_TYPE, "A형")
            .with("occupation", "engineer")
            .with("experience_years", 12)
            .with(DREAM_CONTENT, "커다란 돼지가 집으로 들어왔다")
    }

    fn request(t: FortuneType) -> FortuneRequest {
        FortuneRequest::new("u1", t, date()).with_attributes(full_attributes())
    }

    #[test]
    fn composes_every_fortune_type() {
        let fallback = RuleBasedFallback::new();
        for t in FortuneType::ALL {
            let payload = fallback.generate(&request(t), 0).unwrap();
            assert_eq!(payload.fortune_type(), t);
        }
    }

    #[test]
    fn blood_type_scenario() {
        let payload = RuleBasedFallback::new()
            .generate(&request(FortuneType::BloodType), 0)
            .unwrap();
        let FortunePayload::BloodType(BloodTypeReading {
            overall_luck,
            personality_match,
            compatible_blood_types,
            ..
        }) = payload
        else {
            panic!("wrong variant");
        };
        assert!((50..=95).contains(&overall_luck));
        assert!((45..=100).contains(&personality_match));
        assert_eq!(compatible_blood_types, vec!["O형".to_string(), "AB형".to_string()]);
    }

    #[test]
    fn blood_type_spelling_is_normalized() {
        let req = FortuneRequest::new("u1", FortuneType::BloodType, date())
            .with_attributes(Attributes::new().with(BLOOD_TYPE, "ab"));
        let payload = RuleBasedFallback::new().generate(&req, 0).unwrap();
        assert_eq!(
            payload.lucky_items()["compatible_blood_types"],
            LuckyValue::Many(vec!["A형".to_string(), "B형".to_string()])
        );
    }

    #[test]
    fn missing_blood_type_is_a_fallback_failure() {
        let req = FortuneRequest::new("u1", FortuneType::BloodType, date());
        let err = RuleBasedFallback::new().generate(&req, 0).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::FallbackFailed {
                fortune_type: FortuneType::BloodType,
                ..
            }
        ));
    }

    #[test]
    fn same_attempt_same_payload() {
        let fallback = RuleBasedFallback::new();
        let req = request(FortuneType::Daily);
        assert_eq!(
            fallback.generate(&req, 1).unwrap(),
            fallback.generate(&req, 1).unwrap()
        );
    }

    #[test]
    fn attempts_differ() {
        let fallback = RuleBasedFallback::new();
        let req = request(FortuneType::Saju);
        let payloads: Vec<_> = (0..4).map(|a| fallback.generate(&req, a).unwrap()).collect();
        assert!(payloads.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn detected_sal_matches_remedy() {
        let payload = RuleBasedFallback::new()
            .generate(&request(FortuneType::Salpuli), 0)
            .unwrap();
        let insights = payload.insights();
        let sal = tables::SALS
            .iter()
            .find(|s| s.name == insights["detected_sal"])
            .unwrap();
        assert_eq!(insights["remedy"], sal.remedy);
    }

    #[test]
    fn dream_symbol_is_recognised() {
        let payload = RuleBasedFallback::new()
            .generate(&request(FortuneType::DreamInterpretation), 0)
            .unwrap();
        assert!(payload.insights()["symbol_meaning"].starts_with("돼지"));
    }

    #[test]
    fn career_rules_are_reported() {
        let (_, scores) = RuleBasedFallback::new()
            .compose(&request(FortuneType::Career), 0)
            .unwrap();
        assert!(scores.applied_rules.contains(&"seasoned".to_string()));
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let fallback =
            RuleBasedFallback::new().with_rules(FortuneType::Career, RuleTable::new());
        let (_, scores) = fallback.compose(&request(FortuneType::Career), 0).unwrap();
        assert!(scores.applied_rules.is_empty());
    }

    proptest! {
        #[test]
        fn fallback_scores_stay_in_bounds(user in "[a-z0-9]{1,12}", attempt in 0u32..50, type_idx in 0usize..8) {
            let t = FortuneType::ALL[type_idx];
            let req = FortuneRequest::new(user.as_str(), t, date()).with_attributes(full_attributes());
            let payload = RuleBasedFallback::new().generate(&req, attempt).unwrap();
            let spec = spec_for(t);
            for (name, value) in payload.scores() {
                let bound = spec.bound(&name).unwrap();
                prop_assert!(bound.contains(value), "{} = {}", name, value);
            }
        }
    }
}
