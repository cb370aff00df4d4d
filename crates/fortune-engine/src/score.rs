//! Rule-based score composition
//!
//! Pure and total: a seeded base score, accumulated rule deltas, correlated
//! sub-scores with independent seeded drift, and mandatory clamping into each
//! field's catalog bound.

use crate::rules::RuleTable;
use crate::seed::DeterministicStream;
use fortune_core::catalog::OVERALL_LUCK;
use fortune_core::{Attributes, FortuneConfig, FortuneSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    /// Below 55
    Caution,
    /// 55..70
    Fair,
    /// 70..85
    Good,
    /// 85 and above
    Excellent,
}

impl Grade {
    /// Grade for a score
    #[must_use]
    pub fn of(score: i32) -> Self {
        match score {
            s if s >= 85 => Self::Excellent,
            s if s >= 70 => Self::Good,
            s if s >= 55 => Self::Fair,
            _ => Self::Caution,
        }
    }

    /// Stable identifier
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Caution => "caution",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

/// How a sub-score relates to the base score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CategoryProfile {
    offset: i32,
    inverted: bool,
}

impl CategoryProfile {
    const fn shifted(offset: i32) -> Self {
        Self {
            offset,
            inverted: false,
        }
    }
}

fn profile(category: &str) -> CategoryProfile {
    match category {
        "wealth" => CategoryProfile::shifted(-3),
        "love" | "second_half" | "soul_connection" => CategoryProfile::shifted(3),
        "career" | "work" | "fortune_signal" => CategoryProfile::shifted(-2),
        "personality_match" => CategoryProfile::shifted(4),
        "first_half" => CategoryProfile::shifted(-4),
        "karma_balance" => CategoryProfile::shifted(-5),
        "growth" => CategoryProfile::shifted(2),
        "leadership" => CategoryProfile::shifted(-6),
        "symbolism_strength" => CategoryProfile::shifted(5),
        "misfortune_risk" => CategoryProfile {
            offset: 0,
            inverted: true,
        },
        _ => CategoryProfile::shifted(0),
    }
}

/// Result of scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSet {
    /// Base score after rule deltas, before clamping
    pub base: i64,
    /// Clamped scores by field name
    pub scores: BTreeMap<String, i32>,
    /// Names of rules that matched
    pub applied_rules: Vec<String>,
}

impl ScoreSet {
    /// Score by field name
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<i32> {
        self.scores.get(field).copied()
    }

    /// Headline score
    #[inline]
    #[must_use]
    pub fn overall(&self) -> Option<i32> {
        self.get(OVERALL_LUCK)
    }

    /// Grade by field name
    #[must_use]
    pub fn grade(&self, field: &str) -> Option<Grade> {
        self.get(field).map(Grade::of)
    }

    /// Grades for every field
    #[must_use]
    pub fn grades(&self) -> BTreeMap<String, Grade> {
        self.scores
            .iter()
            .map(|(k, v)| (k.clone(), Grade::of(*v)))
            .collect()
    }

    /// Category tags, see [`category_tags`]
    #[inline]
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        category_tags(&self.scores)
    }
}

/// Category tags: `strong_<field>` for excellent, `weak_<field>` for caution
///
/// The headline score is never tagged.
#[must_use]
pub fn category_tags(scores: &BTreeMap<String, i32>) -> Vec<String> {
    scores
        .iter()
        .filter(|(k, _)| k.as_str() != OVERALL_LUCK)
        .filter_map(|(k, v)| match Grade::of(*v) {
            Grade::Excellent => Some(format!("strong_{k}")),
            Grade::Caution => Some(format!("weak_{k}")),
            _ => None,
        })
        .collect()
}

/// Rule-based scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEngine {
    base_range: (i32, i32),
    spread: i32,
}

impl ScoreEngine {
    /// Create engine with an explicit base range and sub-score spread
    #[inline]
    #[must_use]
    pub fn new(base_range: (i32, i32), spread: i32) -> Self {
        Self {
            base_range,
            spread: i32::try_from(spread.unsigned_abs()).unwrap_or(i32::MAX),
        }
    }

    /// Engine configured from pipeline config
    #[inline]
    #[must_use]
    pub fn from_config(config: &FortuneConfig) -> Self {
        Self::new(config.base_score_range, config.sub_score_spread)
    }

    /// Score one fortune
    ///
    /// Draw order is fixed (base first, then one drift per non-headline
    /// score field in catalog order), so identical streams give identical
    /// score sets.
    pub fn score(
        &self,
        stream: &mut DeterministicStream,
        attributes: &Attributes,
        rules: &RuleTable,
        spec: &FortuneSpec,
    ) -> ScoreSet {
        let (lo, hi) = self.base_range;
        let base = i64::from(stream.next_int(lo, hi)) + rules.base_delta(attributes);

        let scores = spec
            .score_fields()
            .map(|(name, bound)| {
                let category_delta = rules.category_delta(attributes, name);
                let raw = if name == OVERALL_LUCK {
                    base + category_delta
                } else {
                    let drift = i64::from(stream.next_int(-self.spread, self.spread));
                    let p = profile(name);
                    let anchor = if p.inverted { 100 - base } else { base };
                    anchor + i64::from(p.offset) + drift + category_delta
                };
                (name.to_string(), bound.clamp(raw))
            })
            .collect();

        let applied_rules = rules
            .matching(attributes)
            .map(|r| r.name.clone())
            .collect();

        ScoreSet {
            base,
            scores,
            applied_rules,
        }
    }
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::from_config(&FortuneConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::SeedGenerator;
    use chrono::NaiveDate;
    use fortune_core::{spec_for, FortuneType, UserId};
    use proptest::prelude::*;

    fn stream(attempt: u32) -> DeterministicStream {
        SeedGenerator::new().seed(
            &UserId::new("u1"),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            FortuneType::Career,
            attempt,
        )
    }

    #[test]
    fn grades_partition_scores() {
        assert_eq!(Grade::of(95), Grade::Excellent);
        assert_eq!(Grade::of(85), Grade::Excellent);
        assert_eq!(Grade::of(84), Grade::Good);
        assert_eq!(Grade::of(55), Grade::Fair);
        assert_eq!(Grade::of(54), Grade::Caution);
    }

    #[test]
    fn same_stream_same_scores() {
        let engine = ScoreEngine::default();
        let spec = spec_for(FortuneType::Career);
        let rules = RuleTable::defaults_for(FortuneType::Career);
        let attrs = Attributes::new().with("experience_years", 3);
        let a = engine.score(&mut stream(0), &attrs, &rules, spec);
        let b = engine.score(&mut stream(0), &attrs, &rules, spec);
        assert_eq!(a, b);
    }

    #[test]
    fn every_score_field_is_present() {
        let engine = ScoreEngine::default();
        for t in FortuneType::ALL {
            let spec = spec_for(t);
            let set = engine.score(&mut stream(0), &Attributes::new(), &RuleTable::new(), spec);
            assert_eq!(set.scores.len(), spec.score_fields().count());
        }
    }

    #[test]
    fn experience_bonus_raises_base() {
        let engine = ScoreEngine::default();
        let spec = spec_for(FortuneType::Career);
        let rules = RuleTable::defaults_for(FortuneType::Career);
        let plain = engine.score(&mut stream(0), &Attributes::new(), &rules, spec);
        let seasoned = engine.score(
            &mut stream(0),
            &Attributes::new().with("experience_years", 12),
            &rules,
            spec,
        );
        assert_eq!(seasoned.base, plain.base + 15);
        assert_eq!(seasoned.applied_rules, vec!["seasoned".to_string()]);
    }

    #[test]
    fn extreme_deltas_are_clamped_not_errors() {
        let engine = ScoreEngine::default();
        let spec = spec_for(FortuneType::Career);
        let rules = RuleTable::new().with_rule(crate::rules::Rule::base(
            "huge",
            crate::rules::Condition::Present {
                attribute: "x".to_string(),
            },
            10_000,
        ));
        let set = engine.score(&mut stream(0), &Attributes::new().with("x", 1), &rules, spec);
        assert_eq!(set.overall(), Some(95));
        assert!(set.scores.values().all(|v| *v == 100 || *v == 95));
    }

    #[test]
    fn deltas_beyond_i32_saturate_into_bounds() {
        use crate::rules::{Condition, Rule};
        let present = || Condition::Present {
            attribute: "x".to_string(),
        };
        let engine = ScoreEngine::new((60, 95), i32::MIN);
        let spec = spec_for(FortuneType::Career);
        let rules = RuleTable::new()
            .with_rule(Rule::base("a", present(), i32::MAX))
            .with_rule(Rule::base("b", present(), 1))
            .with_rule(Rule::category("c", "leadership", present(), i32::MAX));
        let attrs = Attributes::new().with("x", 1);

        let set = engine.score(&mut stream(0), &attrs, &rules, spec);
        assert!(set.base > i64::from(i32::MAX));
        assert_eq!(set.overall(), Some(95));
        for (name, value) in &set.scores {
            let (_, bound) = spec.score_fields().find(|(n, _)| *n == name.as_str()).unwrap();
            assert!(bound.contains(*value), "{name}={value}");
        }

        let sunk = RuleTable::new()
            .with_rule(Rule::base("a", present(), i32::MIN))
            .with_rule(Rule::base("b", present(), -1));
        let set = engine.score(&mut stream(0), &attrs, &sunk, spec);
        assert_eq!(set.overall(), Some(50));
    }

    #[test]
    fn tags_skip_headline_and_middle_grades() {
        let set = ScoreSet {
            base: 80,
            scores: [
                ("overall_luck".to_string(), 90),
                ("health".to_string(), 88),
                ("wealth".to_string(), 45),
                ("love".to_string(), 70),
            ]
            .into_iter()
            .collect(),
            applied_rules: vec![],
        };
        assert_eq!(set.tags(), vec!["strong_health".to_string(), "weak_wealth".to_string()]);
        assert_eq!(set.grade("love"), Some(Grade::Good));
        assert_eq!(set.grades().len(), 4);
    }

    proptest! {
        #[test]
        fn scores_stay_in_catalog_bounds(
            attempt in 0u32..500,
            years in -50i32..80,
            type_idx in 0usize..8,
        ) {
            let t = FortuneType::ALL[type_idx];
            let spec = spec_for(t);
            let rules = RuleTable::defaults_for(t);
            let attrs = Attributes::new()
                .with("experience_years", years)
                .with("age", years)
                .with("birth_time", "07:30");
            let set = ScoreEngine::default().score(&mut stream(attempt), &attrs, &rules, spec);
            for (name, bound) in spec.score_fields() {
                let v = set.get(name).unwrap();
                prop_assert!(bound.contains(v), "{} = {} outside {:?}", name, v, bound);
            }
        }
    }
}
