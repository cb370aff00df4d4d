//! Attribute rule tables
//!
//! A rule pairs a condition on one attribute with a score delta aimed at the
//! base score or one sub-score. Every matching rule contributes; absent
//! attributes match nothing.

use fortune_core::attributes::{AGE, BLOOD_TYPE};
use fortune_core::{Attributes, FortuneType};
use serde::{Deserialize, Serialize};

/// Condition on a single attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// Attribute carries any usable value
    Present {
        /// Attribute name
        attribute: String,
    },
    /// String value equals (case-insensitive)
    Equals {
        /// Attribute name
        attribute: String,
        /// Expected value
        value: String,
    },
    /// String value is one of (case-insensitive)
    OneOf {
        /// Attribute name
        attribute: String,
        /// Accepted values
        values: Vec<String>,
    },
    /// Numeric value `>= threshold`
    AtLeast {
        /// Attribute name
        attribute: String,
        /// Inclusive threshold
        threshold: f64,
    },
    /// Numeric value `< threshold`
    Below {
        /// Attribute name
        attribute: String,
        /// Exclusive threshold
        threshold: f64,
    },
}

impl Condition {
    /// Attribute this condition reads
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            Self::Present { attribute }
            | Self::Equals { attribute, .. }
            | Self::OneOf { attribute, .. }
            | Self::AtLeast { attribute, .. }
            | Self::Below { attribute, .. } => attribute,
        }
    }

    /// Evaluate against attributes; absent or mistyped values never match
    #[must_use]
    pub fn matches(&self, attributes: &Attributes) -> bool {
        match self {
            Self::Present { attribute } => attributes.is_present(attribute),
            Self::Equals { attribute, value } => attributes
                .get_str(attribute)
                .is_some_and(|v| v.eq_ignore_ascii_case(value)),
            Self::OneOf { attribute, values } => attributes
                .get_str(attribute)
                .is_some_and(|v| values.iter().any(|x| v.eq_ignore_ascii_case(x))),
            Self::AtLeast {
                attribute,
                threshold,
            } => attributes
                .get_f64(attribute)
                .is_some_and(|v| v >= *threshold),
            Self::Below {
                attribute,
                threshold,
            } => attributes.get_f64(attribute).is_some_and(|v| v < *threshold),
        }
    }
}

/// Where a rule's delta lands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    /// Base score (propagates to every sub-score)
    Base,
    /// One named score field
    Category(String),
}

/// Named conditional delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule name (reported when applied)
    pub name: String,
    /// Condition
    pub condition: Condition,
    /// Delta target
    pub target: RuleTarget,
    /// Signed delta
    pub delta: i32,
}

impl Rule {
    /// Rule adjusting the base score
    #[must_use]
    pub fn base(name: impl Into<String>, condition: Condition, delta: i32) -> Self {
        Self {
            name: name.into(),
            condition,
            target: RuleTarget::Base,
            delta,
        }
    }

    /// Rule adjusting one score field
    #[must_use]
    pub fn category(
        name: impl Into<String>,
        category: impl Into<String>,
        condition: Condition,
        delta: i32,
    ) -> Self {
        Self {
            name: name.into(),
            condition,
            target: RuleTarget::Category(category.into()),
            delta,
        }
    }
}

/// Ordered set of rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With rule (builder)
    #[inline]
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Rules in table order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules whose condition matches
    pub fn matching<'a>(&'a self, attributes: &'a Attributes) -> impl Iterator<Item = &'a Rule> {
        self.rules.iter().filter(move |r| r.condition.matches(attributes))
    }

    /// Sum of matching base deltas
    #[must_use]
    pub fn base_delta(&self, attributes: &Attributes) -> i64 {
        self.matching(attributes)
            .filter(|r| r.target == RuleTarget::Base)
            .map(|r| i64::from(r.delta))
            .sum()
    }

    /// Sum of matching deltas aimed at `category`
    #[must_use]
    pub fn category_delta(&self, attributes: &Attributes, category: &str) -> i64 {
        self.matching(attributes)
            .filter(|r| matches!(&r.target, RuleTarget::Category(c) if c == category))
            .map(|r| i64::from(r.delta))
            .sum()
    }

    /// Built-in table for a fortune type
    #[must_use]
    pub fn defaults_for(fortune_type: FortuneType) -> Self {
        let table = Self::new()
            .with_rule(Rule::category(
                "young_energy",
                "health",
                below(AGE, 30.0),
                5,
            ))
            .with_rule(Rule::category(
                "senior_care",
                "health",
                at_least(AGE, 60.0),
                -5,
            ));

        match fortune_type {
            FortuneType::Daily => table
                .with_rule(Rule::base("birth_time_known", present("birth_time"), 2))
                .with_rule(Rule::category(
                    "partnered_love",
                    "love",
                    one_of("relationship_status", &["married", "dating"]),
                    6,
                )),
            FortuneType::Saju | FortuneType::Tojeong => table
                .with_rule(Rule::base("birth_time_known", present("birth_time"), 3))
                .with_rule(Rule::category(
                    "mature_wealth",
                    "wealth",
                    at_least(AGE, 40.0),
                    4,
                )),
            FortuneType::Salpuli => table
                .with_rule(Rule::category(
                    "recent_hardship",
                    "misfortune_risk",
                    present("recent_concern"),
                    8,
                ))
                .with_rule(Rule::category(
                    "carries_talisman",
                    "protection",
                    equals("has_talisman", "true"),
                    10,
                )),
            FortuneType::PastLife => table.with_rule(Rule::category(
                "old_soul",
                "karma_balance",
                at_least(AGE, 50.0),
                6,
            )),
            FortuneType::BloodType => table
                .with_rule(Rule::category(
                    "steady_type",
                    "work",
                    one_of(BLOOD_TYPE, &["A형", "AB형"]),
                    5,
                ))
                .with_rule(Rule::category(
                    "social_type",
                    "relationship",
                    one_of(BLOOD_TYPE, &["O형", "B형"]),
                    5,
                )),
            FortuneType::Career => table
                .with_rule(Rule::base(
                    "seasoned",
                    at_least("experience_years", 10.0),
                    15,
                ))
                .with_rule(Rule::base(
                    "early_career",
                    below("experience_years", 2.0),
                    -5,
                ))
                .with_rule(Rule::category(
                    "manages_team",
                    "leadership",
                    at_least("team_size", 5.0),
                    8,
                ))
                .with_rule(Rule::category(
                    "job_change",
                    "stability",
                    equals("changing_jobs", "true"),
                    -10,
                )),
            FortuneType::DreamInterpretation => table.with_rule(Rule::category(
                "vivid_dream",
                "symbolism_strength",
                equals("vividness", "high"),
                10,
            )),
        }
    }
}

fn present(attribute: &str) -> Condition {
    Condition::Present {
        attribute: attribute.to_string(),
    }
}

fn equals(attribute: &str, value: &str) -> Condition {
    Condition::Equals {
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

fn one_of(attribute: &str, values: &[&str]) -> Condition {
    Condition::OneOf {
        attribute: attribute.to_string(),
        values: values.iter().map(|v| (*v).to_string()).collect(),
    }
}

fn at_least(attribute: &str, threshold: f64) -> Condition {
    Condition::AtLeast {
        attribute: attribute.to_string(),
        threshold,
    }
}

fn below(attribute: &str, threshold: f64) -> Condition {
    Condition::Below {
        attribute: attribute.to_string(),
        threshold,
    }
}
