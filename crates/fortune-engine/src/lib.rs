//! Fortune Engine - deterministic scoring and fallback composition
//!
//! Provides:
//! - [`SeedGenerator`]: reproducible streams keyed by `(user, date, type, attempt)`
//! - [`RuleTable`]: attribute conditions mapped to score deltas
//! - [`ScoreEngine`]: bounded, correlated score sets with grades and tags
//! - [`RuleBasedFallback`]: complete payloads without any external call
//!
//! Everything here is pure: no I/O, no clocks, no shared state.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod fallback;
pub mod rules;
pub mod score;
pub mod seed;
pub mod tables;

pub use fallback::{FallbackGenerator, RuleBasedFallback};
pub use rules::{Condition, Rule, RuleTable, RuleTarget};
pub use score::{category_tags, Grade, ScoreEngine, ScoreSet};
pub use seed::{DeterministicStream, SeedContext, SeedGenerator};
