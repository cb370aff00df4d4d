//! Token usage and cost accounting

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Provider pricing per 1,000 tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    /// Cost per 1k prompt tokens
    pub prompt_cost_per_1k: f64,
    /// Cost per 1k completion tokens
    pub completion_cost_per_1k: f64,
}

impl Pricing {
    /// Create new pricing
    #[inline]
    #[must_use]
    pub const fn new(prompt_cost_per_1k: f64, completion_cost_per_1k: f64) -> Self {
        Self {
            prompt_cost_per_1k,
            completion_cost_per_1k,
        }
    }

    /// Usage for the given token counts
    #[must_use]
    pub fn usage(&self, prompt_tokens: u64, completion_tokens: u64) -> TokenUsage {
        #[allow(clippy::cast_precision_loss)]
        let estimated_cost = (prompt_tokens as f64 / 1000.0) * self.prompt_cost_per_1k
            + (completion_tokens as f64 / 1000.0) * self.completion_cost_per_1k;
        TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            estimated_cost,
        }
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::new(0.0005, 0.0015)
    }
}

/// Tokens consumed by provider calls
///
/// Zero for cache hits and fallback generations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens
    pub prompt_tokens: u64,
    /// Completion tokens
    pub completion_tokens: u64,
    /// Prompt + completion
    pub total_tokens: u64,
    /// Estimated cost in pricing currency
    pub estimated_cost: f64,
}

impl TokenUsage {
    /// No usage
    #[inline]
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Check if nothing was consumed
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.total_tokens == 0
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
            estimated_cost: self.estimated_cost + rhs.estimated_cost,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for TokenUsage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}
