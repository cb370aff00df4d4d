//! Generation gateway
//!
//! Two-path contract:
//! 1. Provider path: render prompt, call the provider under a deadline,
//!    validate the response against the catalog schema
//! 2. Fallback path: deterministic rule-based composition, taken when no
//!    provider is configured or the provider path fails for any reason
//!
//! Both paths are successes to the caller. Which one ran is reported as
//! [`Provenance`]; token usage is non-zero only on the provider path.

use crate::prompt::PromptBuilder;
use crate::provider::{ProviderError, TextProvider};
use crate::schema::validate_response;
use fortune_core::{
    FallbackReason, FortuneConfig, FortunePayload, FortuneRequest, GenerationError, Pricing,
    Provenance, TokenUsage,
};
use fortune_engine::{FallbackGenerator, RuleBasedFallback};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of one generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    /// Typed content
    pub payload: FortunePayload,
    /// Which path produced the content
    pub provenance: Provenance,
    /// Provider usage (zero on fallback)
    pub usage: TokenUsage,
    /// Attempt the content was generated for
    pub attempt: u32,
}

/// Provider-first generator with deterministic fallback
#[derive(Clone)]
pub struct GenerationGateway {
    provider: Option<Arc<dyn TextProvider>>,
    fallback: Arc<dyn FallbackGenerator>,
    prompts: PromptBuilder,
    pricing: Pricing,
    timeout: Duration,
}

impl GenerationGateway {
    /// Create fallback-only gateway
    #[must_use]
    pub fn new(fallback: Arc<dyn FallbackGenerator>) -> Self {
        let config = FortuneConfig::default();
        Self {
            provider: None,
            fallback,
            prompts: PromptBuilder::new(),
            pricing: config.pricing,
            timeout: config.provider_timeout(),
        }
    }

    /// Create fallback-only gateway from pipeline config
    #[must_use]
    pub fn from_config(config: &FortuneConfig) -> Self {
        Self::new(Arc::new(RuleBasedFallback::from_config(config)))
            .with_pricing(config.pricing)
            .with_timeout(config.provider_timeout())
    }

    /// With provider
    #[inline]
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn TextProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// With fallback generator
    #[inline]
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackGenerator>) -> Self {
        self.fallback = fallback;
        self
    }

    /// With prompt builder
    #[inline]
    #[must_use]
    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// With pricing
    #[inline]
    #[must_use]
    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    /// With default provider deadline
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Default provider deadline
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check if a provider is configured
    #[inline]
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Generate under the default provider deadline
    ///
    /// # Errors
    /// `FallbackFailed` only when the fallback itself cannot run
    pub async fn generate(
        &self,
        request: &FortuneRequest,
        attempt: u32,
    ) -> Result<GenerationOutcome, GenerationError> {
        self.generate_within(request, attempt, self.timeout).await
    }

    /// Generate with an explicit provider deadline
    ///
    /// # Errors
    /// `FallbackFailed` only when the fallback itself cannot run
    pub async fn generate_within(
        &self,
        request: &FortuneRequest,
        attempt: u32,
        timeout: Duration,
    ) -> Result<GenerationOutcome, GenerationError> {
        let reason = match &self.provider {
            None => FallbackReason::NoProvider,
            Some(provider) => {
                match self
                    .try_provider(provider.as_ref(), request, attempt, timeout)
                    .await
                {
                    Ok(outcome) => return Ok(outcome),
                    Err(reason) => reason,
                }
            }
        };

        let payload = self.fallback.generate(request, attempt).map_err(|e| {
            tracing::error!(
                key = %request.key(),
                attempt,
                error = %e,
                "Fallback generation failed"
            );
            e
        })?;

        tracing::info!(
            key = %request.key(),
            attempt,
            reason = reason.as_str(),
            "Generated via fallback"
        );

        Ok(GenerationOutcome {
            payload,
            provenance: Provenance::Fallback { reason },
            usage: TokenUsage::zero(),
            attempt,
        })
    }

    async fn try_provider(
        &self,
        provider: &dyn TextProvider,
        request: &FortuneRequest,
        attempt: u32,
        timeout: Duration,
    ) -> Result<GenerationOutcome, FallbackReason> {
        let prompt = self.prompts.build(request, attempt);
        let started = Instant::now();

        let completion = match tokio::time::timeout(timeout, provider.complete(&prompt)).await {
            Err(_) | Ok(Err(ProviderError::Timeout)) => {
                tracing::warn!(
                    key = %request.key(),
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "Provider timed out"
                );
                return Err(FallbackReason::Timeout);
            }
            Ok(Err(e)) => {
                tracing::warn!(key = %request.key(), error = %e, "Provider call failed");
                return Err(FallbackReason::ProviderError);
            }
            Ok(Ok(completion)) => completion,
        };

        let payload = validate_response(request.fortune_type, &completion.body).map_err(|e| {
            tracing::warn!(
                key = %request.key(),
                model = %completion.model,
                error = %e,
                "Provider response failed validation"
            );
            FallbackReason::InvalidResponse
        })?;

        let usage = self
            .pricing
            .usage(completion.prompt_tokens, completion.completion_tokens);

        tracing::info!(
            key = %request.key(),
            attempt,
            model = %completion.model,
            total_tokens = usage.total_tokens,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Generated via provider"
        );

        Ok(GenerationOutcome {
            payload,
            provenance: Provenance::Provider {
                model: completion.model,
            },
            usage,
            attempt,
        })
    }
}

impl fmt::Debug for GenerationGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationGateway")
            .field("has_provider", &self.has_provider())
            .field("fallback", &self.fallback)
            .field("pricing", &self.pricing)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Completion, MockTextProvider};
    use chrono::NaiveDate;
    use fortune_core::{Attributes, FortuneType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request() -> FortuneRequest {
        FortuneRequest::new(
            "u1",
            FortuneType::BloodType,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        )
        .with_attributes(
            Attributes::new()
                .with("birth_date", "1990-06-15")
                .with("blood_type", "A형"),
        )
    }

    fn valid_completion() -> Completion {
        Completion::structured(
            "test-model",
            json!({
                "overall_luck": 81,
                "personality_match": 90,
                "relationship": 70,
                "work": 64,
                "personality": "꼼꼼함",
                "today_message": "좋은 하루",
                "advice": "쉬어가세요",
                "lucky_color": "파란색",
                "lucky_item": "손수건",
                "compatible_blood_types": ["O형", "AB형"]
            }),
        )
        .with_usage(1000, 500)
    }

    fn gateway_with(mock: MockTextProvider) -> GenerationGateway {
        GenerationGateway::from_config(&FortuneConfig::default())
            .with_provider(Arc::new(mock))
            .with_pricing(Pricing::new(0.01, 0.02))
    }

    #[tokio::test]
    async fn provider_success_reports_usage_and_model() {
        let mut mock = MockTextProvider::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Ok(valid_completion()));

        let outcome = gateway_with(mock).generate(&request(), 0).await.unwrap();
        assert_eq!(
            outcome.provenance,
            Provenance::Provider {
                model: "test-model".to_string()
            }
        );
        assert_eq!(outcome.payload.overall_luck(), 81);
        assert_eq!(outcome.usage.total_tokens, 1500);
        assert!((outcome.usage.estimated_cost - 0.02).abs() < 1e-9);
    }

    #[tokio::test]
    async fn provider_error_falls_back_with_zero_usage() {
        let mut mock = MockTextProvider::new();
        mock.expect_complete()
            .returning(|_| Err(ProviderError::RateLimited));

        let outcome = gateway_with(mock).generate(&request(), 0).await.unwrap();
        assert_eq!(
            outcome.provenance,
            Provenance::Fallback {
                reason: FallbackReason::ProviderError
            }
        );
        assert!(outcome.usage.is_zero());
    }

    #[tokio::test]
    async fn invalid_response_falls_back() {
        let mut mock = MockTextProvider::new();
        mock.expect_complete()
            .returning(|_| Ok(Completion::text("test-model", "운세: 좋음").with_usage(10, 10)));

        let outcome = gateway_with(mock).generate(&request(), 0).await.unwrap();
        assert_eq!(
            outcome.provenance,
            Provenance::Fallback {
                reason: FallbackReason::InvalidResponse
            }
        );
        assert!(outcome.usage.is_zero());
    }

    #[tokio::test]
    async fn provider_reported_timeout_is_a_timeout() {
        let mut mock = MockTextProvider::new();
        mock.expect_complete()
            .returning(|_| Err(ProviderError::Timeout));

        let outcome = gateway_with(mock).generate(&request(), 0).await.unwrap();
        assert_eq!(
            outcome.provenance,
            Provenance::Fallback {
                reason: FallbackReason::Timeout
            }
        );
    }

    #[tokio::test]
    async fn no_provider_uses_fallback() {
        let gateway = GenerationGateway::from_config(&FortuneConfig::default());
        assert!(!gateway.has_provider());
        let outcome = gateway.generate(&request(), 0).await.unwrap();
        assert_eq!(
            outcome.provenance,
            Provenance::Fallback {
                reason: FallbackReason::NoProvider
            }
        );
    }

    #[tokio::test]
    async fn fallback_matches_direct_composition() {
        let gateway = GenerationGateway::from_config(&FortuneConfig::default());
        let outcome = gateway.generate(&request(), 2).await.unwrap();
        let direct = RuleBasedFallback::new().generate(&request(), 2).unwrap();
        assert_eq!(outcome.payload, direct);
        assert_eq!(outcome.attempt, 2);
    }

    #[tokio::test]
    async fn prompt_carries_attempt() {
        let mut mock = MockTextProvider::new();
        mock.expect_complete()
            .withf(|prompt| prompt.attempt == 3 && prompt.fortune_type == FortuneType::BloodType)
            .times(1)
            .returning(|_| Ok(valid_completion()));

        gateway_with(mock).generate(&request(), 3).await.unwrap();
    }

    #[test]
    fn debug_hides_provider() {
        let gateway = GenerationGateway::from_config(&FortuneConfig::default());
        let text = format!("{gateway:?}");
        assert!(text.contains("has_provider: false"));
    }
}
