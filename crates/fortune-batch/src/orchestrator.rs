//! Package fan-out
//!
//! One `fetch_or_create` per package type, all in flight at once, each under
//! the same batch deadline. Results are collected positionally, so output
//! order is the package's declared order regardless of completion order.

use crate::result::{BatchItem, BatchItemError, BatchResult};
use crate::summary::PackageSummary;
use chrono::NaiveDate;
use fortune_cache::{DailyCacheController, FetchOutcome};
use fortune_core::{
    Attributes, FortuneConfig, FortuneError, FortuneRequest, FortuneType, PackageRegistry,
    TokenUsage, UserId,
};
use futures::future::join_all;
use indexmap::IndexMap;
use std::time::{Duration, Instant};
use ulid::Ulid;

/// Batch request for one package
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    /// Requesting user
    pub user_id: UserId,
    /// Package to generate
    pub package_id: String,
    /// Attributes shared by every type in the package
    pub attributes: Attributes,
    /// Target date; the controller's "today" when absent
    pub date: Option<NaiveDate>,
    /// Deadline override for this batch
    pub timeout: Option<Duration>,
    /// Regenerate every type instead of reusing today's records
    pub regenerate: bool,
}

impl BatchRequest {
    /// Create new batch request
    #[inline]
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, package_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            package_id: package_id.into(),
            attributes: Attributes::new(),
            date: None,
            timeout: None,
            regenerate: false,
        }
    }

    /// With attributes
    #[inline]
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// With target date
    #[inline]
    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// With batch deadline
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// With regenerate flag
    #[inline]
    #[must_use]
    pub fn with_regenerate(mut self, regenerate: bool) -> Self {
        self.regenerate = regenerate;
        self
    }
}

/// Generates whole packages through the daily cache
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    controller: DailyCacheController,
    packages: PackageRegistry,
    timeout: Duration,
}

impl BatchOrchestrator {
    /// Create orchestrator with the built-in packages and default deadline
    #[must_use]
    pub fn new(controller: DailyCacheController) -> Self {
        Self::from_config(controller, &FortuneConfig::default())
    }

    /// Create orchestrator with the deadline from config
    #[must_use]
    pub fn from_config(controller: DailyCacheController, config: &FortuneConfig) -> Self {
        Self {
            controller,
            packages: PackageRegistry::with_defaults(),
            timeout: config.batch_timeout(),
        }
    }

    /// With package registry
    #[inline]
    #[must_use]
    pub fn with_packages(mut self, packages: PackageRegistry) -> Self {
        self.packages = packages;
        self
    }

    /// With default batch deadline
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Registered packages
    #[inline]
    #[must_use]
    pub fn packages(&self) -> &PackageRegistry {
        &self.packages
    }

    /// Underlying controller
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &DailyCacheController {
        &self.controller
    }

    /// Generate every type in the request's package
    ///
    /// Per-type failures are returned inline; types still pending at the
    /// deadline are reported as [`BatchItemError::Timeout`] while completed
    /// types are kept.
    ///
    /// # Errors
    /// - `InvalidInput` for an unknown package id
    /// - `Store` when the record store is unavailable; the whole batch aborts
    pub async fn generate_batch(
        &self,
        request: &BatchRequest,
    ) -> Result<BatchResult, FortuneError> {
        let package = self.packages.resolve(&request.package_id)?;
        let date = request.date.unwrap_or_else(|| self.controller.today());
        let timeout = request.timeout.unwrap_or(self.timeout);
        let batch_id = Ulid::new();
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + timeout;

        tracing::info!(
            %batch_id,
            user = %request.user_id,
            package = %package.id,
            types = package.fortune_types.len(),
            %date,
            "Starting batch"
        );

        let calls = package.fortune_types.iter().map(|&fortune_type| {
            let item = FortuneRequest::new(request.user_id.clone(), fortune_type, date)
                .with_attributes(request.attributes.clone())
                .with_regenerate(request.regenerate);
            async move {
                let call = self.controller.fetch_or_create(&item);
                (fortune_type, tokio::time::timeout_at(deadline, call).await)
            }
        });
        let outcomes = join_all(calls).await;

        let after_ms = millis(timeout);
        let mut results: IndexMap<FortuneType, BatchItem> =
            IndexMap::with_capacity(outcomes.len());
        let mut token_usage = TokenUsage::zero();

        for (fortune_type, outcome) in outcomes {
            let item = match outcome {
                Err(_elapsed) => {
                    tracing::warn!(%batch_id, %fortune_type, after_ms, "Batch item timed out");
                    Err(BatchItemError::Timeout { after_ms })
                }
                Ok(Ok(FetchOutcome::Ready(fetched))) => {
                    token_usage = token_usage + fetched.usage;
                    Ok(fetched.record)
                }
                Ok(Ok(FetchOutcome::LimitExceeded(limit))) => {
                    Err(BatchItemError::LimitExceeded(limit))
                }
                Ok(Err(e)) => Err(item_error(&batch_id, fortune_type, e)?),
            };
            results.insert(fortune_type, item);
        }

        let mut result = BatchResult {
            batch_id,
            user_id: request.user_id.clone(),
            package_id: package.id.clone(),
            date,
            results,
            package_summary: None,
            token_usage,
            elapsed_ms: millis(started.elapsed()),
        };
        result.package_summary = PackageSummary::from_records(result.succeeded());

        tracing::info!(
            %batch_id,
            succeeded = result.success_count(),
            failed = result.failure_count(),
            total_tokens = result.token_usage.total_tokens,
            elapsed_ms = result.elapsed_ms,
            "Batch complete"
        );

        Ok(result)
    }
}

/// Per-type error, or the fatal error that aborts the batch
fn item_error(
    batch_id: &Ulid,
    fortune_type: FortuneType,
    error: FortuneError,
) -> Result<BatchItemError, FortuneError> {
    match error {
        FortuneError::InvalidInput(e) => {
            tracing::info!(%batch_id, %fortune_type, error = %e, "Batch item rejected");
            Ok(BatchItemError::Validation(e))
        }
        FortuneError::Generation(e) => {
            tracing::warn!(%batch_id, %fortune_type, error = %e, "Batch item failed");
            Ok(BatchItemError::Generation(e))
        }
        fatal => {
            tracing::error!(%batch_id, %fortune_type, error = %fatal, "Aborting batch");
            Err(fatal)
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
