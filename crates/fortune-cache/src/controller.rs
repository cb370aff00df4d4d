//! Per-day idempotency and bounded regeneration
//!
//! State per `(user, fortune_type, date)` key:
//! `absent -> generated -> regenerated(n) -> quota exhausted`.
//!
//! # Invariants
//!
//! - At most one committed record per key; creation is a `put_if_absent`
//! - `generation_count` only grows; regeneration is a `compare_and_put` on
//!   the count the caller observed
//! - A writer that loses either race adopts the committed record instead of
//!   generating again
//! - Quota exhaustion is a result variant and never touches the store

use crate::clock::{Clock, SystemClock};
use crate::store::{PutOutcome, RecordStore};
use fortune_core::record::{META_ATTEMPT, META_TAGS};
use fortune_core::{
    validate_request, FortuneConfig, FortuneError, FortuneRecord, FortuneRequest, RecordKey,
    StoreError, TokenUsage,
};
use fortune_engine::category_tags;
use fortune_gateway::{GenerationGateway, GenerationOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// How a returned record was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Existing record returned without generating
    CacheHit,
    /// First generation for the key committed by this call
    Created,
    /// Regeneration committed by this call
    Regenerated,
    /// Another writer committed first; its record is returned
    ConflictResolved,
}

/// A record ready for the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    /// Committed record (owned copy)
    pub record: FortuneRecord,
    /// How it was obtained
    pub source: RecordSource,
    /// Provider usage spent by this call
    pub usage: TokenUsage,
}

/// Regeneration refused: the daily quota is used up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationLimitExceeded {
    /// Key whose quota is exhausted
    pub key: RecordKey,
    /// Stored generation count
    pub generation_count: u32,
    /// Regenerations allowed per day
    pub quota: u32,
}

impl fmt::Display for RegenerationLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "regeneration limit reached for {} ({} of {} used)",
            self.key,
            self.generation_count.saturating_sub(1),
            self.quota
        )
    }
}

/// Result of a controller call
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Record available
    Ready(Fetched),
    /// Regeneration refused; stored record untouched
    LimitExceeded(RegenerationLimitExceeded),
}

impl FetchOutcome {
    /// Record, if one is available
    #[inline]
    #[must_use]
    pub fn record(&self) -> Option<&FortuneRecord> {
        match self {
            Self::Ready(fetched) => Some(&fetched.record),
            Self::LimitExceeded(_) => None,
        }
    }

    /// Consume into the record, if one is available
    #[inline]
    #[must_use]
    pub fn into_record(self) -> Option<FortuneRecord> {
        match self {
            Self::Ready(fetched) => Some(fetched.record),
            Self::LimitExceeded(_) => None,
        }
    }

    /// Provider usage spent by the call
    #[inline]
    #[must_use]
    pub fn usage(&self) -> TokenUsage {
        match self {
            Self::Ready(fetched) => fetched.usage,
            Self::LimitExceeded(_) => TokenUsage::zero(),
        }
    }

    /// Check if the quota refused the call
    #[inline]
    #[must_use]
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, Self::LimitExceeded(_))
    }
}

/// Controller counters
#[derive(Debug, Default)]
pub struct ControllerStats {
    cache_hits: AtomicU64,
    created: AtomicU64,
    regenerated: AtomicU64,
    conflicts: AtomicU64,
    limit_exceeded: AtomicU64,
}

/// Point-in-time copy of [`ControllerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Existing records served
    pub cache_hits: u64,
    /// First generations committed
    pub created: u64,
    /// Regenerations committed
    pub regenerated: u64,
    /// Races lost and resolved by adopting the winner
    pub conflicts: u64,
    /// Regenerations refused by the quota
    pub limit_exceeded: u64,
}

impl ControllerStats {
    /// Copy current counters
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            regenerated: self.regenerated.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            limit_exceeded: self.limit_exceeded.load(Ordering::Relaxed),
        }
    }

    fn record(&self, source: RecordSource) {
        let counter = match source {
            RecordSource::CacheHit => &self.cache_hits,
            RecordSource::Created => &self.created,
            RecordSource::Regenerated => &self.regenerated,
            RecordSource::ConflictResolved => &self.conflicts,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Owner of committed fortune records
#[derive(Clone)]
pub struct DailyCacheController {
    store: Arc<dyn RecordStore>,
    gateway: GenerationGateway,
    clock: Arc<dyn Clock>,
    max_regenerations: u32,
    stats: Arc<ControllerStats>,
}

impl DailyCacheController {
    /// Create controller with the default quota and system clock
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, gateway: GenerationGateway) -> Self {
        Self::from_config(store, gateway, &FortuneConfig::default())
    }

    /// Create controller with quota and clock offset from config
    #[must_use]
    pub fn from_config(
        store: Arc<dyn RecordStore>,
        gateway: GenerationGateway,
        config: &FortuneConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            clock: Arc::new(SystemClock::from_config(config)),
            max_regenerations: config.max_regenerations_per_day,
            stats: Arc::new(ControllerStats::default()),
        }
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// With regeneration quota
    #[inline]
    #[must_use]
    pub fn with_max_regenerations(mut self, quota: u32) -> Self {
        self.max_regenerations = quota;
        self
    }

    /// Regenerations allowed per key per day
    #[inline]
    #[must_use]
    pub fn max_regenerations(&self) -> u32 {
        self.max_regenerations
    }

    /// Caller's calendar date
    #[inline]
    #[must_use]
    pub fn today(&self) -> chrono::NaiveDate {
        self.clock.today()
    }

    /// Counters
    #[inline]
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Return the committed record for the request's key, creating it if absent
    ///
    /// With `request.regenerate` set this is [`Self::regenerate`].
    ///
    /// # Errors
    /// - `InvalidInput` before any store access
    /// - `Store` when the store is unavailable
    /// - `Generation` when the fallback cannot run
    pub async fn fetch_or_create(
        &self,
        request: &FortuneRequest,
    ) -> Result<FetchOutcome, FortuneError> {
        validate_request(request)?;
        if request.regenerate {
            return self.regenerate_validated(request).await;
        }

        let key = request.key();
        if let Some(record) = self.store.get(&key).await? {
            tracing::debug!(%key, generation = record.generation_count, "Cache hit");
            return Ok(self.ready(record, RecordSource::CacheHit, TokenUsage::zero()));
        }

        self.create(request).await
    }

    /// Overwrite the committed record with a fresh generation
    ///
    /// Uses `attempt = generation_count` so each regeneration draws a new
    /// seed. An absent key is created as generation 1.
    ///
    /// # Errors
    /// Same as [`Self::fetch_or_create`]
    pub async fn regenerate(
        &self,
        request: &FortuneRequest,
    ) -> Result<FetchOutcome, FortuneError> {
        validate_request(request)?;
        self.regenerate_validated(request).await
    }

    async fn regenerate_validated(
        &self,
        request: &FortuneRequest,
    ) -> Result<FetchOutcome, FortuneError> {
        let key = request.key();
        let Some(current) = self.store.get(&key).await? else {
            tracing::debug!(%key, "Regenerate on absent key, creating");
            return self.create(request).await;
        };

        if current.regenerations_used() >= self.max_regenerations {
            self.stats.limit_exceeded.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                %key,
                generation = current.generation_count,
                quota = self.max_regenerations,
                "Regeneration limit reached"
            );
            return Ok(FetchOutcome::LimitExceeded(RegenerationLimitExceeded {
                key,
                generation_count: current.generation_count,
                quota: self.max_regenerations,
            }));
        }

        let observed = current.generation_count;
        let outcome = self.gateway.generate(request, observed).await?;
        let usage = outcome.usage;
        let record = self.build_record(key.clone(), outcome, observed + 1);

        match self.store.compare_and_put(observed, record.clone()).await? {
            PutOutcome::Committed => {
                tracing::info!(%key, generation = record.generation_count, "Regenerated record");
                Ok(self.ready(record, RecordSource::Regenerated, usage))
            }
            PutOutcome::Conflict { current } => self.adopt_winner(&key, current, usage).await,
        }
    }

    async fn create(&self, request: &FortuneRequest) -> Result<FetchOutcome, FortuneError> {
        let key = request.key();
        let outcome = self.gateway.generate(request, 0).await?;
        let usage = outcome.usage;
        let record = self.build_record(key.clone(), outcome, 1);

        match self.store.put_if_absent(record.clone()).await? {
            PutOutcome::Committed => {
                tracing::info!(%key, "Created record");
                Ok(self.ready(record, RecordSource::Created, usage))
            }
            PutOutcome::Conflict { current } => self.adopt_winner(&key, current, usage).await,
        }
    }

    async fn adopt_winner(
        &self,
        key: &RecordKey,
        current: Option<FortuneRecord>,
        usage: TokenUsage,
    ) -> Result<FetchOutcome, FortuneError> {
        let winner = match current {
            Some(record) => record,
            None => self.store.get(key).await?.ok_or_else(|| {
                StoreError::Unavailable(format!("record for {key} vanished after write conflict"))
            })?,
        };
        tracing::warn!(
            %key,
            generation = winner.generation_count,
            "Lost write race, adopting committed record"
        );
        Ok(self.ready(winner, RecordSource::ConflictResolved, usage))
    }

    fn build_record(
        &self,
        key: RecordKey,
        outcome: GenerationOutcome,
        generation_count: u32,
    ) -> FortuneRecord {
        let tags = category_tags(&outcome.payload.scores());
        FortuneRecord::new(key, outcome.payload, generation_count, self.clock.now())
            .with_provenance(&outcome.provenance)
            .with_metadata(META_ATTEMPT, outcome.attempt)
            .with_metadata(META_TAGS, tags)
    }

    fn ready(
        &self,
        record: FortuneRecord,
        source: RecordSource,
        usage: TokenUsage,
    ) -> FetchOutcome {
        self.stats.record(source);
        FetchOutcome::Ready(Fetched {
            record,
            source,
            usage,
        })
    }
}

impl fmt::Debug for DailyCacheController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DailyCacheController")
            .field("gateway", &self.gateway)
            .field("clock", &self.clock)
            .field("max_regenerations", &self.max_regenerations)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::InMemoryStore;
    use chrono::NaiveDate;
    use fortune_core::{Attributes, FallbackReason, FortuneType, Provenance, ValidationError};
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn controller(store: Arc<InMemoryStore>) -> DailyCacheController {
        let gateway = GenerationGateway::from_config(&FortuneConfig::default());
        DailyCacheController::new(store, gateway).with_clock(Arc::new(FixedClock::at_date(date())))
    }

    fn request() -> FortuneRequest {
        FortuneRequest::new("u1", FortuneType::BloodType, date()).with_attributes(
            Attributes::new()
                .with("birth_date", "1990-06-15")
                .with("blood_type", "A형"),
        )
    }

    fn ready(outcome: FetchOutcome) -> Fetched {
        match outcome {
            FetchOutcome::Ready(fetched) => fetched,
            FetchOutcome::LimitExceeded(limit) => panic!("unexpected limit: {limit}"),
        }
    }

    #[tokio::test]
    async fn first_call_creates_second_hits() {
        let store = Arc::new(InMemoryStore::new());
        let ctl = controller(store.clone());

        let first = ready(ctl.fetch_or_create(&request()).await.unwrap());
        assert_eq!(first.source, RecordSource::Created);
        assert_eq!(first.record.generation_count, 1);

        let second = ready(ctl.fetch_or_create(&request()).await.unwrap());
        assert_eq!(second.source, RecordSource::CacheHit);
        assert_eq!(second.record, first.record);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn record_carries_provenance_attempt_and_tags() {
        let ctl = controller(Arc::new(InMemoryStore::new()));
        let record = ready(ctl.fetch_or_create(&request()).await.unwrap()).record;
        assert_eq!(
            record.provenance(),
            Some(Provenance::Fallback {
                reason: FallbackReason::NoProvider
            })
        );
        assert_eq!(record.metadata[META_ATTEMPT], 0);
        assert!(record.metadata[META_TAGS].is_array());
        assert_eq!(record.created_at, FixedClock::at_date(date()).now());
    }

    #[tokio::test]
    async fn invalid_request_never_touches_store() {
        let store = Arc::new(InMemoryStore::new());
        let ctl = controller(store.clone());
        let bad = FortuneRequest::new("u1", FortuneType::BloodType, date());
        let err = ctl.fetch_or_create(&bad).await.unwrap_err();
        assert!(matches!(
            err,
            FortuneError::InvalidInput(ValidationError::MissingAttribute { .. })
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn regeneration_quota() {
        let store = Arc::new(InMemoryStore::new());
        let ctl = controller(store.clone()).with_max_regenerations(2);
        ctl.fetch_or_create(&request()).await.unwrap();

        let regen = request().with_regenerate(true);
        let r1 = ready(ctl.fetch_or_create(&regen).await.unwrap());
        assert_eq!(r1.source, RecordSource::Regenerated);
        assert_eq!(r1.record.generation_count, 2);
        assert_eq!(r1.record.metadata[META_ATTEMPT], 1);

        let r2 = ready(ctl.regenerate(&request()).await.unwrap());
        assert_eq!(r2.record.generation_count, 3);

        let refused = ctl.regenerate(&request()).await.unwrap();
        assert_eq!(
            refused,
            FetchOutcome::LimitExceeded(RegenerationLimitExceeded {
                key: request().key(),
                generation_count: 3,
                quota: 2,
            })
        );
        let stored = store.snapshot().pop().unwrap();
        assert_eq!(stored, r2.record);
        assert_eq!(ctl.stats().limit_exceeded, 1);
    }

    #[tokio::test]
    async fn zero_quota_refuses_every_regeneration() {
        let ctl = controller(Arc::new(InMemoryStore::new())).with_max_regenerations(0);
        ctl.fetch_or_create(&request()).await.unwrap();
        assert!(ctl.regenerate(&request()).await.unwrap().is_limit_exceeded());
    }

    #[tokio::test]
    async fn regenerate_on_absent_key_creates() {
        let ctl = controller(Arc::new(InMemoryStore::new()));
        let fetched = ready(ctl.regenerate(&request()).await.unwrap());
        assert_eq!(fetched.source, RecordSource::Created);
        assert_eq!(fetched.record.generation_count, 1);
    }

    #[tokio::test]
    async fn stale_regeneration_adopts_winner() {
        let store = Arc::new(InMemoryStore::new());
        let ctl = controller(store.clone());
        let created = ready(ctl.fetch_or_create(&request()).await.unwrap()).record;

        // Someone else regenerates between our read and our write.
        let mut winner = created.clone();
        winner.generation_count = 2;
        store.put(winner.clone()).await.unwrap();

        let outcome = ctl
            .adopt_winner(&created.key, None, TokenUsage::zero())
            .await
            .unwrap();
        assert_eq!(outcome.record(), Some(&winner));
        assert_eq!(ctl.stats().conflicts, 1);
    }

    #[tokio::test]
    async fn stats_track_sources() {
        let ctl = controller(Arc::new(InMemoryStore::new()));
        ctl.fetch_or_create(&request()).await.unwrap();
        ctl.fetch_or_create(&request()).await.unwrap();
        ctl.regenerate(&request()).await.unwrap();
        assert_eq!(
            ctl.stats(),
            StatsSnapshot {
                cache_hits: 1,
                created: 1,
                regenerated: 1,
                conflicts: 0,
                limit_exceeded: 0,
            }
        );
    }
}
