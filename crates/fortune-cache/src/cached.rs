//! Read-through record cache using moka
//!
//! Wraps any [`RecordStore`]: reads are served from a bounded in-process
//! cache when possible; every write goes to the inner store first and the
//! record the store ends up holding (ours or the conflicting winner) is
//! cached afterwards.
//!
//! Cached entries never move backwards: a record is only cached when its
//! `generation_count` is at least that of the entry already present, so a
//! late acknowledgement cannot shadow a newer committed generation.

use crate::store::{PutOutcome, RecordStore};
use async_trait::async_trait;
use fortune_core::{FortuneRecord, RecordKey, StoreError};
use moka::future::Cache;
use moka::ops::compute::Op;
use std::time::Duration;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Record store with a moka read-through layer
#[derive(Debug, Clone)]
pub struct CachedStore<S> {
    inner: S,
    cache: Cache<RecordKey, FortuneRecord>,
}

impl<S: RecordStore> CachedStore<S> {
    /// Create cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(inner: S, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(max_capacity),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(inner: S, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Wrapped store
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop one cached entry
    #[inline]
    pub async fn invalidate(&self, key: &RecordKey) {
        self.cache.invalidate(key).await;
    }

    /// Drop every cached entry
    #[inline]
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Check if `key` is cached
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &RecordKey) -> bool {
        self.cache.contains_key(key)
    }

    /// Get cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.cache.entry_count(),
        }
    }

    async fn remember(&self, outcome: &PutOutcome, written: FortuneRecord) {
        match outcome {
            PutOutcome::Committed => self.offer(written).await,
            PutOutcome::Conflict {
                current: Some(current),
            } => self.offer(current.clone()).await,
            PutOutcome::Conflict { current: None } => self.cache.invalidate(&written.key).await,
        }
    }

    /// Cache `record` unless a newer generation is already cached
    async fn offer(&self, record: FortuneRecord) {
        let generation = record.generation_count;
        self.cache
            .entry(record.key.clone())
            .and_compute_with(|cached| {
                let op = match cached {
                    Some(entry) if entry.value().generation_count > generation => Op::Nop,
                    _ => Op::Put(record),
                };
                std::future::ready(op)
            })
            .await;
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for CachedStore<S> {
    async fn get(&self, key: &RecordKey) -> Result<Option<FortuneRecord>, StoreError> {
        if let Some(hit) = self.cache.get(key).await {
            return Ok(Some(hit));
        }
        let record = self.inner.get(key).await?;
        if let Some(record) = &record {
            self.offer(record.clone()).await;
        }
        Ok(record)
    }

    async fn put_if_absent(&self, record: FortuneRecord) -> Result<PutOutcome, StoreError> {
        let outcome = self.inner.put_if_absent(record.clone()).await?;
        self.remember(&outcome, record).await;
        Ok(outcome)
    }

    async fn put(&self, record: FortuneRecord) -> Result<(), StoreError> {
        self.inner.put(record.clone()).await?;
        self.cache.insert(record.key.clone(), record).await;
        Ok(())
    }

    async fn compare_and_put(
        &self,
        expected_generation: u32,
        record: FortuneRecord,
    ) -> Result<PutOutcome, StoreError> {
        let outcome = self
            .inner
            .compare_and_put(expected_generation, record.clone())
            .await?;
        self.remember(&outcome, record).await;
        Ok(outcome)
    }
}
