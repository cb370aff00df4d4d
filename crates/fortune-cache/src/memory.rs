//! In-memory record store
//!
//! Sharded by key via `DashMap`; conditional writes run under the shard's
//! entry lock, so racing writers on one key serialize while unrelated keys
//! never contend.

use crate::store::{PutOutcome, RecordStore};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fortune_core::{FortuneRecord, RecordKey, StoreError};

/// DashMap-backed record store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<RecordKey, FortuneRecord>,
}

impl InMemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store pre-populated with records (later duplicates win)
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = FortuneRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.key.clone(), r)).collect(),
        }
    }

    /// Copy of every stored record, ordered by key
    #[must_use]
    pub fn snapshot(&self) -> Vec<FortuneRecord> {
        let mut records: Vec<_> = self.records.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    /// Number of stored records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<FortuneRecord>, StoreError> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn put_if_absent(&self, record: FortuneRecord) -> Result<PutOutcome, StoreError> {
        match self.records.entry(record.key.clone()) {
            Entry::Occupied(existing) => Ok(PutOutcome::Conflict {
                current: Some(existing.get().clone()),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(PutOutcome::Committed)
            }
        }
    }

    async fn put(&self, record: FortuneRecord) -> Result<(), StoreError> {
        self.records.insert(record.key.clone(), record);
        Ok(())
    }

    async fn compare_and_put(
        &self,
        expected_generation: u32,
        record: FortuneRecord,
    ) -> Result<PutOutcome, StoreError> {
        match self.records.entry(record.key.clone()) {
            Entry::Occupied(mut existing) => {
                if existing.get().generation_count == expected_generation {
                    existing.insert(record);
                    Ok(PutOutcome::Committed)
                } else {
                    Ok(PutOutcome::Conflict {
                        current: Some(existing.get().clone()),
                    })
                }
            }
            Entry::Vacant(_) => Ok(PutOutcome::Conflict { current: None }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use fortune_core::{FortuneRequest, FortuneType};
    use fortune_engine::{FallbackGenerator, RuleBasedFallback};

    fn record(count: u32) -> FortuneRecord {
        let request = FortuneRequest::new(
            "u1",
            FortuneType::Salpuli,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        );
        let payload = RuleBasedFallback::new().generate(&request, count).unwrap();
        FortuneRecord::new(
            request.key(),
            payload,
            count,
            Utc.with_ymd_and_hms(2024, 1, 10, 3, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn put_if_absent_never_overwrites() {
        let store = InMemoryStore::new();
        assert!(store.put_if_absent(record(1)).await.unwrap().is_committed());
        let outcome = store.put_if_absent(record(2)).await.unwrap();
        assert_eq!(
            outcome,
            PutOutcome::Conflict {
                current: Some(record(1))
            }
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn compare_and_put_checks_generation() {
        let store = InMemoryStore::new();
        store.put_if_absent(record(1)).await.unwrap();

        let stale = store.compare_and_put(2, record(3)).await.unwrap();
        assert!(!stale.is_committed());

        assert!(store.compare_and_put(1, record(2)).await.unwrap().is_committed());
        let key = record(1).key;
        assert_eq!(store.get(&key).await.unwrap().unwrap().generation_count, 2);
    }

    #[tokio::test]
    async fn compare_and_put_on_absent_key_conflicts() {
        let store = InMemoryStore::new();
        assert_eq!(
            store.compare_and_put(1, record(2)).await.unwrap(),
            PutOutcome::Conflict { current: None }
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn snapshot_round_trips() {
        let store = InMemoryStore::new();
        store.put(record(1)).await.unwrap();
        let restored = InMemoryStore::from_records(store.snapshot());
        assert_eq!(restored.snapshot(), store.snapshot());
    }
}
