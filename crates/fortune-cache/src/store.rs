//! Record store seam
//!
//! The store is an injected collaborator. The only coordination primitive
//! the controller relies on is a single conditional write per operation:
//! - `put_if_absent` for first creation
//! - `compare_and_put` on the observed `generation_count` for regeneration

use async_trait::async_trait;
use fortune_core::{FortuneRecord, RecordKey, StoreError};

/// Result of a conditional write
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    /// Write applied
    Committed,
    /// Precondition failed; carries the record currently stored, if any
    Conflict {
        /// Committed record at the time of the conflict
        current: Option<FortuneRecord>,
    },
}

impl PutOutcome {
    /// Check if the write was applied
    #[inline]
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Persistent record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the record for `key`
    ///
    /// # Errors
    /// `StoreError` when the store is unreachable
    async fn get(&self, key: &RecordKey) -> Result<Option<FortuneRecord>, StoreError>;

    /// Insert `record` only if its key is absent
    ///
    /// # Errors
    /// `StoreError` when the store is unreachable
    async fn put_if_absent(&self, record: FortuneRecord) -> Result<PutOutcome, StoreError>;

    /// Unconditionally overwrite the record for its key
    ///
    /// # Errors
    /// `StoreError` when the store is unreachable
    async fn put(&self, record: FortuneRecord) -> Result<(), StoreError>;

    /// Overwrite only if the stored `generation_count` equals `expected_generation`
    ///
    /// The default implementation reads then writes and is not atomic;
    /// stores shared between concurrent writers must override it.
    ///
    /// # Errors
    /// `StoreError` when the store is unreachable
    async fn compare_and_put(
        &self,
        expected_generation: u32,
        record: FortuneRecord,
    ) -> Result<PutOutcome, StoreError> {
        match self.get(&record.key).await? {
            Some(current) if current.generation_count == expected_generation => {
                self.put(record).await?;
                Ok(PutOutcome::Committed)
            }
            current => Ok(PutOutcome::Conflict { current }),
        }
    }
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for std::sync::Arc<T> {
    async fn get(&self, key: &RecordKey) -> Result<Option<FortuneRecord>, StoreError> {
        (**self).get(key).await
    }

    async fn put_if_absent(&self, record: FortuneRecord) -> Result<PutOutcome, StoreError> {
        (**self).put_if_absent(record).await
    }

    async fn put(&self, record: FortuneRecord) -> Result<(), StoreError> {
        (**self).put(record).await
    }

    async fn compare_and_put(
        &self,
        expected_generation: u32,
        record: FortuneRecord,
    ) -> Result<PutOutcome, StoreError> {
        (**self).compare_and_put(expected_generation, record).await
    }
}
