use aqualog_types::{ContainerId, ImageRecord, RecordId};
use async_trait::async_trait;

use crate::error::StorageResult;

/// Asynchronous CRUD over the image record collection, keyed by `id`.
///
/// All implementations must satisfy these invariants:
/// - `put` is an upsert. Writing a record whose id already exists replaces
///   it; the collection never holds two records with the same id.
/// - Each call is a single independent transaction. No atomicity is
///   provided across calls; callers await dependent writes in order.
/// - Absence is a value (`Ok(None)` / `Ok(false)`), not an error.
/// - `open` is idempotent, and concurrent first callers share one handshake.
///   Other operations open lazily, so calling `open` first is optional.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Establish (or reuse) the connection, creating the collection on
    /// first use.
    async fn open(&self) -> StorageResult<()>;

    /// Insert or replace a record by id. Returns once committed.
    async fn put(&self, record: &ImageRecord) -> StorageResult<()>;

    /// Every stored record. Order is unspecified.
    async fn get_all(&self) -> StorageResult<Vec<ImageRecord>>;

    /// Read one record. Returns `Ok(None)` if it does not exist.
    async fn get_by_id(&self, id: &RecordId) -> StorageResult<Option<ImageRecord>>;

    /// Delete one record. Returns `true` if it existed.
    async fn delete_by_id(&self, id: &RecordId) -> StorageResult<bool>;

    /// Remove every record.
    async fn clear(&self) -> StorageResult<()>;

    /// Write records one after another, each awaited before the next.
    ///
    /// Stops at the first failure; records before it stay written.
    async fn put_batch(&self, records: &[ImageRecord]) -> StorageResult<usize> {
        for record in records {
            self.put(record).await?;
        }
        Ok(records.len())
    }

    /// Delete every record matching `predicate`. Returns how many were
    /// removed.
    ///
    /// Default implementation reads all, filters in memory, then deletes by
    /// key. Not atomic.
    async fn delete_where(
        &self,
        predicate: &(dyn for<'r> Fn(&'r ImageRecord) -> bool + Send + Sync),
    ) -> StorageResult<usize> {
        let doomed: Vec<RecordId> = self
            .get_all()
            .await?
            .into_iter()
            .filter(|r| predicate(r))
            .map(|r| r.id)
            .collect();
        let mut removed = 0;
        for id in &doomed {
            if self.delete_by_id(id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Records belonging to one container. Order is unspecified.
    async fn get_by_container(&self, container: &ContainerId) -> StorageResult<Vec<ImageRecord>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|r| &r.container_id == container)
            .collect())
    }
}
