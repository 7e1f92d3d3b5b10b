use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use aqualog_types::{ImageRecord, RecordId};
use async_trait::async_trait;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::traits::RecordStore;

/// In-memory, HashMap-based record store.
///
/// Intended for tests and embedding. Records are held behind a `RwLock` and
/// cloned on read/write. An optional record quota makes the store reject
/// inserts of new ids once full, which exercises the same failure path as a
/// browser store running out of space.
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordId, ImageRecord>>,
    quota: Option<usize>,
}

impl InMemoryRecordStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            quota: None,
        }
    }

    /// Create a store that holds at most `max_records` records.
    pub fn with_quota(max_records: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            quota: Some(max_records),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return a sorted list of all record ids in the store.
    pub fn all_ids(&self) -> Vec<RecordId> {
        let mut ids: Vec<RecordId> = self
            .read()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, HashMap<RecordId, ImageRecord>>> {
        self.records
            .read()
            .map_err(|e| StorageError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, HashMap<RecordId, ImageRecord>>> {
        self.records
            .write()
            .map_err(|e| StorageError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn open(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn put(&self, record: &ImageRecord) -> StorageResult<()> {
        let mut map = self.write()?;
        if let Some(max) = self.quota {
            if !map.contains_key(&record.id) && map.len() >= max {
                return Err(StorageError::QuotaExceeded(format!(
                    "record {} would exceed the {max}-record quota",
                    record.id
                )));
            }
        }
        debug!(id = %record.id, "put record");
        map.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_all(&self) -> StorageResult<Vec<ImageRecord>> {
        Ok(self.read()?.values().cloned().collect())
    }

    async fn get_by_id(&self, id: &RecordId) -> StorageResult<Option<ImageRecord>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn delete_by_id(&self, id: &RecordId) -> StorageResult<bool> {
        Ok(self.write()?.remove(id).is_some())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.write()?.clear();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("record_count", &self.len())
            .field("quota", &self.quota)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqualog_types::ContainerId;

    fn record(id: &str, container: &str) -> ImageRecord {
        ImageRecord {
            id: RecordId::new(id).unwrap(),
            container_id: ContainerId::new(container).unwrap(),
            url: "data:image/png;base64,AAAA".into(),
            date: "2024-01-01".into(),
            title: Some(String::new()),
            description: String::new(),
            analysis_flag: false,
        }
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_and_get_by_id() {
        let store = InMemoryRecordStore::new();
        let rec = record("1", "tank1");
        store.put(&rec).await.unwrap();

        let read_back = store.get_by_id(&rec.id).await.unwrap().expect("should exist");
        assert_eq!(read_back, rec);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = InMemoryRecordStore::new();
        let id = RecordId::new("nonexistent").unwrap();
        assert!(store.get_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_is_an_upsert() {
        let store = InMemoryRecordStore::new();
        store.put(&record("1", "tank1")).await.unwrap();

        let mut updated = record("1", "tank1");
        updated.description = "updated".into();
        store.put(&updated).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "updated");
    }

    #[tokio::test]
    async fn identical_put_twice_keeps_one_record() {
        let store = InMemoryRecordStore::new();
        let rec = record("1", "tank1");
        store.put(&rec).await.unwrap();
        store.put(&rec).await.unwrap();
        assert_eq!(store.get_all().await.unwrap(), vec![rec]);
    }

    #[tokio::test]
    async fn delete_present_and_missing() {
        let store = InMemoryRecordStore::new();
        let rec = record("gone", "tank1");
        store.put(&rec).await.unwrap();
        assert!(store.delete_by_id(&rec.id).await.unwrap());
        assert!(!store.delete_by_id(&rec.id).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_all() {
        let store = InMemoryRecordStore::new();
        store.put(&record("a", "t")).await.unwrap();
        store.put(&record("b", "t")).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Provided helpers
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_where_only_touches_matches() {
        let store = InMemoryRecordStore::new();
        store.put(&record("1", "x")).await.unwrap();
        store.put(&record("2", "x")).await.unwrap();
        store.put(&record("3", "y")).await.unwrap();

        let target = ContainerId::new("x").unwrap();
        let removed = store
            .delete_where(&|r: &ImageRecord| r.container_id == target)
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.all_ids(), vec![RecordId::new("3").unwrap()]);
    }

    #[tokio::test]
    async fn get_by_container_filters() {
        let store = InMemoryRecordStore::new();
        store.put(&record("1", "x")).await.unwrap();
        store.put(&record("2", "y")).await.unwrap();
        let xs = store
            .get_by_container(&ContainerId::new("x").unwrap())
            .await
            .unwrap();
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].id.as_str(), "1");
    }

    #[tokio::test]
    async fn put_batch_writes_all() {
        let store = InMemoryRecordStore::new();
        let recs = vec![record("a", "t"), record("b", "t"), record("c", "t")];
        assert_eq!(store.put_batch(&recs).await.unwrap(), 3);
        assert_eq!(store.len(), 3);
    }

    // -----------------------------------------------------------------------
    // Quota
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn quota_rejects_new_ids_when_full() {
        let store = InMemoryRecordStore::with_quota(1);
        store.put(&record("a", "t")).await.unwrap();
        let err = store.put(&record("b", "t")).await.unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded(_)));
        // Replacing an existing id does not grow the store.
        store.put(&record("a", "t")).await.unwrap();
    }

    #[tokio::test]
    async fn put_batch_stops_at_first_failure() {
        let store = InMemoryRecordStore::with_quota(2);
        let recs = vec![record("a", "t"), record("b", "t"), record("c", "t")];
        assert!(store.put_batch(&recs).await.is_err());
        assert_eq!(store.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Concurrent access
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn concurrent_puts_of_distinct_ids() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryRecordStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.put(&record(&i.to_string(), "t")).await.unwrap();
                })
            })
            .collect();
        for h in handles {
            h.await.expect("task should not panic");
        }
        assert_eq!(store.len(), 8);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryRecordStore::with_quota(5);
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryRecordStore"));
        assert!(debug.contains("record_count"));
    }
}
