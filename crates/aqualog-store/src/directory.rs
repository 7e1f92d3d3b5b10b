//! Durable record store on the local filesystem.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<database>/manifest.json          name, version, collections
//! <root>/<database>/<collection>/<key>.json
//! ```
//!
//! The key is the hex of the id for ids up to [`MAX_HEX_ID_BYTES`] bytes and
//! `b3-<blake3(id)>` beyond that, so file names stay under common filesystem
//! limits. The stored record always carries its full id.
//!
//! One file per record keeps every `put` an independent transaction: the
//! record is written to a temporary file in the collection directory, synced,
//! then renamed over its final name. A crash leaves either the old or the new
//! record, never a torn one. Stray temporary files are ignored on read.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aqualog_types::{ImageRecord, RecordId};
use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::schema::{DatabaseSchema, Manifest, UpgradeOutcome};
use crate::traits::RecordStore;

const MANIFEST_FILE: &str = "manifest.json";
const RECORD_EXT: &str = "json";

/// Longest id, in bytes, stored under its plain hex encoding.
pub const MAX_HEX_ID_BYTES: usize = 100;

const HASHED_KEY_PREFIX: &str = "b3-";

/// An open database: where its collection lives.
#[derive(Debug)]
struct Connection {
    collection_dir: PathBuf,
}

/// Record store backed by one directory per database.
///
/// The connection is opened lazily on first use and reused afterwards.
/// Concurrent callers racing on the first open wait on the same handshake,
/// so the collection is created at most once.
pub struct DirectoryRecordStore {
    root: PathBuf,
    schema: DatabaseSchema,
    connection: OnceCell<Arc<Connection>>,
}

impl DirectoryRecordStore {
    /// A store for the default schema rooted at `root`. Nothing touches the
    /// disk until the first operation.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_schema(root, DatabaseSchema::default())
    }

    pub fn with_schema(root: impl Into<PathBuf>, schema: DatabaseSchema) -> Self {
        Self {
            root: root.into(),
            schema,
            connection: OnceCell::new(),
        }
    }

    pub fn schema(&self) -> &DatabaseSchema {
        &self.schema
    }

    /// Directory holding this store's database.
    pub fn database_dir(&self) -> PathBuf {
        self.root.join(&self.schema.name)
    }

    async fn connection(&self) -> StorageResult<Arc<Connection>> {
        let conn = self
            .connection
            .get_or_try_init(|| {
                let db_dir = self.database_dir();
                let schema = self.schema.clone();
                blocking(move || handshake(&db_dir, &schema))
            })
            .await?;
        Ok(Arc::clone(conn))
    }
}

impl std::fmt::Debug for DirectoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryRecordStore")
            .field("root", &self.root)
            .field("schema", &self.schema)
            .field("open", &self.connection.initialized())
            .finish()
    }
}

#[async_trait]
impl RecordStore for DirectoryRecordStore {
    async fn open(&self) -> StorageResult<()> {
        self.connection().await.map(|_| ())
    }

    async fn put(&self, record: &ImageRecord) -> StorageResult<()> {
        let conn = self.connection().await?;
        let bytes = serde_json::to_vec(record)?;
        let target = record_path(&conn.collection_dir, &record.id);
        let dir = conn.collection_dir.clone();
        debug!(id = %record.id, bytes = bytes.len(), "put record");
        blocking(move || write_atomic(&dir, &target, &bytes)).await
    }

    async fn get_all(&self) -> StorageResult<Vec<ImageRecord>> {
        let conn = self.connection().await?;
        let dir = conn.collection_dir.clone();
        blocking(move || {
            let mut records = Vec::new();
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if !is_record_file(&path) {
                    continue;
                }
                records.push(read_record(&path)?);
            }
            Ok(records)
        })
        .await
    }

    async fn get_by_id(&self, id: &RecordId) -> StorageResult<Option<ImageRecord>> {
        let conn = self.connection().await?;
        let path = record_path(&conn.collection_dir, id);
        blocking(move || match read_record(&path) {
            Ok(record) => Ok(Some(record)),
            Err(StorageError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn delete_by_id(&self, id: &RecordId) -> StorageResult<bool> {
        let conn = self.connection().await?;
        let path = record_path(&conn.collection_dir, id);
        debug!(%id, "delete record");
        blocking(move || match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn clear(&self) -> StorageResult<()> {
        let conn = self.connection().await?;
        let dir = conn.collection_dir.clone();
        let removed = blocking(move || {
            let mut removed = 0usize;
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_file() {
                    fs::remove_file(&path)?;
                    if is_record_file(&path) {
                        removed += 1;
                    }
                }
            }
            Ok(removed)
        })
        .await?;
        info!(removed, "cleared record collection");
        Ok(())
    }
}

/// Run filesystem work off the async executor.
async fn blocking<T, F>(f: F) -> StorageResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Aborted(format!("storage task failed: {e}")))?
}

/// Open or create the database and make sure the collection exists.
fn handshake(db_dir: &Path, schema: &DatabaseSchema) -> StorageResult<Arc<Connection>> {
    fs::create_dir_all(db_dir)
        .map_err(|e| StorageError::Unavailable(format!("{}: {e}", db_dir.display())))?;

    let manifest_path = db_dir.join(MANIFEST_FILE);
    let mut manifest = match fs::read(&manifest_path) {
        Ok(bytes) => serde_json::from_slice::<Manifest>(&bytes).map_err(|e| {
            StorageError::Corrupt {
                location: manifest_path.display().to_string(),
                reason: e.to_string(),
            }
        })?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Manifest::empty(&schema.name),
        Err(e) => return Err(e.into()),
    };

    let collection_dir = db_dir.join(&schema.collection);
    if manifest.upgrade(schema)? == UpgradeOutcome::Upgraded {
        info!(
            database = %schema.name,
            version = manifest.version,
            collection = %schema.collection,
            "upgrading record database"
        );
        fs::create_dir_all(&collection_dir)?;
        let bytes = serde_json::to_vec_pretty(&manifest)?;
        write_atomic(db_dir, &manifest_path, &bytes)?;
    } else if !collection_dir.is_dir() {
        warn!(
            collection = %collection_dir.display(),
            "collection listed in manifest but missing on disk; recreating"
        );
        fs::create_dir_all(&collection_dir)?;
    }

    debug!(database = %schema.name, "record database open");
    Ok(Arc::new(Connection { collection_dir }))
}

fn record_key(id: &RecordId) -> String {
    let raw = id.as_str();
    if raw.len() <= MAX_HEX_ID_BYTES {
        hex::encode(raw)
    } else {
        format!("{HASHED_KEY_PREFIX}{}", blake3::hash(raw.as_bytes()).to_hex())
    }
}

fn record_path(dir: &Path, id: &RecordId) -> PathBuf {
    dir.join(format!("{}.{RECORD_EXT}", record_key(id)))
}

fn is_record_file(path: &Path) -> bool {
    let stem = match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if path.extension().map(|e| e == RECORD_EXT).unwrap_or(false) => stem,
        _ => return false,
    };
    match stem.strip_prefix(HASHED_KEY_PREFIX) {
        Some(digest) => digest.len() == 64 && hex::decode(digest).is_ok(),
        None => hex::decode(stem).is_ok(),
    }
}

/// Read a record file and check that its id matches the file name.
fn read_record(path: &Path) -> StorageResult<ImageRecord> {
    let bytes = fs::read(path)?;
    let record: ImageRecord = serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
        location: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let expected = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if record_key(&record.id) != expected {
        return Err(StorageError::Corrupt {
            location: path.display().to_string(),
            reason: format!("record id {} does not match its key", record.id),
        });
    }
    Ok(record)
}

/// Write `bytes` to `target` via a synced temp file in `dir` and a rename.
pub(crate) fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> StorageResult<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqualog_types::ContainerId;
    use tempfile::TempDir;

    fn record(id: &str, container: &str) -> ImageRecord {
        ImageRecord {
            id: RecordId::new(id).unwrap(),
            container_id: ContainerId::new(container).unwrap(),
            url: "data:image/jpeg;base64,/9j/".into(),
            date: "2024-01-01".into(),
            title: None,
            description: String::new(),
            analysis_flag: false,
        }
    }

    #[tokio::test]
    async fn first_open_creates_manifest_and_collection() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryRecordStore::new(tmp.path());
        store.open().await.unwrap();

        let db = tmp.path().join("aquariumDB");
        assert!(db.join("images").is_dir());
        let manifest: Manifest =
            serde_json::from_slice(&fs::read(db.join("manifest.json")).unwrap()).unwrap();
        assert_eq!(manifest.version, 1);
        assert!(manifest.has_collection("images"));
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryRecordStore::new(tmp.path());
        store.open().await.unwrap();
        store.put(&record("1", "t")).await.unwrap();
        store.open().await.unwrap();
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_opens_share_one_handshake() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(DirectoryRecordStore::new(tmp.path()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.open().await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let manifest: Manifest = serde_json::from_slice(
            &fs::read(tmp.path().join("aquariumDB").join("manifest.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest.collections.len(), 1);
    }

    #[tokio::test]
    async fn put_get_and_upsert_persist_across_instances() {
        let tmp = TempDir::new().unwrap();
        {
            let store = DirectoryRecordStore::new(tmp.path());
            store.put(&record("1", "tank1")).await.unwrap();
            let mut updated = record("1", "tank1");
            updated.description = "updated".into();
            store.put(&updated).await.unwrap();
        }
        let reopened = DirectoryRecordStore::new(tmp.path());
        let all = reopened.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "updated");
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryRecordStore::new(tmp.path());
        let id = RecordId::new("nonexistent").unwrap();
        assert!(store.get_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ids_with_path_characters_stay_inside_the_collection() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryRecordStore::new(tmp.path());
        let rec = record("../../escape", "t");
        store.put(&rec).await.unwrap();
        assert_eq!(store.get_by_id(&rec.id).await.unwrap(), Some(rec));
        assert!(!tmp.path().join("escape").exists());
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryRecordStore::new(tmp.path());
        store.put(&record("a", "t")).await.unwrap();
        store.put(&record("b", "t")).await.unwrap();
        assert!(store.delete_by_id(&RecordId::new("a").unwrap()).await.unwrap());
        assert!(!store.delete_by_id(&RecordId::new("a").unwrap()).await.unwrap());
        store.clear().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stray_temp_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryRecordStore::new(tmp.path());
        store.put(&record("a", "t")).await.unwrap();
        let collection = tmp.path().join("aquariumDB").join("images");
        fs::write(collection.join(".tmpXYZ"), b"partial").unwrap();
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mismatched_key_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryRecordStore::new(tmp.path());
        store.put(&record("a", "t")).await.unwrap();
        let collection = tmp.path().join("aquariumDB").join("images");
        let body = serde_json::to_vec(&record("b", "t")).unwrap();
        fs::write(collection.join(format!("{}.json", hex::encode("a"))), body).unwrap();
        let err = store.get_all().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn long_ids_use_hashed_file_names() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryRecordStore::new(tmp.path());
        let long_id = "x".repeat(200);
        let short = record("short", "t");
        let long = record(&long_id, "t");

        store.put(&short).await.unwrap();
        store.put(&long).await.unwrap();
        assert_eq!(store.get_by_id(&long.id).await.unwrap(), Some(long.clone()));

        let mut all = store.get_all().await.unwrap();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(all, vec![short.clone(), long.clone()]);

        let names: Vec<String> = fs::read_dir(tmp.path().join("aquariumDB").join("images"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| n.len() < 255));
        assert!(names.iter().any(|n| n.starts_with("b3-")));

        assert!(store.delete_by_id(&long.id).await.unwrap());
        assert_eq!(store.get_by_id(&long.id).await.unwrap(), None);
        assert!(!store.delete_by_id(&long.id).await.unwrap());
        assert_eq!(store.get_all().await.unwrap(), vec![short]);
    }

    #[tokio::test]
    async fn unknown_long_id_is_absent() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryRecordStore::new(tmp.path());
        let id = RecordId::new("y".repeat(300)).unwrap();
        assert_eq!(store.get_by_id(&id).await.unwrap(), None);
    }

    #[test]
    fn record_keys_switch_to_hash_past_the_limit() {
        let at_limit = RecordId::new("a".repeat(MAX_HEX_ID_BYTES)).unwrap();
        let past = RecordId::new("a".repeat(MAX_HEX_ID_BYTES + 1)).unwrap();
        assert_eq!(record_key(&at_limit), hex::encode("a".repeat(MAX_HEX_ID_BYTES)));
        assert!(record_key(&past).starts_with("b3-"));
        assert_eq!(record_key(&past).len(), 3 + 64);
        assert!(is_record_file(&PathBuf::from(format!("{}.json", record_key(&past)))));
        assert!(!is_record_file(Path::new("b3-zz.json")));
    }

    #[tokio::test]
    async fn newer_on_disk_version_is_rejected() {
        let tmp = TempDir::new().unwrap();
        DirectoryRecordStore::with_schema(tmp.path(), DatabaseSchema::default().with_version(2))
            .open()
            .await
            .unwrap();
        let err = DirectoryRecordStore::new(tmp.path()).open().await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionConflict { found: 2, requested: 1, .. }
        ));
    }

    #[tokio::test]
    async fn unreadable_root_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        let err = DirectoryRecordStore::new(&file).open().await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }
}
