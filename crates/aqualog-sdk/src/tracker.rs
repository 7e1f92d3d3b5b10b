use std::sync::Arc;

use aqualog_exchange::{ImportPhase, ImportReport, SnapshotDocument, SnapshotExchange};
use aqualog_store::{
    DatabaseSchema, DirectoryRecordStore, FileKeyValueStore, FlatNamespace, InMemoryRecordStore,
    RecordStore,
};
use aqualog_types::temporal::newest_first;
use aqualog_types::{
    Container, ContainerId, GlobalSettings, ImageDraft, ImageEdit, ImageRecord, RecordId,
    StatsEntry, TemperatureReading, WaterStats,
};
use tracing::{debug, info, warn};

use crate::config::{Backend, TrackerConfig};
use crate::error::{SdkError, SdkResult};

/// High-level aqualog API.
///
/// One `Tracker` owns one record collection and one flat namespace. Build it
/// with [`Tracker::open`] (or [`Tracker::in_memory`] in tests) and pass it to
/// whatever needs storage; there is no process-wide instance.
pub struct Tracker {
    records: Arc<dyn RecordStore>,
    namespace: FlatNamespace,
    exchange: SnapshotExchange,
}

impl Tracker {
    /// Build the stores described by `config` and open the record
    /// collection.
    pub async fn open(config: &TrackerConfig) -> SdkResult<Self> {
        let (records, namespace): (Arc<dyn RecordStore>, FlatNamespace) = match config.backend {
            Backend::Directory => {
                let schema = DatabaseSchema::named(config.database_name.clone())
                    .with_version(config.database_version);
                let records = DirectoryRecordStore::with_schema(config.data_dir.clone(), schema);
                let kv = FileKeyValueStore::open(config.namespace_path())?;
                (Arc::new(records), FlatNamespace::new(Arc::new(kv)))
            }
            Backend::Memory => (Arc::new(InMemoryRecordStore::new()), FlatNamespace::in_memory()),
        };
        let tracker = Self::with_stores(records, namespace).await?;
        info!(data_dir = %config.data_dir.display(), backend = ?config.backend, "tracker opened");
        Ok(tracker)
    }

    /// An isolated tracker that keeps everything in memory.
    pub async fn in_memory() -> SdkResult<Self> {
        Self::with_stores(Arc::new(InMemoryRecordStore::new()), FlatNamespace::in_memory()).await
    }

    /// Wrap existing stores, open the record collection, and drop the
    /// vestigial `"images"` key from the namespace.
    pub async fn with_stores(records: Arc<dyn RecordStore>, namespace: FlatNamespace) -> SdkResult<Self> {
        records.open().await?;
        namespace.drop_stray_images_key()?;
        let exchange = SnapshotExchange::new(Arc::clone(&records), namespace.clone());
        Ok(Self {
            records,
            namespace,
            exchange,
        })
    }

    // ---- Containers ----

    pub fn containers(&self) -> SdkResult<Vec<Container>> {
        Ok(self.namespace.containers()?)
    }

    pub fn container(&self, id: &ContainerId) -> SdkResult<Container> {
        self.containers()?
            .into_iter()
            .find(|c| &c.id == id)
            .ok_or_else(|| SdkError::ContainerNotFound(id.clone()))
    }

    pub fn create_container(&self, name: &str, description: Option<&str>) -> SdkResult<Container> {
        let container = Container::create(name, description)?;
        let mut all = self.containers()?;
        all.push(container.clone());
        self.namespace.replace_containers(&all)?;
        info!(id = %container.id, name = %container.name, "created container");
        Ok(container)
    }

    /// Overwrite the stored container that has `container.id`.
    pub fn update_container(&self, container: &Container) -> SdkResult<()> {
        if container.name.trim().is_empty() {
            return Err(aqualog_types::TypeError::EmptyName.into());
        }
        let mut all = self.containers()?;
        let slot = all
            .iter_mut()
            .find(|c| c.id == container.id)
            .ok_or_else(|| SdkError::ContainerNotFound(container.id.clone()))?;
        *slot = container.clone();
        self.namespace.replace_containers(&all)?;
        debug!(id = %container.id, "updated container");
        Ok(())
    }

    /// Flip whether the temperature section is shown. Returns the updated
    /// container.
    pub fn toggle_temperature_section(&self, id: &ContainerId) -> SdkResult<Container> {
        let mut container = self.container(id)?;
        container.settings.show_temperature_section = !container.settings.show_temperature_section;
        self.update_container(&container)?;
        Ok(container)
    }

    /// Delete a container together with its images, readings and stats
    /// history. Returns
    /// how many images were removed.
    ///
    /// Images go first, so a failure there leaves the container listed and
    /// the delete can be retried.
    pub async fn delete_container(&self, id: &ContainerId) -> SdkResult<usize> {
        let mut all = self.containers()?;
        let before = all.len();
        all.retain(|c| &c.id != id);
        if all.len() == before {
            return Err(SdkError::ContainerNotFound(id.clone()));
        }

        let target = id.clone();
        let removed = self
            .records
            .delete_where(&move |r: &ImageRecord| r.container_id == target)
            .await?;
        self.namespace.replace_containers(&all)?;
        self.namespace.remove_temperatures(id)?;
        self.namespace.remove_stats_history(id)?;
        info!(id = %id, images = removed, "deleted container");
        Ok(removed)
    }

    /// Delete images whose container no longer exists. Returns how many.
    pub async fn prune_orphan_images(&self) -> SdkResult<usize> {
        let known: Vec<ContainerId> = self.containers()?.into_iter().map(|c| c.id).collect();
        let removed = self
            .records
            .delete_where(&move |r: &ImageRecord| !known.contains(&r.container_id))
            .await?;
        if removed > 0 {
            warn!(removed, "pruned images with no container");
        }
        Ok(removed)
    }

    // ---- Images ----

    /// Store a new image for an existing container.
    pub async fn upload(&self, draft: ImageDraft) -> SdkResult<ImageRecord> {
        self.container(&draft.container_id)?;
        let record = draft.into_record()?;
        self.records.put(&record).await?;
        info!(id = %record.id, container = %record.container_id, "uploaded image");
        Ok(record)
    }

    /// Insert or replace a record as given.
    pub async fn save_image(&self, record: &ImageRecord) -> SdkResult<()> {
        self.records.put(record).await?;
        Ok(())
    }

    pub async fn image(&self, id: &RecordId) -> SdkResult<Option<ImageRecord>> {
        Ok(self.records.get_by_id(id).await?)
    }

    /// A container's images, newest `date` first.
    pub async fn gallery(&self, container: &ContainerId) -> SdkResult<Vec<ImageRecord>> {
        let mut images = self.records.get_by_container(container).await?;
        images.sort_by(|a, b| newest_first(&a.date, &b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(images)
    }

    pub async fn edit_image(&self, id: &RecordId, edit: ImageEdit) -> SdkResult<ImageRecord> {
        let mut record = self
            .records
            .get_by_id(id)
            .await?
            .ok_or_else(|| SdkError::ImageNotFound(id.clone()))?;
        record.apply(edit)?;
        self.records.put(&record).await?;
        debug!(id = %id, "edited image");
        Ok(record)
    }

    /// Returns `true` if the image existed.
    pub async fn delete_image(&self, id: &RecordId) -> SdkResult<bool> {
        Ok(self.records.delete_by_id(id).await?)
    }

    // ---- Readings ----

    pub fn record_temperature(&self, container: &ContainerId, value: f64) -> SdkResult<TemperatureReading> {
        self.container(container)?;
        let reading = TemperatureReading::now(value)?;
        let mut readings = self.namespace.temperatures(container)?;
        readings.push(reading.clone());
        self.namespace.set_temperatures(container, &readings)?;
        debug!(container = %container, value, "recorded temperature");
        Ok(reading)
    }

    pub fn temperatures(&self, container: &ContainerId) -> SdkResult<Vec<TemperatureReading>> {
        Ok(self.namespace.temperatures(container)?)
    }

    /// Append a dated set of measurements to a container's history.
    pub fn record_stats(&self, container: &ContainerId, stats: WaterStats) -> SdkResult<StatsEntry> {
        self.container(container)?;
        let entry = StatsEntry::now(stats)?;
        let mut history = self.namespace.stats_history(container)?;
        history.push(entry.clone());
        self.namespace.set_stats_history(container, &history)?;
        debug!(container = %container, entries = history.len(), "recorded stats");
        Ok(entry)
    }

    /// A container's stats history, oldest first.
    pub fn stats_history(&self, container: &ContainerId) -> SdkResult<Vec<StatsEntry>> {
        Ok(self.namespace.stats_history(container)?)
    }

    pub fn latest_stats(&self, container: &ContainerId) -> SdkResult<Option<StatsEntry>> {
        Ok(self.stats_history(container)?.pop())
    }

    // ---- Global settings ----

    pub fn settings(&self) -> SdkResult<GlobalSettings> {
        Ok(self.namespace.global_settings()?)
    }

    /// Set or clear the webhook endpoint. An empty string clears it.
    pub fn set_webhook_url(&self, url: Option<String>) -> SdkResult<GlobalSettings> {
        let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        if let Some(u) = &url {
            if !(u.starts_with("http://") || u.starts_with("https://")) {
                return Err(SdkError::InvalidInput(format!(
                    "webhook url must start with http:// or https://: {u}"
                )));
            }
        }
        let mut settings = self.settings()?;
        settings.webhook_url = url;
        self.namespace.set_global_settings(&settings)?;
        Ok(settings)
    }

    // ---- Snapshot exchange ----

    pub async fn export_snapshot(&self) -> SdkResult<SnapshotDocument> {
        Ok(self.exchange.export_snapshot().await?)
    }

    /// Replace all images and containers with the document in `input`.
    pub async fn import_snapshot(&self, input: &str) -> SdkResult<ImportReport> {
        Ok(self.exchange.import_snapshot(input).await?)
    }

    pub fn import_phase(&self) -> ImportPhase {
        self.exchange.phase()
    }

    // ---- Accessors ----

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    pub fn namespace(&self) -> &FlatNamespace {
        &self.namespace
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("import_phase", &self.import_phase())
            .finish_non_exhaustive()
    }
}
