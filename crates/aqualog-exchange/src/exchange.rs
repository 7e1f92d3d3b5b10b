use std::sync::{Arc, Mutex};

use aqualog_store::{FlatNamespace, RecordStore, StorageResult};
use tracing::{debug, info, warn};

use crate::document::{ParsedSnapshot, SnapshotDocument};
use crate::error::{ImportError, ImportResult};
use crate::phase::ImportPhase;

// ---------------------------------------------------------------------------
// ImportReport
// ---------------------------------------------------------------------------

/// What a successful import wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportReport {
    pub images_written: usize,
    /// `None` when the document carried no container list (legacy shape)
    /// and the existing list was left alone.
    pub containers_written: Option<usize>,
}

// ---------------------------------------------------------------------------
// SnapshotExchange
// ---------------------------------------------------------------------------

/// Whole-state export and import over the record collection and the flat
/// namespace.
///
/// Import is always a replace, never a merge: existing records are cleared
/// first and the container list is overwritten, so importing a known-good
/// backup converges to exactly that backup. The steps are not atomic; a
/// failure partway through leaves a partial import in place and reports it.
pub struct SnapshotExchange {
    records: Arc<dyn RecordStore>,
    namespace: FlatNamespace,
    phase: Arc<Mutex<ImportPhase>>,
}

impl SnapshotExchange {
    pub fn new(records: Arc<dyn RecordStore>, namespace: FlatNamespace) -> Self {
        Self {
            records,
            namespace,
            phase: Arc::new(Mutex::new(ImportPhase::Idle)),
        }
    }

    /// The current import phase.
    pub fn phase(&self) -> ImportPhase {
        self.phase.lock().map(|p| *p).unwrap_or(ImportPhase::Failed)
    }

    /// Read every record and the container list into one document.
    ///
    /// Pure read; the caller turns the result into a file.
    pub async fn export_snapshot(&self) -> StorageResult<SnapshotDocument> {
        let images = self.records.get_all().await?;
        let containers = self.namespace.containers()?;
        info!(
            images = images.len(),
            containers = containers.len(),
            "exported snapshot"
        );
        Ok(SnapshotDocument::new(images, containers))
    }

    /// Parse `input` and replace the current state with it.
    ///
    /// Validation happens before any mutation: a malformed document returns
    /// [`ImportError::Malformed`] with the store untouched.
    pub async fn import_snapshot(&self, input: &str) -> ImportResult<ImportReport> {
        let run = PhaseRun::begin(&self.phase)?;
        let parsed = match ParsedSnapshot::parse(input) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "snapshot rejected");
                return Err(e);
            }
        };
        self.apply(parsed, run).await
    }

    /// Replace the current state with an already-built document.
    pub async fn import_document(&self, snapshot: impl Into<ParsedSnapshot>) -> ImportResult<ImportReport> {
        let run = PhaseRun::begin(&self.phase)?;
        self.apply(snapshot.into(), run).await
    }

    async fn apply(&self, snapshot: ParsedSnapshot, run: PhaseRun) -> ImportResult<ImportReport> {
        let replaces_containers = snapshot.replaces_containers();
        let SnapshotDocument { images, containers } = snapshot.document;
        let total = images.len();

        run.advance(ImportPhase::Clearing);
        self.records.clear().await.map_err(ImportError::Clear)?;

        run.advance(ImportPhase::Writing);
        for (written, record) in images.iter().enumerate() {
            if let Err(source) = self.records.put(record).await {
                warn!(id = %record.id, written, total, error = %source, "import stopped partway");
                return Err(ImportError::Write {
                    id: record.id.clone(),
                    written,
                    total,
                    source,
                });
            }
            debug!(id = %record.id, "restored record");
        }

        let containers_written = if replaces_containers {
            self.namespace
                .replace_containers(&containers)
                .map_err(ImportError::Containers)?;
            Some(containers.len())
        } else {
            debug!("legacy snapshot; container list left as is");
            None
        };

        run.finish();
        info!(images = total, ?containers_written, "imported snapshot");
        Ok(ImportReport {
            images_written: total,
            containers_written,
        })
    }
}

impl std::fmt::Debug for SnapshotExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotExchange")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// PhaseRun
// ---------------------------------------------------------------------------

/// One import's hold on the phase cell.
///
/// Dropping a run that has not finished (an error return or a cancelled
/// future) marks the phase `Failed`, so the exchange always settles in a
/// rest state.
struct PhaseRun {
    cell: Arc<Mutex<ImportPhase>>,
    finished: bool,
}

impl PhaseRun {
    fn begin(cell: &Arc<Mutex<ImportPhase>>) -> ImportResult<Self> {
        let mut phase = cell
            .lock()
            .map_err(|_| ImportError::Busy(ImportPhase::Failed))?;
        if !phase.is_rest() {
            return Err(ImportError::Busy(*phase));
        }
        *phase = ImportPhase::Validating;
        Ok(Self {
            cell: Arc::clone(cell),
            finished: false,
        })
    }

    fn set(&self, next: ImportPhase) {
        if let Ok(mut phase) = self.cell.lock() {
            debug_assert!(phase.can_advance_to(next), "{} -> {}", *phase, next);
            *phase = next;
        }
    }

    fn advance(&self, next: ImportPhase) {
        debug!(phase = %next, "import phase");
        self.set(next);
    }

    fn finish(mut self) {
        self.set(ImportPhase::Done);
        self.finished = true;
    }
}

impl Drop for PhaseRun {
    fn drop(&mut self) {
        if !self.finished {
            self.set(ImportPhase::Failed);
        }
    }
}
