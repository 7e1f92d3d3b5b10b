use aqualog_store::StorageError;
use aqualog_types::RecordId;
use thiserror::Error;

use crate::phase::ImportPhase;

/// Errors from importing a snapshot.
///
/// Failures after validation leave the store as the last completed step
/// left it; nothing is rolled back.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The input is not a snapshot document. Nothing was modified.
    #[error("malformed snapshot: {0}")]
    Malformed(String),

    /// Another import on this exchange has not finished.
    #[error("an import is already running (phase: {0})")]
    Busy(ImportPhase),

    /// Clearing the existing records failed.
    #[error("failed to clear existing records: {0}")]
    Clear(#[source] StorageError),

    /// A record write failed; `written` records were restored before it.
    #[error("failed to write record {id} ({written} of {total} written): {source}")]
    Write {
        id: RecordId,
        written: usize,
        total: usize,
        #[source]
        source: StorageError,
    },

    /// All records were written but the container list was not replaced.
    #[error("failed to replace container list: {0}")]
    Containers(#[source] StorageError),
}

impl ImportError {
    /// `true` if the store may now hold a partial import.
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::Containers(_))
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
