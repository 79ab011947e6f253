//! Error taxonomy shared by the store, the draw engine and the arbiter.

use std::{io, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Failure of the persisted list storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing storage is not mounted, not writable, or full.
    #[error("storage unavailable at {}: {source}", path.display())]
    Unavailable {
        /// File or directory that could not be accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Another process holds the data root.
    #[error("data root {} is in use by another tombola process", path.display())]
    Locked {
        /// The contended data root.
        path: PathBuf,
    },
}

impl StoreError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Unavailable {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Which pool turned out to be empty when a draw was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSide {
    /// The working roster has no names left.
    Roster,
    /// The working question pool has no questions left.
    Questions,
    /// Neither pool has anything left.
    Both,
}

impl PoolSide {
    /// Short label used in log lines and receipts.
    pub fn label(self) -> &'static str {
        match self {
            PoolSide::Roster => "roster",
            PoolSide::Questions => "questions",
            PoolSide::Both => "roster and questions",
        }
    }
}

/// Errors surfaced to the callers of the engine.
#[derive(Debug, Error)]
pub enum TombolaError {
    /// Persistence failed; fatal for the in-flight request, never retried here.
    #[error(transparent)]
    StorageUnavailable(#[from] StoreError),
    /// The relevant pool is empty. Recoverable: reset or load more entries.
    #[error("nothing left to draw from the {}", .0.label())]
    EmptyPool(PoolSide),
    /// Another trigger is being processed.
    #[error("another operation is in progress")]
    Busy,
}

impl TombolaError {
    /// True for outcomes a caller should report as a normal status, not a fault.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TombolaError::EmptyPool(_) | TombolaError::Busy)
    }
}

/// Convenience alias for engine results.
pub type TombolaResult<T> = Result<T, TombolaError>;
