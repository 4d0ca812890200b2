//! Error types for waymark-runner.

use std::path::PathBuf;

use thiserror::Error;

use waymark_core::{MigrationId, RegistryError};

/// All errors that can arise from running migrations.
#[derive(Debug, Error)]
pub enum RunError {
    /// `<migrations_dir>/<id>` does not exist.
    #[error("migration directory not found for {id}: {path}")]
    MissingDirectory { id: MigrationId, path: PathBuf },

    /// No `migrate*` file in the migration directory.
    #[error("no migrate* entry point in {dir}")]
    NoEntryPoint { id: MigrationId, dir: PathBuf },

    /// More than one `migrate*` file; a valid migration has exactly one.
    #[error("{id} has {} migrate* entry points, expected exactly one", candidates.len())]
    AmbiguousEntryPoint {
        id: MigrationId,
        candidates: Vec<PathBuf>,
    },

    /// The entry point could not be started.
    #[error("failed to start {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child process failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error from the registry.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl RunError {
    /// A broken migration directory, as opposed to a runtime failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            RunError::MissingDirectory { .. }
                | RunError::NoEntryPoint { .. }
                | RunError::AmbiguousEntryPoint { .. }
        )
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RunError {
    RunError::Io {
        path: path.into(),
        source,
    }
}
