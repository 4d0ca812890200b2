//! Error types for waymark-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{MigrationId, Status};

/// All errors that can arise from registry and reconciliation operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Filesystem failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// SQLite failure on the registry file.
    #[error("registry database error at {path}: {source}")]
    Sqlite {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The migration id has no record in the registry.
    #[error("migration not found: {id}")]
    NotFound { id: MigrationId },

    /// An insert was attempted for an id that already has a record.
    #[error("migration already registered: {id}")]
    Duplicate { id: MigrationId },

    /// `UNKNOWN` (or another sentinel) was about to be written.
    #[error("refusing to persist status {status} for {id}")]
    NotPersistable { id: MigrationId, status: Status },

    /// The migration directory could not be removed; the record was kept.
    #[error("failed to remove migration directory {path}: {source}")]
    DirectoryRemoval {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from loading `waymark.conf`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A non-blank line without `=`.
    #[error("malformed line {line_no} in {path}: expected KEY=VALUE")]
    Malformed { path: PathBuf, line_no: usize },

    #[error("empty key on line {line_no} in {path}")]
    EmptyKey { path: PathBuf, line_no: usize },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn sql_err(path: impl Into<PathBuf>, source: rusqlite::Error) -> RegistryError {
    RegistryError::Sqlite {
        path: path.into(),
        source,
    }
}
