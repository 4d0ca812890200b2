//! Error types for waymark-scaffold.

use std::path::PathBuf;

use thiserror::Error;

use waymark_core::MigrationId;

/// All errors that can arise while scaffolding a migration.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// JSON serialization error (building tera context).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading templates or writing the migration.
    #[error("scaffold io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested name cannot become a migration directory.
    #[error("invalid migration name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The numeric prefix is far from now and nobody confirmed it.
    #[error("timestamp {timestamp} of {id} was not confirmed")]
    Unconfirmed { id: MigrationId, timestamp: u64 },

    /// `<migrations_dir>/<id>` is already taken.
    #[error("migration {id} already exists at {path}")]
    AlreadyExists { id: MigrationId, path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ScaffoldError {
    ScaffoldError::Io {
        path: path.into(),
        source,
    }
}
