//! On-disk layout of a migrations root.
//!
//! ```text
//! <migrations_dir>/
//!   migrations.db            (registry)
//!   <id>/
//!     migrate.sh             (exactly one `migrate*` entry point)
//!     README.md              (optional; makes the migration MANUAL)
//! ```

use std::path::{Path, PathBuf};

use crate::error::{io_err, RegistryError};
use crate::types::MigrationId;

pub const REGISTRY_FILE: &str = "migrations.db";
pub const ENTRY_POINT_PREFIX: &str = "migrate";
pub const README_PREFIX: &str = "readme";

/// Every migration directory directly under `migrations_dir`, sorted.
///
/// Symlinks to directories count. Hidden directories are skipped. A missing
/// root yields an empty list.
pub fn list_migration_ids(migrations_dir: &Path) -> Result<Vec<MigrationId>, RegistryError> {
    if !migrations_dir.exists() {
        return Ok(vec![]);
    }
    let mut ids: Vec<MigrationId> = std::fs::read_dir(migrations_dir)
        .map_err(|e| io_err(migrations_dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .map(MigrationId::from)
        .collect();
    ids.sort();
    Ok(ids)
}

/// Regular files in `migration_dir` whose lower-cased name starts with `readme`.
pub fn readme_files(migration_dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    files_matching(migration_dir, |name| {
        name.to_lowercase().starts_with(README_PREFIX)
    })
}

pub fn has_readme(migration_dir: &Path) -> Result<bool, RegistryError> {
    Ok(!readme_files(migration_dir)?.is_empty())
}

/// Regular files in `migration_dir` whose name starts with `migrate` (case-sensitive).
pub fn entry_point_candidates(migration_dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    files_matching(migration_dir, |name| name.starts_with(ENTRY_POINT_PREFIX))
}

fn files_matching(
    dir: &Path,
    pred: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, RegistryError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut out: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| pred(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect();
    out.sort();
    Ok(out)
}
