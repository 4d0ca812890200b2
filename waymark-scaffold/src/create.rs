//! Writing a new migration directory to disk.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use waymark_core::{MigrationId, Settings};

use crate::context::ScaffoldContext;
use crate::engine::TemplateEngine;
use crate::error::{io_err, ScaffoldError};

/// What `create_migration` put on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub id: MigrationId,
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Create `<migrations_dir>/<id>` and fill it from the templates.
///
/// Fails without touching anything if the directory already exists. If a
/// file cannot be written the half-built directory is removed again. The
/// registry is not updated here; the next reconcile picks the migration up.
pub fn create_migration(
    settings: &Settings,
    engine: &TemplateEngine,
    id: &MigrationId,
    now: DateTime<Utc>,
) -> Result<Created, ScaffoldError> {
    let dir = settings.migration_dir(id);
    if dir.exists() {
        return Err(ScaffoldError::AlreadyExists {
            id: id.clone(),
            path: dir,
        });
    }

    let ctx = ScaffoldContext::new(id, settings, now);
    let rendered = engine.render(&ctx, &dir)?;

    let root = settings.migrations_dir();
    fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
    fs::create_dir(&dir).map_err(|e| io_err(&dir, e))?;

    let mut files = Vec::with_capacity(rendered.len());
    for (file, path, content) in rendered {
        if let Err(err) = write_file(&path, &content, file.mode()) {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                tracing::warn!(dir = %dir.display(), error = %cleanup, "could not remove partial migration");
            }
            return Err(err);
        }
        files.push(path);
    }

    tracing::info!(id = %id, dir = %dir.display(), "migration created");
    Ok(Created {
        id: id.clone(),
        dir,
        files,
    })
}

fn write_file(path: &Path, content: &str, mode: u32) -> Result<(), ScaffoldError> {
    fs::write(path, content).map_err(|e| io_err(path, e))?;
    set_mode(path, mode)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ScaffoldError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), ScaffoldError> {
    Ok(())
}
