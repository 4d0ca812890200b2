//! [`ScaffoldContext`]: the data every scaffold template is rendered with.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use waymark_core::{MigrationId, Settings};

use crate::error::ScaffoldError;

#[derive(Debug, Clone, Serialize)]
pub struct ScaffoldContext {
    pub migration_id: String,
    /// `=` run as long as the id, for the README title.
    pub underline: String,
    /// Last component of the project directory.
    pub project_name: String,
    pub environment: String,
    /// RFC 3339, seconds precision.
    pub created_at: String,
    pub waymark_version: String,
}

impl ScaffoldContext {
    pub fn new(id: &MigrationId, settings: &Settings, now: DateTime<Utc>) -> Self {
        let project_name = settings
            .project_dir()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            migration_id: id.to_string(),
            underline: "=".repeat(id.as_str().chars().count().max(3)),
            project_name,
            environment: settings.environment().to_string(),
            created_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            waymark_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, ScaffoldError> {
        tera::Context::from_serialize(self).map_err(ScaffoldError::from)
    }
}
