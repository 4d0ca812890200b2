//! SQLite-backed migration registry.
//!
//! # Storage layout
//!
//! ```text
//! <migrations_dir>/migrations.db
//!   migrations(migration_id, status, presence, branch)
//! ```
//!
//! `migration_id` carries no database constraint; uniqueness is enforced here,
//! on insert.
//!
//! # Access pattern
//!
//! No connection outlives a call. Each operation opens the file, runs one
//! statement (seeding runs one transaction) and drops the connection, so a
//! record is either fully written or untouched. Read paths open the file
//! read-only and never create it.
//!
//! Single writer: concurrent external writers are not coordinated.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::error::{io_err, sql_err, RegistryError};
use crate::layout::{self, REGISTRY_FILE};
use crate::types::{MigrationId, MigrationRecord, Presence, RecordState, Status};

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS migrations (migration_id TEXT, status TEXT, presence TEXT, branch TEXT)";

/// Result of [`Registry::initialize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// The `migrations` table did not exist and was created.
    pub created: bool,
    /// Ids seeded as `PENDING`/`PRESENT` on creation.
    pub seeded: Vec<MigrationId>,
}

/// Handle on the registry file of one migrations root.
#[derive(Debug, Clone)]
pub struct Registry {
    dir: PathBuf,
    path: PathBuf,
}

impl Registry {
    /// Registry for the migrations root `migrations_dir`. Pure, no I/O.
    pub fn at(migrations_dir: impl Into<PathBuf>) -> Self {
        let dir = migrations_dir.into();
        let path = dir.join(REGISTRY_FILE);
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    // -----------------------------------------------------------------------
    // 1. Initialize
    // -----------------------------------------------------------------------

    /// Create the file and table if absent.
    ///
    /// Only when the table is created does it get seeded with one
    /// `PENDING`/`PRESENT` row per migration directory. Calling it on an
    /// initialized registry changes nothing.
    pub fn initialize(&self, branch: &str) -> Result<InitReport, RegistryError> {
        if !self.dir.is_dir() {
            tracing::warn!(
                dir = %self.dir.display(),
                "migrations directory does not exist, creating it"
            );
            std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        }

        let mut conn = self.open(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)?;
        if table_exists(&conn).map_err(|e| sql_err(&self.path, e))? {
            return Ok(InitReport::default());
        }

        tracing::debug!(path = %self.path.display(), "initializing registry");
        let seeded = layout::list_migration_ids(&self.dir)?;
        let tx = conn.transaction().map_err(|e| sql_err(&self.path, e))?;
        tx.execute(CREATE_TABLE, [])
            .map_err(|e| sql_err(&self.path, e))?;
        for id in &seeded {
            tx.execute(
                "INSERT INTO migrations VALUES (?1, ?2, ?3, ?4)",
                params![
                    id.as_str(),
                    Status::Pending.as_str(),
                    Presence::Present.as_str(),
                    branch
                ],
            )
            .map_err(|e| sql_err(&self.path, e))?;
        }
        tx.commit().map_err(|e| sql_err(&self.path, e))?;

        Ok(InitReport {
            created: true,
            seeded,
        })
    }

    // -----------------------------------------------------------------------
    // 2. Read
    // -----------------------------------------------------------------------

    /// Every record, ordered by id.
    ///
    /// A missing file is "nothing recorded yet" and yields an empty map. A
    /// missing table or an unreadable file is logged and also yields an empty
    /// map.
    pub fn get_all(&self) -> BTreeMap<MigrationId, RecordState> {
        if !self.exists() {
            return BTreeMap::new();
        }
        match self.read_all() {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "migrations table missing or unreadable"
                );
                BTreeMap::new()
            }
        }
    }

    /// [`get_all`](Self::get_all) flattened into records.
    pub fn records(&self) -> Vec<MigrationRecord> {
        self.get_all()
            .into_iter()
            .map(|(id, state)| MigrationRecord {
                id,
                status: state.status,
                presence: state.presence,
                branch: state.branch,
            })
            .collect()
    }

    /// Status of one migration.
    ///
    /// `PENDING` when the registry file does not exist yet (the file is not
    /// created by this call); `UNKNOWN` when the id is absent or its stored
    /// value is not a status name.
    pub fn get_status(&self, id: &MigrationId) -> Status {
        if !self.exists() {
            tracing::info!(path = %self.path.display(), "registry not found");
            return Status::Pending;
        }
        let read = self.open(OpenFlags::SQLITE_OPEN_READ_ONLY).and_then(|conn| {
            conn.query_row(
                "SELECT status FROM migrations WHERE migration_id = ?1",
                params![id.as_str()],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map_err(|e| sql_err(&self.path, e))
        });
        match read {
            Ok(Some(Some(raw))) => Status::from_stored(&raw),
            Ok(_) => Status::Unknown,
            Err(err) => {
                tracing::warn!(id = %id, error = %err, "failed to read migration status");
                Status::Unknown
            }
        }
    }

    pub fn contains(&self, id: &MigrationId) -> bool {
        self.get_all().contains_key(id)
    }

    // -----------------------------------------------------------------------
    // 3. Write
    // -----------------------------------------------------------------------

    /// Overwrite `status` and `branch` of an existing record.
    ///
    /// Initializes the registry first if the file does not exist. Fails with
    /// [`RegistryError::NotFound`] and writes nothing when the id has no record.
    pub fn set_status(
        &self,
        id: &MigrationId,
        status: Status,
        branch: &str,
    ) -> Result<(), RegistryError> {
        if !status.is_persistable() {
            return Err(RegistryError::NotPersistable {
                id: id.clone(),
                status,
            });
        }
        if !self.exists() {
            self.initialize(branch)?;
        }
        let conn = self.open(OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        let changed = conn
            .execute(
                "UPDATE migrations SET status = ?1, branch = ?2 WHERE migration_id = ?3",
                params![status.as_str(), branch, id.as_str()],
            )
            .map_err(|e| sql_err(&self.path, e))?;
        if changed == 0 {
            return Err(RegistryError::NotFound { id: id.clone() });
        }
        tracing::debug!(id = %id, status = %status, "status updated");
        Ok(())
    }

    /// Flip the presence flag of an existing record.
    pub fn set_presence(&self, id: &MigrationId, presence: Presence) -> Result<(), RegistryError> {
        let conn = self.open(OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        let changed = conn
            .execute(
                "UPDATE migrations SET presence = ?1 WHERE migration_id = ?2",
                params![presence.as_str(), id.as_str()],
            )
            .map_err(|e| sql_err(&self.path, e))?;
        if changed == 0 {
            return Err(RegistryError::NotFound { id: id.clone() });
        }
        Ok(())
    }

    /// Append a record. Fails with [`RegistryError::Duplicate`] if the id is
    /// already registered.
    pub fn insert(&self, record: &MigrationRecord) -> Result<(), RegistryError> {
        if !record.status.is_persistable() {
            return Err(RegistryError::NotPersistable {
                id: record.id.clone(),
                status: record.status,
            });
        }
        let mut conn = self.open(OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        let tx = conn.transaction().map_err(|e| sql_err(&self.path, e))?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM migrations WHERE migration_id = ?1",
                params![record.id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| sql_err(&self.path, e))?;
        if existing.is_some() {
            return Err(RegistryError::Duplicate {
                id: record.id.clone(),
            });
        }
        tx.execute(
            "INSERT INTO migrations VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id.as_str(),
                record.status.as_str(),
                record.presence.as_str(),
                record.branch
            ],
        )
        .map_err(|e| sql_err(&self.path, e))?;
        tx.commit().map_err(|e| sql_err(&self.path, e))?;
        Ok(())
    }

    /// Remove the record for `id`. Returns whether a row was removed.
    ///
    /// A missing registry file is a no-op.
    pub fn delete(&self, id: &MigrationId) -> Result<bool, RegistryError> {
        if !self.exists() {
            return Ok(false);
        }
        let conn = self.open(OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        let changed = conn
            .execute(
                "DELETE FROM migrations WHERE migration_id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| sql_err(&self.path, e))?;
        Ok(changed > 0)
    }

    // -----------------------------------------------------------------------
    // 4. Delete migration (directory + record)
    // -----------------------------------------------------------------------

    /// Delete the migration directory, then its record.
    ///
    /// If the directory cannot be removed the record is kept and
    /// [`RegistryError::DirectoryRemoval`] is returned, so disk and registry
    /// never disagree about a half-deleted migration.
    pub fn delete_migration(&self, id: &MigrationId) -> Result<(), RegistryError> {
        let dir = self.dir.join(id.as_str());
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|source| RegistryError::DirectoryRemoval {
                path: dir.clone(),
                source,
            })?;
            tracing::debug!(id = %id, "removed migration directory");
        }
        if !self.delete(id)? {
            tracing::debug!(id = %id, "no registry record to remove");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn open(&self, flags: OpenFlags) -> Result<Connection, RegistryError> {
        Connection::open_with_flags(&self.path, flags).map_err(|e| sql_err(&self.path, e))
    }

    fn read_all(&self) -> Result<BTreeMap<MigrationId, RecordState>, RegistryError> {
        let conn = self.open(OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut stmt = conn
            .prepare(
                "SELECT migration_id, status, presence, branch FROM migrations ORDER BY migration_id",
            )
            .map_err(|e| sql_err(&self.path, e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(|e| sql_err(&self.path, e))?;

        let mut out = BTreeMap::new();
        for row in rows {
            let (id, status, presence, branch) = row.map_err(|e| sql_err(&self.path, e))?;
            let Some(id) = id else {
                tracing::warn!("skipping registry row without migration_id");
                continue;
            };
            let presence = match presence.as_deref().and_then(Presence::from_stored) {
                Some(p) => p,
                None => {
                    tracing::warn!(id = %id, "unrecognised presence, treating as ABSENT");
                    Presence::Absent
                }
            };
            out.insert(
                MigrationId::from(id),
                RecordState {
                    status: status.as_deref().map_or(Status::Unknown, Status::from_stored),
                    presence,
                    branch: branch.unwrap_or_default(),
                },
            );
        }
        Ok(out)
    }
}

fn table_exists(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'migrations'",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n > 0)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
