//! Reconciliation of the registry with the migration directories on disk.
//!
//! One pass:
//!
//! 1. records whose directory is gone are marked `ABSENT`; records marked
//!    `ABSENT` whose directory is back are marked `PRESENT`;
//! 2. directories without a record are inserted as `PENDING`/`PRESENT`;
//! 3. directories holding a `readme*` file move to `MANUAL` unless their
//!    record is already settled (`DONE`, `FAILED`, `SKIP`).
//!
//! Records are never deleted here. Each row update is its own durable write;
//! a failing row is reported and the pass carries on with the rest.

use std::collections::BTreeSet;

use crate::error::RegistryError;
use crate::layout;
use crate::registry::Registry;
use crate::state::{check_transition, should_mark_manual, Trigger};
use crate::types::{MigrationId, MigrationRecord, Presence, Status};

/// What one reconciliation pass changed.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub inserted: Vec<MigrationId>,
    pub marked_absent: Vec<MigrationId>,
    pub restored: Vec<MigrationId>,
    pub marked_manual: Vec<MigrationId>,
    pub failures: Vec<(MigrationId, RegistryError)>,
}

impl ReconcileReport {
    /// True iff every row update succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// True iff the pass wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.inserted.is_empty()
            && self.marked_absent.is_empty()
            && self.restored.is_empty()
            && self.marked_manual.is_empty()
    }
}

/// Bring the registry of `registry`'s migrations root in line with the disk.
///
/// The registry is initialized first if needed. Errors listing the directory
/// or opening the registry abort the pass; per-row failures land in
/// [`ReconcileReport::failures`].
pub fn reconcile(registry: &Registry, branch: &str) -> Result<ReconcileReport, RegistryError> {
    tracing::debug!(dir = %registry.migrations_dir().display(), "reconciling registry");
    registry.initialize(branch)?;

    let on_disk: BTreeSet<MigrationId> = layout::list_migration_ids(registry.migrations_dir())?
        .into_iter()
        .collect();
    let in_registry = registry.get_all();
    let mut report = ReconcileReport::default();

    for (id, state) in &in_registry {
        let found = on_disk.contains(id);
        let target = match (found, state.presence) {
            (false, Presence::Present) => Presence::Absent,
            (true, Presence::Absent) => Presence::Present,
            _ => continue,
        };
        match registry.set_presence(id, target) {
            Ok(()) if target == Presence::Absent => {
                tracing::debug!(id = %id, "migration missing on disk, marking ABSENT");
                report.marked_absent.push(id.clone());
            }
            Ok(()) => {
                tracing::debug!(id = %id, "migration re-appeared, marking PRESENT");
                report.restored.push(id.clone());
            }
            Err(err) => report.failures.push((id.clone(), err)),
        }
    }

    for id in &on_disk {
        let current = match in_registry.get(id) {
            Some(state) => state.status,
            None => {
                tracing::debug!(id = %id, "new migration detected");
                match registry.insert(&MigrationRecord::discovered(id.clone(), branch)) {
                    Ok(()) => report.inserted.push(id.clone()),
                    Err(err) => {
                        report.failures.push((id.clone(), err));
                        continue;
                    }
                }
                Status::Pending
            }
        };

        let migration_dir = registry.migrations_dir().join(id.as_str());
        let has_readme = match layout::has_readme(&migration_dir) {
            Ok(found) => found,
            Err(err) => {
                report.failures.push((id.clone(), err));
                continue;
            }
        };
        if !has_readme || !should_mark_manual(current) {
            continue;
        }
        if let Err(err) = check_transition(Trigger::Reconcile, current, Status::Manual) {
            tracing::debug!(id = %id, error = %err, "leaving status unchanged");
            continue;
        }
        tracing::debug!(id = %id, "readme detected, marking MANUAL");
        // Not a user action: keep the branch the record already carries.
        let row_branch = in_registry.get(id).map_or(branch, |s| s.branch.as_str());
        match registry.set_status(id, Status::Manual, row_branch) {
            Ok(()) => report.marked_manual.push(id.clone()),
            Err(err) => report.failures.push((id.clone(), err)),
        }
    }

    if !report.is_clean() {
        tracing::warn!(
            failed = report.failures.len(),
            "reconciliation finished with failed rows"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_root_reconciles_to_empty_registry() {
        let tmp = TempDir::new().unwrap();
        let reg = Registry::at(tmp.path());
        let report = reconcile(&reg, "main").expect("reconcile");
        assert!(report.is_clean());
        assert!(report.is_noop());
        assert!(reg.exists());
    }

    #[test]
    fn new_directory_is_inserted_pending_present() {
        let tmp = TempDir::new().unwrap();
        let reg = Registry::at(tmp.path());
        reconcile(&reg, "main").unwrap();

        fs::create_dir(tmp.path().join("1500000000-a")).unwrap();
        let report = reconcile(&reg, "feature-x").unwrap();
        assert_eq!(report.inserted, vec![MigrationId::from("1500000000-a")]);

        let state = &reg.get_all()[&MigrationId::from("1500000000-a")];
        assert_eq!(state.status, Status::Pending);
        assert_eq!(state.presence, Presence::Present);
        assert_eq!(state.branch, "feature-x");
    }

    #[test]
    fn readme_in_new_directory_yields_manual() {
        let tmp = TempDir::new().unwrap();
        let reg = Registry::at(tmp.path());
        reconcile(&reg, "main").unwrap();
        let dir = tmp.path().join("1500000000-a");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("README.md"), "# manual\n").unwrap();

        let report = reconcile(&reg, "main").unwrap();
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.marked_manual.len(), 1);
        assert_eq!(reg.get_status(&MigrationId::from("1500000000-a")), Status::Manual);
    }
}
