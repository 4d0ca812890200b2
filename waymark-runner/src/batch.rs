//! Batch orchestration shared by `waymark migrate`.
//!
//! A batch reconciles the registry, picks every present migration that is
//! still runnable in id order, and runs them one by one until the first
//! failure.

use std::collections::BTreeMap;
use std::io::Write;

use waymark_core::{reconcile, MigrationId, Presence, ReconcileReport, RecordState};

use crate::engine::{Engine, Outcome};
use crate::error::RunError;

/// Scope for a migrate run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScope {
    /// Every runnable migration.
    All,
    /// One explicit migration, whatever its recorded status.
    Single(MigrationId),
}

/// Result of a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub reconcile: ReconcileReport,
    /// Outcomes in execution order. Only the last one can be a failure.
    pub executed: Vec<Outcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> bool {
        self.failed().is_none()
    }

    pub fn failed(&self) -> Option<&Outcome> {
        self.executed.last().filter(|o| !o.succeeded())
    }
}

/// Ids a batch would run: present, runnable, ascending.
pub fn select_runnable(records: &BTreeMap<MigrationId, RecordState>) -> Vec<MigrationId> {
    records
        .iter()
        .filter(|(_, state)| state.presence == Presence::Present && state.status.is_runnable())
        .map(|(id, _)| id.clone())
        .collect()
}

/// Run a scope. The canonical entry point for `waymark migrate`.
pub fn run<W: Write>(
    engine: &Engine<'_>,
    scope: RunScope,
    console: &mut W,
) -> Result<BatchReport, RunError> {
    match scope {
        RunScope::All => run_batch(engine, console),
        RunScope::Single(id) => Ok(BatchReport {
            reconcile: ReconcileReport::default(),
            executed: vec![run_single(engine, &id, console)?],
        }),
    }
}

/// Reconcile, then run every runnable migration, stopping at the first failure.
pub fn run_batch<W: Write>(engine: &Engine<'_>, console: &mut W) -> Result<BatchReport, RunError> {
    let settings = engine.settings();
    let registry = settings.registry();
    let reconciled = reconcile(&registry, &settings.branch())?;

    let selected = select_runnable(&registry.get_all());
    tracing::debug!(count = selected.len(), "selected migrations");

    let mut report = BatchReport {
        reconcile: reconciled,
        executed: Vec::with_capacity(selected.len()),
    };
    for id in selected {
        let outcome = run_single(engine, &id, console)?;
        let failed = !outcome.succeeded();
        report.executed.push(outcome);
        if failed {
            tracing::warn!(id = %id, "migration failed, stopping batch");
            break;
        }
    }
    Ok(report)
}

/// Run one migration regardless of its recorded status.
pub fn run_single<W: Write>(
    engine: &Engine<'_>,
    id: &MigrationId,
    console: &mut W,
) -> Result<Outcome, RunError> {
    let _ = writeln!(console, "Starting migration {id}");
    let outcome = engine.run(id, console)?;
    let _ = writeln!(console, "Migration {id}: {}", outcome.status);
    Ok(outcome)
}
