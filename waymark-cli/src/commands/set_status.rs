//! `waymark done|skip|failed|pending|manual <id>`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use waymark_core::{check_transition, MigrationId, Settings, Status, Trigger};

#[derive(Args, Debug)]
pub struct SetStatusArgs {
    /// Migration id, e.g. `1511081545-add-users`.
    pub id: String,
}

impl SetStatusArgs {
    /// Overwrite the status of an already registered migration.
    pub fn run(self, settings: &Settings, status: Status) -> Result<()> {
        let id = MigrationId::from(self.id);
        let registry = settings.registry();

        let previous = registry.get_status(&id);
        check_transition(Trigger::Admin, previous, status)?;
        registry
            .set_status(&id, status, &settings.branch())
            .with_context(|| format!("cannot mark {id} as {status}"))?;

        tracing::info!(id = %id, from = %previous, to = %status, "status overwritten");
        println!("{} {id}: {previous} -> {status}", "✓".green());
        Ok(())
    }
}
