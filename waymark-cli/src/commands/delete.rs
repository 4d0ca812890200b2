//! `waymark delete <id> [--yes]`

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use waymark_core::{MigrationId, Settings};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub id: String,

    /// Do not ask for confirmation.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl DeleteArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let id = MigrationId::from(self.id);
        let registry = settings.registry();
        if !registry.contains(&id) && !settings.migration_dir(&id).exists() {
            bail!("unknown migration {id}");
        }

        if !self.yes
            && !super::confirm(&format!("Are you sure you want to delete {id}?"), false)?
        {
            println!("Aborting");
            return Ok(());
        }

        registry
            .delete_migration(&id)
            .with_context(|| format!("failed to delete migration {id}"))?;
        println!("{} Deleted {id}", "✓".green());
        Ok(())
    }
}
