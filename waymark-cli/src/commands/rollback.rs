//! `waymark rollback [<id>]`

use anyhow::Result;
use clap::Args;

use waymark_core::Settings;

#[derive(Args, Debug)]
pub struct RollbackArgs {
    pub id: Option<String>,
}

impl RollbackArgs {
    /// Rollback scripts are not part of the migration directory contract yet,
    /// so this only reports and succeeds.
    pub fn run(self, settings: &Settings) -> Result<()> {
        tracing::info!(
            id = self.id.as_deref().unwrap_or("<all>"),
            environment = %settings.environment(),
            "rollback requested"
        );
        println!("Rollback is not supported; nothing was changed.");
        Ok(())
    }
}
