//! `waymark migrate [<id>]`

use std::io;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use waymark_core::{MigrationId, Settings};
use waymark_runner::{batch, Engine, RunScope};

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Run only this migration, whatever its recorded status.
    pub id: Option<String>,
}

impl MigrateArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let scope = match self.id {
            Some(id) => RunScope::Single(MigrationId::from(id)),
            None => RunScope::All,
        };
        tracing::debug!(?scope, environment = %settings.environment(), "migrate");

        let engine = Engine::new(settings);
        let report = {
            let stdout = io::stdout();
            let mut console = stdout.lock();
            match batch::run(&engine, scope, &mut console) {
                Ok(report) => report,
                Err(err) if err.is_precondition() => {
                    return Err(anyhow::Error::new(err)
                        .context("migration directory is not runnable; nothing was executed"));
                }
                Err(err) => return Err(anyhow::Error::new(err).context("migrate aborted")),
            }
        };
        super::warn_failures(&report.reconcile);

        if let Some(failed) = report.failed() {
            let code = failed
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            bail!("migration {} failed (exit: {code})", failed.id);
        }
        if report.executed.is_empty() {
            println!("Nothing to migrate.");
        } else {
            println!(
                "{} {} migration(s) applied",
                "✓".green(),
                report.executed.len()
            );
        }
        super::ensure_clean(&report.reconcile)
    }
}
