//! `waymark create <name> [--yes]`

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use waymark_core::Settings;
use waymark_scaffold::{create_migration, plan_id, TemplateEngine};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Slug, or a full `<timestamp>-<slug>` id.
    pub name: String,

    /// Accept a timestamp prefix far from now without asking.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl CreateArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let now = Utc::now();
        let unix_now = u64::try_from(now.timestamp()).unwrap_or(0);
        let plan = plan_id(&self.name, unix_now)?;

        let yes = self.yes;
        let id = plan.resolve(|timestamp| {
            yes || super::confirm(&format!("Are you sure with timestamp {timestamp}?"), true)
                .unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "could not read confirmation");
                    false
                })
        })?;

        println!("Generating migration {id}");
        let engine = TemplateEngine::new(settings.templates_dir().as_deref())
            .context("failed to load migration templates")?;
        let created = create_migration(settings, &engine, &id, now)
            .with_context(|| format!("failed to create migration {id}"))?;

        let report = super::reconcile_registry(settings)?;
        println!("{} Created {}", "✓".green(), created.dir.display());
        super::ensure_clean(&report)
    }
}
