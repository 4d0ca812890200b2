//! `waymark status`: registry contents after a reconcile pass.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use waymark_core::{MigrationRecord, Presence, Settings, Status};

/// Arguments for `waymark status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let report = super::reconcile_registry(settings)?;
        let records = settings.registry().records();

        if self.json {
            print_json(settings, &records)?;
        } else {
            print_table(settings, &records);
        }
        super::ensure_clean(&report)
    }
}

#[derive(Serialize)]
struct StatusJson<'a> {
    environment: &'a str,
    migrations_dir: String,
    migrations: Vec<MigrationJson<'a>>,
}

#[derive(Serialize)]
struct MigrationJson<'a> {
    migration_id: &'a str,
    status: Status,
    presence: Presence,
    branch: &'a str,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "MIGRATION_ID")]
    migration_id: String,
    #[tabled(rename = "STATUS")]
    status: Status,
    #[tabled(rename = "PRESENCE")]
    presence: Presence,
    #[tabled(rename = "BRANCH")]
    branch: String,
}

fn print_json(settings: &Settings, records: &[MigrationRecord]) -> Result<()> {
    let payload = StatusJson {
        environment: settings.environment(),
        migrations_dir: settings.migrations_dir().display().to_string(),
        migrations: records
            .iter()
            .map(|r| MigrationJson {
                migration_id: r.id.as_str(),
                status: r.status,
                presence: r.presence,
                branch: &r.branch,
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(settings: &Settings, records: &[MigrationRecord]) {
    println!(
        "Migration summary on environment {}:",
        settings.environment().bold()
    );
    if records.is_empty() {
        println!("No migrations found in {}.", settings.migrations_dir().display());
        return;
    }

    let rows: Vec<StatusTableRow> = records
        .iter()
        .map(|r| StatusTableRow {
            migration_id: r.id.to_string(),
            status: r.status,
            presence: r.presence,
            branch: r.branch.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");

    let runnable = records
        .iter()
        .filter(|r| r.presence == Presence::Present && r.status.is_runnable())
        .count();
    if runnable > 0 {
        println!(
            "{} migration(s) pending. Run 'waymark migrate' to apply them.",
            runnable.to_string().yellow()
        );
    }
}
