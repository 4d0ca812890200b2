//! `waymark init`

use anyhow::{Context, Result};
use colored::Colorize;

use waymark_core::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    let registry = settings.registry();
    println!("Initializing migrations registry");
    let report = registry.initialize(&settings.branch()).with_context(|| {
        format!(
            "failed to initialize registry at '{}'",
            registry.path().display()
        )
    })?;

    if report.created {
        println!(
            "{} Created {} ({} existing migration(s) recorded)",
            "✓".green(),
            registry.path().display(),
            report.seeded.len()
        );
    } else {
        println!("Registry already initialized at {}", registry.path().display());
    }
    Ok(())
}
