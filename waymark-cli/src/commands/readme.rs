//! `waymark readme <id>`

use std::fs;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use waymark_core::{layout, MigrationId, Settings};

#[derive(Args, Debug)]
pub struct ReadmeArgs {
    pub id: String,
}

impl ReadmeArgs {
    pub fn run(self, settings: &Settings) -> Result<()> {
        let id = MigrationId::from(self.id);
        let dir = settings.migration_dir(&id);
        if !dir.is_dir() {
            bail!("migration directory not found: {}", dir.display());
        }

        let files = layout::readme_files(&dir)
            .with_context(|| format!("failed to list '{}'", dir.display()))?;
        if files.is_empty() {
            bail!("no readme files found for {id}");
        }

        for path in files {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            println!("{}", format!("Contents of {}", path.display()).bold());
            println!("{contents}");
        }
        Ok(())
    }
}
