//! One module per subcommand, plus helpers they share.

pub mod create;
pub mod delete;
pub mod init;
pub mod migrate;
pub mod readme;
pub mod rollback;
pub mod set_status;
pub mod status;

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use colored::Colorize;

use waymark_core::{reconcile, ReconcileReport, Settings};

/// Reconcile the registry and print per-row failures as warnings.
pub(crate) fn reconcile_registry(settings: &Settings) -> Result<ReconcileReport> {
    let report = reconcile(&settings.registry(), &settings.branch()).with_context(|| {
        format!(
            "failed to update registry in '{}'",
            settings.migrations_dir().display()
        )
    })?;
    warn_failures(&report);
    Ok(report)
}

pub(crate) fn warn_failures(report: &ReconcileReport) {
    for (id, err) in &report.failures {
        eprintln!("{} {id}: {err}", "warning:".yellow().bold());
    }
}

/// Turn a partially failed reconciliation into a non-zero exit.
pub(crate) fn ensure_clean(report: &ReconcileReport) -> Result<()> {
    if !report.is_clean() {
        bail!(
            "{} registry update(s) failed during reconciliation",
            report.failures.len()
        );
    }
    Ok(())
}

/// Ask a yes/no question on the terminal.
pub(crate) fn confirm(question: &str, default_yes: bool) -> Result<bool> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    confirm_with(&mut stdin.lock(), &mut stdout.lock(), question, default_yes)
}

/// An empty answer takes the default; end of input counts as "no".
fn confirm_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default_yes: bool,
) -> Result<bool> {
    let hint = if default_yes { "[Y/n]" } else { "[y/N]" };
    loop {
        write!(output, "{question} {hint}: ").context("failed to write prompt")?;
        output.flush().context("failed to write prompt")?;

        let mut answer = String::new();
        if input
            .read_line(&mut answer)
            .context("failed to read answer")?
            == 0
        {
            writeln!(output).context("failed to write prompt")?;
            return Ok(false);
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "" => return Ok(default_yes),
            "y" | "ye" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please respond with 'yes' or 'no' (or 'y' or 'n').")
                .context("failed to write prompt")?,
        }
    }
}
