//! Waymark: track and run migration directories against an environment.
//!
//! # Usage
//!
//! ```text
//! waymark [-d <project-dir>] [-e <environment>] init
//! waymark status [--json]
//! waymark done|skip|failed|pending|manual <id>
//! waymark readme <id>
//! waymark migrate [<id>]
//! waymark rollback [<id>]
//! waymark create <name> [--yes]
//! waymark delete <id> [--yes]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use commands::{
    create::CreateArgs, delete::DeleteArgs, migrate::MigrateArgs, readme::ReadmeArgs,
    rollback::RollbackArgs, set_status::SetStatusArgs, status::StatusArgs,
};
use waymark_core::{config::DEFAULT_ENVIRONMENT, Settings, Status};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "waymark",
    version,
    about = "Track and run migration scripts against an environment",
    long_about = None,
)]
struct Cli {
    /// Project directory holding `waymark.conf`.
    #[arg(long, short = 'd', global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Environment name passed to every migration script.
    #[arg(long, short = 'e', global = true, default_value = DEFAULT_ENVIRONMENT)]
    environment: String,

    /// Log verbosity on stderr. `RUST_LOG` takes precedence.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the migrations directory and registry.
    Init,

    /// Reconcile the registry and print every migration's state.
    Status(StatusArgs),

    /// Mark a migration as DONE.
    Done(SetStatusArgs),

    /// Mark a migration as SKIP.
    Skip(SetStatusArgs),

    /// Mark a migration as FAILED.
    Failed(SetStatusArgs),

    /// Mark a migration as PENDING.
    Pending(SetStatusArgs),

    /// Mark a migration as MANUAL.
    Manual(SetStatusArgs),

    /// Print the readme files of a migration.
    Readme(ReadmeArgs),

    /// Run one migration, or every runnable one in id order.
    Migrate(MigrateArgs),

    /// Roll a migration back (not supported yet).
    Rollback(RollbackArgs),

    /// Scaffold a new migration directory.
    Create(CreateArgs),

    /// Delete a migration directory and its registry record.
    Delete(DeleteArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    let settings = Settings::load(&cli.project_dir, cli.environment.as_str()).with_context(|| {
        format!(
            "failed to load configuration from '{}'",
            cli.project_dir.display()
        )
    })?;
    tracing::debug!(
        project = %settings.project_dir().display(),
        migrations = %settings.migrations_dir().display(),
        environment = %settings.environment(),
        "settings resolved"
    );

    match cli.command {
        Commands::Init => commands::init::run(&settings),
        Commands::Status(args) => args.run(&settings),
        Commands::Done(args) => args.run(&settings, Status::Done),
        Commands::Skip(args) => args.run(&settings, Status::Skip),
        Commands::Failed(args) => args.run(&settings, Status::Failed),
        Commands::Pending(args) => args.run(&settings, Status::Pending),
        Commands::Manual(args) => args.run(&settings, Status::Manual),
        Commands::Readme(args) => args.run(&settings),
        Commands::Migrate(args) => args.run(&settings),
        Commands::Rollback(args) => args.run(&settings),
        Commands::Create(args) => args.run(&settings),
        Commands::Delete(args) => args.run(&settings),
    }
}

fn init_tracing(level: LogLevel) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_options_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["waymark", "status", "-e", "production", "--json"]).unwrap();
        assert_eq!(cli.environment, "production");
        assert!(matches!(cli.command, Commands::Status(StatusArgs { json: true })));
    }

    #[test]
    fn migrate_id_is_optional() {
        let cli = Cli::try_parse_from(["waymark", "migrate"]).unwrap();
        assert!(matches!(cli.command, Commands::Migrate(MigrateArgs { id: None })));
        let cli = Cli::try_parse_from(["waymark", "migrate", "1500000000-a"]).unwrap();
        assert!(matches!(cli.command, Commands::Migrate(MigrateArgs { id: Some(_) })));
    }

    #[test]
    fn status_setters_require_an_id() {
        assert!(Cli::try_parse_from(["waymark", "done"]).is_err());
        assert!(Cli::try_parse_from(["waymark", "skip", "1500000000-a"]).is_ok());
    }

    #[test]
    fn log_level_defaults_to_info() {
        let cli = Cli::try_parse_from(["waymark", "init"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.project_dir, PathBuf::from("."));
    }
}
