//! # waymark-scaffold
//!
//! Tera-based scaffolding for `waymark create`: derives the migration id,
//! renders `README.md` and `migrate.sh`, and writes them to disk.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use waymark_core::Settings;
//! use waymark_scaffold::{create_migration, plan_id, TemplateEngine};
//!
//! fn scaffold(settings: &Settings, name: &str) -> Result<(), waymark_scaffold::ScaffoldError> {
//!     let now = chrono::Utc::now();
//!     let id = plan_id(name, now.timestamp().max(0) as u64)?.resolve(|_| false)?;
//!     let engine = TemplateEngine::new(settings.templates_dir().as_deref())?;
//!     let created = create_migration(settings, &engine, &id, now)?;
//!     println!("{}", created.dir.display());
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod create;
pub mod engine;
pub mod error;
pub mod naming;

pub use context::ScaffoldContext;
pub use create::{create_migration, Created};
pub use engine::{ScaffoldFile, TemplateEngine};
pub use error::ScaffoldError;
pub use naming::{plan_id, IdPlan, TIMESTAMP_WINDOW_SECS};
