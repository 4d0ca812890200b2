//! waymark core library: domain types, state machine, registry, reconciliation.
//!
//! - [`types`]: ids, statuses, records
//! - [`state`]: legal status transitions
//! - [`registry`]: the SQLite registry store
//! - [`reconcile`]: aligning the registry with the migration directories
//! - [`config`]: `waymark.conf` and [`Settings`]
//! - [`layout`], [`vcs`]: on-disk conventions and branch discovery

pub mod config;
pub mod error;
pub mod layout;
pub mod reconcile;
pub mod registry;
pub mod state;
pub mod types;
pub mod vcs;

pub use config::Settings;
pub use error::{ConfigError, RegistryError};
pub use reconcile::{reconcile, ReconcileReport};
pub use registry::{InitReport, Registry};
pub use state::{check_transition, TransitionError, Trigger};
pub use types::{MigrationId, MigrationRecord, Presence, RecordState, Status};
