//! # waymark-runner
//!
//! Execution engine and batch orchestration.
//!
//! [`Engine::run`] executes one migration and records `DONE`/`FAILED`;
//! [`batch::run`] drives a whole `migrate` invocation.

pub mod batch;
pub mod engine;
pub mod error;

pub use batch::{run_batch, run_single, select_runnable, BatchReport, RunScope};
pub use engine::{Engine, Outcome};
pub use error::RunError;
