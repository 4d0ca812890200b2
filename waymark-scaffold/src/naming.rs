//! Migration id derivation for `waymark create`.
//!
//! Ids look like `<unix-seconds>-<slug>`. A name that already carries a
//! numeric prefix keeps it, but only silently when the prefix is close to
//! the current time.

use waymark_core::MigrationId;

use crate::error::ScaffoldError;

/// Largest distance from now, in seconds, at which a given prefix is trusted.
pub const TIMESTAMP_WINDOW_SECS: u64 = 10_000_000;

/// How a requested name turned into an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdPlan {
    /// The name carried a plausible timestamp and is used as-is.
    AsGiven(MigrationId),
    /// The name had no numeric prefix; the current time was prepended.
    Prefixed(MigrationId),
    /// The prefix is outside the window and needs an explicit yes.
    NeedsConfirmation { id: MigrationId, timestamp: u64 },
}

impl IdPlan {
    pub fn id(&self) -> &MigrationId {
        match self {
            IdPlan::AsGiven(id) | IdPlan::Prefixed(id) => id,
            IdPlan::NeedsConfirmation { id, .. } => id,
        }
    }

    /// Resolve the plan. `confirm` is only consulted for far-off timestamps.
    pub fn resolve(self, confirm: impl FnOnce(u64) -> bool) -> Result<MigrationId, ScaffoldError> {
        match self {
            IdPlan::AsGiven(id) | IdPlan::Prefixed(id) => Ok(id),
            IdPlan::NeedsConfirmation { id, timestamp } => {
                if confirm(timestamp) {
                    Ok(id)
                } else {
                    Err(ScaffoldError::Unconfirmed { id, timestamp })
                }
            }
        }
    }
}

/// Work out the id for `name` at time `now` (unix seconds).
pub fn plan_id(name: &str, now: u64) -> Result<IdPlan, ScaffoldError> {
    let name = name.trim();
    validate(name)?;

    if let Some((prefix, slug)) = name.split_once('-') {
        if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
            if slug.is_empty() {
                return Err(invalid(name, "nothing after the timestamp"));
            }
            let id = MigrationId::from(name);
            let Some(timestamp) = id.timestamp() else {
                return Err(invalid(name, "timestamp out of range"));
            };
            return Ok(if timestamp.abs_diff(now) <= TIMESTAMP_WINDOW_SECS {
                IdPlan::AsGiven(id)
            } else {
                IdPlan::NeedsConfirmation { id, timestamp }
            });
        }
    }

    tracing::debug!(name, "no timestamp prefix, prepending current time");
    Ok(IdPlan::Prefixed(MigrationId::from(format!("{now}-{name}"))))
}

fn validate(name: &str) -> Result<(), ScaffoldError> {
    if name.is_empty() {
        return Err(invalid(name, "empty name"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid(name, "path separators are not allowed"));
    }
    // Hidden directories are never picked up as migrations.
    if name.starts_with('.') {
        return Err(invalid(name, "leading dot"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid(name, "control characters are not allowed"));
    }
    Ok(())
}

fn invalid(name: &str, reason: &'static str) -> ScaffoldError {
    ScaffoldError::InvalidName {
        name: name.to_string(),
        reason,
    }
}
