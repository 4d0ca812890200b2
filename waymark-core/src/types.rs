//! Domain types for the waymark registry.
//!
//! Status and presence are closed enums at the storage boundary: the
//! registry stores their upper-case names and parses them back on read.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a migration, `<unix-timestamp>-<slug>`.
///
/// Also the name of the migration's directory. Ordering is lexical, which is
/// chronological as long as timestamps have the same number of digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MigrationId(pub String);

impl MigrationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading unix timestamp, if the id has the `<digits>-<slug>` shape.
    pub fn timestamp(&self) -> Option<u64> {
        let (prefix, rest) = self.0.split_once('-')?;
        if prefix.is_empty() || rest.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        prefix.parse().ok()
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for MigrationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MigrationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle state of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Pending,
    Done,
    Failed,
    Manual,
    Skip,
    /// Not found, or the stored value is not a known name. Never persisted.
    Unknown,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Pending,
        Status::Done,
        Status::Failed,
        Status::Manual,
        Status::Skip,
        Status::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Done => "DONE",
            Status::Failed => "FAILED",
            Status::Manual => "MANUAL",
            Status::Skip => "SKIP",
            Status::Unknown => "UNKNOWN",
        }
    }

    /// Parse a value read back from the registry.
    ///
    /// Anything that is not one of the persisted names maps to `Unknown`.
    pub fn from_stored(raw: &str) -> Status {
        match raw.trim() {
            "PENDING" => Status::Pending,
            "DONE" => Status::Done,
            "FAILED" => Status::Failed,
            "MANUAL" => Status::Manual,
            "SKIP" => Status::Skip,
            _ => Status::Unknown,
        }
    }

    pub fn is_persistable(self) -> bool {
        self != Status::Unknown
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a migration directory currently exists on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Presence {
    #[default]
    Present,
    Absent,
}

impl Presence {
    pub fn as_str(self) -> &'static str {
        match self {
            Presence::Present => "PRESENT",
            Presence::Absent => "ABSENT",
        }
    }

    pub fn from_stored(raw: &str) -> Option<Presence> {
        match raw.trim() {
            "PRESENT" => Some(Presence::Present),
            "ABSENT" => Some(Presence::Absent),
            _ => None,
        }
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Everything the registry knows about one migration, minus its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordState {
    pub status: Status,
    pub presence: Presence,
    /// Branch or release tag active when the record was last written.
    pub branch: String,
}

/// One registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    pub id: MigrationId,
    pub status: Status,
    pub presence: Presence,
    pub branch: String,
}

impl MigrationRecord {
    /// A freshly discovered migration: `PENDING`, `PRESENT`.
    pub fn discovered(id: MigrationId, branch: impl Into<String>) -> Self {
        Self {
            id,
            status: Status::Pending,
            presence: Presence::Present,
            branch: branch.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(MigrationId::from("1511081545-foo").to_string(), "1511081545-foo");
    }

    #[test]
    fn timestamp_prefix() {
        assert_eq!(MigrationId::from("1511081545-foo").timestamp(), Some(1511081545));
        assert_eq!(MigrationId::from("foo-bar").timestamp(), None);
        assert_eq!(MigrationId::from("1511081545-").timestamp(), None);
        assert_eq!(MigrationId::from("1511081545").timestamp(), None);
    }

    #[test]
    fn ids_sort_chronologically() {
        let mut ids = vec![
            MigrationId::from("1600000000-b"),
            MigrationId::from("1500000000-z"),
            MigrationId::from("1600000000-a"),
        ];
        ids.sort();
        assert_eq!(ids[0].as_str(), "1500000000-z");
        assert_eq!(ids[1].as_str(), "1600000000-a");
    }

    #[test]
    fn stored_status_roundtrip_and_unknown() {
        for status in Status::ALL.iter().filter(|s| s.is_persistable()) {
            assert_eq!(Status::from_stored(status.as_str()), *status);
        }
        assert_eq!(Status::from_stored("DONE\n"), Status::Done);
        assert_eq!(Status::from_stored("done"), Status::Unknown);
        assert_eq!(Status::from_stored("UNKNOWN"), Status::Unknown);
        assert_eq!(Status::from_stored(""), Status::Unknown);
    }

    #[test]
    fn presence_parse() {
        assert_eq!(Presence::from_stored("ABSENT"), Some(Presence::Absent));
        assert_eq!(Presence::from_stored("gone"), None);
    }
}
