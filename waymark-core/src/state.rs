//! Migration state machine.
//!
//! Three actors move a migration between states:
//!
//! | Trigger        | Allowed moves                                        |
//! |----------------|------------------------------------------------------|
//! | Reconciliation | `PENDING → MANUAL` only                              |
//! | Execution      | `PENDING`/`MANUAL`/`FAILED` → `DONE` or `FAILED`     |
//! | Administrative | any → any persistable state                          |
//!
//! `UNKNOWN` is a read-side sentinel and is never a legal target.

use thiserror::Error;

use crate::types::Status;

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Reconcile,
    Execute,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{trigger:?} may not move a migration from {from} to {to}")]
pub struct TransitionError {
    pub trigger: Trigger,
    pub from: Status,
    pub to: Status,
}

impl Status {
    /// A disposition has been recorded; reconciliation must leave it alone.
    pub fn is_settled(self) -> bool {
        matches!(self, Status::Done | Status::Failed | Status::Skip)
    }

    /// Selected by a batch run. `DONE` and `SKIP` are excluded.
    pub fn is_runnable(self) -> bool {
        !matches!(self, Status::Done | Status::Skip)
    }

    /// Terminal status for a finished script.
    pub fn from_exit(success: bool) -> Status {
        if success {
            Status::Done
        } else {
            Status::Failed
        }
    }
}

/// Check a requested move against the table above.
pub fn check_transition(trigger: Trigger, from: Status, to: Status) -> Result<(), TransitionError> {
    let allowed = to.is_persistable()
        && match trigger {
            Trigger::Reconcile => from == Status::Pending && to == Status::Manual,
            Trigger::Execute => {
                matches!(from, Status::Pending | Status::Manual | Status::Failed)
                    && matches!(to, Status::Done | Status::Failed)
            }
            Trigger::Admin => true,
        };
    if allowed {
        Ok(())
    } else {
        Err(TransitionError { trigger, from, to })
    }
}

/// Reconciliation's documentation heuristic: a migration with a readme is
/// manual unless something already settled it.
pub fn should_mark_manual(current: Status) -> bool {
    !current.is_settled() && current != Status::Manual && current != Status::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Status::Pending, true)]
    #[case(Status::Manual, false)]
    #[case(Status::Done, false)]
    #[case(Status::Failed, false)]
    #[case(Status::Skip, false)]
    #[case(Status::Unknown, false)]
    fn manual_detection_respects_settled_states(#[case] current: Status, #[case] expected: bool) {
        assert_eq!(should_mark_manual(current), expected);
    }

    #[rstest]
    #[case(Status::Pending, Status::Manual, true)]
    #[case(Status::Manual, Status::Pending, false)]
    #[case(Status::Done, Status::Manual, false)]
    #[case(Status::Skip, Status::Manual, false)]
    fn reconcile_transitions(#[case] from: Status, #[case] to: Status, #[case] ok: bool) {
        assert_eq!(check_transition(Trigger::Reconcile, from, to).is_ok(), ok);
    }

    #[rstest]
    #[case(Status::Pending, Status::Done, true)]
    #[case(Status::Manual, Status::Failed, true)]
    #[case(Status::Failed, Status::Done, true)]
    #[case(Status::Done, Status::Done, false)]
    #[case(Status::Skip, Status::Done, false)]
    #[case(Status::Pending, Status::Skip, false)]
    fn execute_transitions(#[case] from: Status, #[case] to: Status, #[case] ok: bool) {
        assert_eq!(check_transition(Trigger::Execute, from, to).is_ok(), ok);
    }

    #[test]
    fn admin_may_overwrite_anything_but_not_to_unknown() {
        for from in Status::ALL {
            for to in Status::ALL {
                let res = check_transition(Trigger::Admin, from, to);
                assert_eq!(res.is_ok(), to != Status::Unknown, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn runnable_and_exit_mapping() {
        assert!(Status::Pending.is_runnable());
        assert!(Status::Failed.is_runnable());
        assert!(Status::Manual.is_runnable());
        assert!(!Status::Done.is_runnable());
        assert!(!Status::Skip.is_runnable());
        assert_eq!(Status::from_exit(true), Status::Done);
        assert_eq!(Status::from_exit(false), Status::Failed);
    }
}
