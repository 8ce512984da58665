//! Terminal result of dispatching one event.

use std::fmt;

/// Why an event ended without touching either store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No handler is registered for the event's subsystem.
    NoHandler,
    /// The handler's `add` produced no record.
    NoDevice,
    /// A removal event matched no committed record.
    NotFound,
    /// The event carries no device path.
    EmptyPath,
}

/// Why a provisional record was evicted before commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    /// The probe helper could not be started.
    HelperSpawn,
    HelperFailed { exit_code: i32 },
    HelperTimeout,
    PostProbeRejected,
    /// Identity computation failed.
    NoIdentity,
    /// The global store refused the record (UDI collision).
    CommitRejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Committed { udi: String },
    Removed { udi: Option<String> },
    Ignored(IgnoreReason),
    Discarded(DiscardReason),
}

impl DispatchOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, DispatchOutcome::Committed { .. })
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::Committed { udi } => write!(f, "committed {udi}"),
            DispatchOutcome::Removed { udi } => {
                write!(f, "removed {}", udi.as_deref().unwrap_or("<no udi>"))
            }
            DispatchOutcome::Ignored(reason) => write!(f, "ignored ({reason:?})"),
            DispatchOutcome::Discarded(reason) => write!(f, "discarded ({reason:?})"),
        }
    }
}
