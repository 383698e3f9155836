//! Schedule controllers.
//!
//! A controller owns one schedule: its in-memory active flag, the persisted
//! copy of that flag, and the pending notification in the backend.
//!
//! `toggle` always runs cancel, then set flag, then persist, then schedule
//! (when arming). The flag follows the requested value even when the
//! backend refuses, and the caller learns about the refusal through the
//! returned [`ToggleOutcome`].

mod daily;
mod reality_check;

use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::notify::Trigger;
use crate::schedule::ScheduleKind;
use crate::storage::KeyValueStore;

pub use daily::DailyController;
pub use reality_check::{ArmState, RealityCheckController};

/// Result of a `toggle` call, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToggleOutcome {
    Armed {
        kind: ScheduleKind,
        identifier: String,
        trigger: Trigger,
    },
    Disarmed {
        kind: ScheduleKind,
    },
    Failed {
        kind: ScheduleKind,
        requested: bool,
        #[serde(serialize_with = "serialize_error")]
        error: BackendError,
    },
}

fn serialize_error<S: Serializer>(error: &BackendError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

impl ToggleOutcome {
    pub fn kind(&self) -> ScheduleKind {
        match self {
            ToggleOutcome::Armed { kind, .. }
            | ToggleOutcome::Disarmed { kind }
            | ToggleOutcome::Failed { kind, .. } => *kind,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ToggleOutcome::Failed { .. })
    }

    /// Confirmation or failure text for the user.
    pub fn message(&self) -> String {
        match self {
            ToggleOutcome::Armed { kind, trigger, .. } => match trigger {
                Trigger::RecurringDaily { hour, minute } => {
                    format!("{kind} set for {hour:02}:{minute:02} every day.")
                }
                Trigger::RelativeSeconds { seconds } => {
                    format!("{kind} started. Next check in {} minutes.", seconds / 60)
                }
                Trigger::AbsoluteDate { date } => {
                    format!("{kind} started. First check at {}.", date.format("%Y-%m-%d %H:%M"))
                }
            },
            ToggleOutcome::Disarmed { kind } => format!("{kind} turned off."),
            ToggleOutcome::Failed {
                kind,
                requested: true,
                error: BackendError::PermissionDenied,
            } => format!("Could not schedule the {kind}: notifications are not allowed."),
            ToggleOutcome::Failed {
                kind,
                requested,
                error,
            } => {
                let action = if *requested { "schedule" } else { "cancel" };
                format!("Could not {action} the {kind}: {error}")
            }
        }
    }
}

/// The persisted active flag of one schedule.
///
/// Stored as the strings `"true"` and `"false"`; anything else reads as
/// inactive.
pub(crate) struct ActiveFlag {
    kind: ScheduleKind,
    store: Arc<dyn KeyValueStore>,
    value: bool,
}

impl ActiveFlag {
    pub(crate) fn new(kind: ScheduleKind, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kind,
            store,
            value: false,
        }
    }

    pub(crate) fn get(&self) -> bool {
        self.value
    }

    /// Replace the in-memory value with the persisted one.
    pub(crate) fn load(&mut self) -> bool {
        let key = self.kind.active_key();
        self.value = match self.store.get_item(key) {
            Ok(Some(raw)) => raw == "true",
            Ok(None) => false,
            Err(error) => {
                warn!(key, %error, "failed to read active flag, assuming inactive");
                false
            }
        };
        debug!(key, active = self.value, "loaded active flag");
        self.value
    }

    /// Set in memory and persist. A failed write is logged; the in-memory
    /// value still governs this session.
    pub(crate) fn set(&mut self, value: bool) {
        self.value = value;
        let key = self.kind.active_key();
        if let Err(error) = self.store.set_item(key, if value { "true" } else { "false" }) {
            warn!(key, %error, "failed to persist active flag");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn flag_reads_strings_strictly() {
        let store = Arc::new(MemoryStore::new());
        let mut flag = ActiveFlag::new(ScheduleKind::Reminder, store.clone());
        assert!(!flag.load());

        store.set_item("isReminderActive", "yes").unwrap();
        assert!(!flag.load());

        store.set_item("isReminderActive", "true").unwrap();
        assert!(flag.load());
    }

    #[test]
    fn flag_survives_write_failure_in_memory() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let mut flag = ActiveFlag::new(ScheduleKind::WbtbAlarm, store.clone());
        flag.set(true);
        assert!(flag.get());
        assert_eq!(store.get_item("isAlarmActive").unwrap(), None);
    }

    #[test]
    fn messages_describe_outcome() {
        let armed = ToggleOutcome::Armed {
            kind: ScheduleKind::Reminder,
            identifier: "dream-reminder".into(),
            trigger: Trigger::RecurringDaily { hour: 7, minute: 5 },
        };
        assert_eq!(armed.message(), "Dream reminder set for 07:05 every day.");

        let denied = ToggleOutcome::Failed {
            kind: ScheduleKind::RealityCheckTimer,
            requested: true,
            error: BackendError::PermissionDenied,
        };
        assert!(!denied.is_success());
        assert!(denied.message().contains("not allowed"));

        let json = serde_json::to_value(&denied).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["error"], "Notification permission has not been granted");
    }
}
