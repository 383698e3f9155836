//! Local notification backend port.
//!
//! Controllers only talk to the device through [`NotificationBackend`].
//! [`LocalNotificationCenter`] is the in-process implementation used by the
//! CLI `watch` loop and by tests.

mod local;

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, ValidationError};

pub use local::LocalNotificationCenter;

/// When a notification fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fire once, `seconds` after scheduling.
    RelativeSeconds { seconds: u64 },
    /// Fire once at a local wall-clock instant.
    AbsoluteDate { date: NaiveDateTime },
    /// Fire every day at `hour:minute`.
    RecurringDaily { hour: u32, minute: u32 },
}

impl Trigger {
    pub fn repeats(&self) -> bool {
        matches!(self, Trigger::RecurringDaily { .. })
    }

    /// First fire time for a trigger scheduled at `now`.
    ///
    /// Dates in the past fire immediately. A daily trigger whose time
    /// equals `now` fires tomorrow.
    pub fn first_fire_at(&self, now: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Trigger::RelativeSeconds { seconds } => {
                Duration::try_seconds(i64::try_from(seconds).unwrap_or(i64::MAX))
                    .and_then(|d| now.checked_add_signed(d))
                    .unwrap_or(NaiveDateTime::MAX)
            }
            Trigger::AbsoluteDate { date } => date.max(now),
            Trigger::RecurringDaily { hour, minute } => next_daily(now, hour, minute),
        }
    }
}

fn next_daily(after: NaiveDateTime, hour: u32, minute: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today = after.date().and_time(time);
    if today > after {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Presentation flags applied to every notification a controller schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStyle {
    pub sound: bool,
    pub auto_dismiss: bool,
}

impl Default for NotificationStyle {
    fn default() -> Self {
        Self {
            sound: true,
            auto_dismiss: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    #[serde(default = "default_true")]
    pub sound: bool,
    #[serde(default)]
    pub auto_dismiss: bool,
}

fn default_true() -> bool {
    true
}

impl NotificationContent {
    /// Content with the default style. Title and body must not be blank.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        let body = body.into();
        if title.trim().is_empty() {
            return Err(ValidationError::invalid("title", "must not be empty"));
        }
        if body.trim().is_empty() {
            return Err(ValidationError::invalid("body", "must not be empty"));
        }
        Ok(Self::styled(title, body, NotificationStyle::default()))
    }

    pub(crate) fn styled(
        title: impl Into<String>,
        body: impl Into<String>,
        style: NotificationStyle,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            sound: style.sound,
            auto_dismiss: style.auto_dismiss,
        }
    }
}

/// A notification waiting in the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub identifier: String,
    pub content: NotificationContent,
    pub trigger: Trigger,
    pub fire_at: NaiveDateTime,
}

/// Payload handed to delivery listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredNotification {
    pub identifier: String,
    pub content: NotificationContent,
    pub delivered_at: NaiveDateTime,
}

pub type SubscriptionId = u64;

pub type DeliveryListener = Arc<dyn Fn(&DeliveredNotification) + Send + Sync>;

/// Device notification scheduler.
///
/// Implementations must not call listeners while holding locks that
/// `schedule` or `cancel` need: listeners reschedule from inside the
/// callback.
pub trait NotificationBackend: Send + Sync {
    /// Schedule a notification and return its identifier.
    fn schedule(
        &self,
        identifier: &str,
        content: &NotificationContent,
        trigger: &Trigger,
    ) -> Result<String, BackendError>;

    /// Cancel every pending notification with `identifier`.
    fn cancel(&self, identifier: &str) -> Result<(), BackendError>;

    /// All pending notifications.
    fn pending(&self) -> Result<Vec<ScheduledNotification>, BackendError>;

    fn subscribe(&self, listener: DeliveryListener) -> Result<SubscriptionId, BackendError>;

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BackendError>;
}
