//! # Somnia Core Library
//!
//! Local notification scheduling for a dream-journal app: the daily dream
//! reminder, the wake-back-to-bed alarm and the reality-check timer that
//! keeps nudging the user while they are awake.
//!
//! All device access goes through ports so the same logic runs on a phone
//! shell, in the CLI and under test.
//!
//! ## Architecture
//!
//! - **Trigger calculator**: pure next-fire computation for the reality-check
//!   timer across day boundaries and overnight windows
//! - **Controllers**: one per schedule; cancel, persist the active flag,
//!   schedule
//! - **Self-rescheduling loop**: the reality-check timer's `Idle`/`Armed`
//!   state machine
//! - **Storage**: key-value port with SQLite and in-memory adapters, TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`ScheduleService`]: owns the three controllers
//! - [`compute_next_trigger`]: the trigger calculator
//! - [`NotificationBackend`]: trait for the device notification scheduler
//! - [`KeyValueStore`]: trait for durable flag and settings storage

pub mod clock;
pub mod controller;
pub mod error;
pub mod notify;
pub mod schedule;
pub mod service;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{ArmState, DailyController, RealityCheckController, ToggleOutcome};
pub use error::{BackendError, ConfigError, CoreError, StorageError, ValidationError};
pub use notify::{
    DeliveredNotification, LocalNotificationCenter, NotificationBackend, NotificationContent,
    NotificationStyle, ScheduledNotification, Trigger,
};
pub use schedule::{
    compute_next_trigger, DailyConfig, DailyKind, RealityCheckConfig, ScheduleKind, TimeOfDay,
};
pub use service::{ScheduleService, ScheduleStatus};
pub use storage::{Config, Database, KeyValueStore, MemoryStore};
