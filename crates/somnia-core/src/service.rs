//! The schedule service: one object built at app start that owns all
//! three controllers and hands them the injected ports.
//!
//! ## Usage
//!
//! ```ignore
//! let mut service = ScheduleService::new(store, backend, clock);
//! service.initialize();
//! let outcome = service.toggle_reality_check(true, None);
//! println!("{}", outcome.message());
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::controller::{DailyController, RealityCheckController, ToggleOutcome};
use crate::error::Result;
use crate::notify::{NotificationBackend, NotificationStyle};
use crate::schedule::settings;
use crate::schedule::{DailyConfig, DailyKind, RealityCheckConfig};
use crate::storage::KeyValueStore;

/// Snapshot of every schedule: flags plus persisted settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleStatus {
    pub reminder: DailyStatus,
    pub wbtb_alarm: DailyStatus,
    pub reality_check: RealityCheckStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStatus {
    pub active: bool,
    pub settings: DailyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealityCheckStatus {
    pub active: bool,
    /// Whether the delivery loop is running in this process.
    pub armed: bool,
    pub settings: RealityCheckConfig,
}

pub struct ScheduleService {
    store: Arc<dyn KeyValueStore>,
    reminder: DailyController,
    alarm: DailyController,
    reality_check: RealityCheckController,
}

impl ScheduleService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn NotificationBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reality_check =
            RealityCheckController::new(Arc::clone(&store), Arc::clone(&backend), clock);
        Self::assemble(store, backend, reality_check)
    }

    /// Like [`ScheduleService::new`] with a seeded interval generator.
    pub fn with_seed(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn NotificationBackend>,
        clock: Arc<dyn Clock>,
        seed: u64,
    ) -> Self {
        let reality_check =
            RealityCheckController::with_seed(Arc::clone(&store), Arc::clone(&backend), clock, seed);
        Self::assemble(store, backend, reality_check)
    }

    fn assemble(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn NotificationBackend>,
        reality_check: RealityCheckController,
    ) -> Self {
        Self {
            reminder: DailyController::new(
                DailyKind::Reminder,
                Arc::clone(&store),
                Arc::clone(&backend),
            ),
            alarm: DailyController::new(DailyKind::WbtbAlarm, Arc::clone(&store), backend),
            reality_check,
            store,
        }
    }

    pub fn with_style(self, style: NotificationStyle) -> Self {
        Self {
            reminder: self.reminder.with_style(style),
            alarm: self.alarm.with_style(style),
            reality_check: self.reality_check.with_style(style),
            store: self.store,
        }
    }

    /// Load every persisted active flag. Nothing is re-armed; see
    /// [`ScheduleService::restore`].
    pub fn initialize(&mut self) -> ScheduleStatus {
        self.reminder.initialize();
        self.alarm.initialize();
        self.reality_check.initialize();
        self.status()
    }

    /// Re-arm every schedule whose persisted flag is set, using persisted
    /// settings. Call after [`ScheduleService::initialize`] on launch.
    pub fn restore(&mut self) -> Vec<ToggleOutcome> {
        let mut outcomes = Vec::new();
        if self.reminder.state() {
            outcomes.push(self.toggle_reminder(true, None));
        }
        if self.alarm.state() {
            outcomes.push(self.toggle_alarm(true, None));
        }
        if self.reality_check.state() {
            outcomes.push(self.toggle_reality_check(true, None));
        }
        info!(restored = outcomes.len(), "restored persisted schedules");
        outcomes
    }

    /// Toggle the dream reminder. Explicit settings are saved first;
    /// otherwise the persisted settings are used.
    pub fn toggle_reminder(&mut self, value: bool, config: Option<&DailyConfig>) -> ToggleOutcome {
        let config = self.daily_config(DailyKind::Reminder, config);
        self.reminder.toggle(value, &config)
    }

    pub fn toggle_alarm(&mut self, value: bool, config: Option<&DailyConfig>) -> ToggleOutcome {
        let config = self.daily_config(DailyKind::WbtbAlarm, config);
        self.alarm.toggle(value, &config)
    }

    pub fn toggle_reality_check(
        &mut self,
        value: bool,
        config: Option<&RealityCheckConfig>,
    ) -> ToggleOutcome {
        let config = match config {
            Some(config) => {
                if let Err(error) = settings::save_reality_check(self.store.as_ref(), config) {
                    warn!(%error, "failed to save reality-check settings");
                }
                config.clone()
            }
            None => settings::load_reality_check(self.store.as_ref()),
        };
        self.reality_check.toggle(value, &config)
    }

    fn daily_config(&self, kind: DailyKind, config: Option<&DailyConfig>) -> DailyConfig {
        match config {
            Some(config) => {
                if let Err(error) = settings::save_daily(self.store.as_ref(), kind, config) {
                    warn!(?kind, %error, "failed to save daily settings");
                }
                config.clone()
            }
            None => settings::load_daily(self.store.as_ref(), kind),
        }
    }

    pub fn status(&self) -> ScheduleStatus {
        ScheduleStatus {
            reminder: DailyStatus {
                active: self.reminder.state(),
                settings: self.daily_settings(DailyKind::Reminder),
            },
            wbtb_alarm: DailyStatus {
                active: self.alarm.state(),
                settings: self.daily_settings(DailyKind::WbtbAlarm),
            },
            reality_check: RealityCheckStatus {
                active: self.reality_check.state(),
                armed: self.reality_check.is_armed(),
                settings: self.reality_check_settings(),
            },
        }
    }

    pub fn daily_settings(&self, kind: DailyKind) -> DailyConfig {
        settings::load_daily(self.store.as_ref(), kind)
    }

    pub fn save_daily_settings(&self, kind: DailyKind, config: &DailyConfig) -> Result<()> {
        settings::save_daily(self.store.as_ref(), kind, config)
    }

    pub fn reality_check_settings(&self) -> RealityCheckConfig {
        settings::load_reality_check(self.store.as_ref())
    }

    pub fn save_reality_check_settings(&self, config: &RealityCheckConfig) -> Result<()> {
        settings::save_reality_check(self.store.as_ref(), config)
    }

    pub fn reality_check(&self) -> &RealityCheckController {
        &self.reality_check
    }
}
