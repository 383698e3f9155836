use std::sync::Arc;

use tracing::{error, info};

use super::{ActiveFlag, ToggleOutcome};
use crate::notify::{NotificationBackend, NotificationStyle, Trigger};
use crate::schedule::{DailyConfig, DailyKind};
use crate::storage::KeyValueStore;

/// Controller for a once-a-day schedule (dream reminder or WBTB alarm).
///
/// Arming schedules a backend-native daily trigger, so no delivery
/// subscription is needed.
pub struct DailyController {
    kind: DailyKind,
    backend: Arc<dyn NotificationBackend>,
    flag: ActiveFlag,
    style: NotificationStyle,
}

impl DailyController {
    pub fn new(
        kind: DailyKind,
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn NotificationBackend>,
    ) -> Self {
        Self {
            kind,
            backend,
            flag: ActiveFlag::new(kind.kind(), store),
            style: NotificationStyle::default(),
        }
    }

    pub fn with_style(mut self, style: NotificationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn kind(&self) -> DailyKind {
        self.kind
    }

    /// Load the persisted active flag. Does not touch the backend.
    pub fn initialize(&mut self) -> bool {
        self.flag.load()
    }

    pub fn state(&self) -> bool {
        self.flag.get()
    }

    pub fn toggle(&mut self, value: bool, config: &DailyConfig) -> ToggleOutcome {
        let kind = self.kind.kind();
        let identifier = kind.identifier();

        let cancelled = self.backend.cancel(identifier);
        self.flag.set(value);

        if let Err(error) = cancelled {
            error!(identifier, %error, "failed to cancel pending notification");
            return ToggleOutcome::Failed {
                kind,
                requested: value,
                error,
            };
        }

        if !value {
            info!(identifier, "schedule disarmed");
            return ToggleOutcome::Disarmed { kind };
        }

        let trigger = Trigger::RecurringDaily {
            hour: config.time().hour(),
            minute: config.time().minute(),
        };
        match self
            .backend
            .schedule(identifier, &config.content(self.style), &trigger)
        {
            Ok(identifier) => {
                info!(%identifier, time = %config.time(), "daily schedule armed");
                ToggleOutcome::Armed {
                    kind,
                    identifier,
                    trigger,
                }
            }
            Err(error) => {
                error!(identifier, %error, "failed to schedule daily notification");
                ToggleOutcome::Failed {
                    kind,
                    requested: true,
                    error,
                }
            }
        }
    }
}
