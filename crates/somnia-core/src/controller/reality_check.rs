//! Reality-check timer controller and its self-rescheduling loop.
//!
//! The backend has no "repeat every N minutes, but only while awake"
//! trigger, so the controller schedules one notification at a time and
//! listens for its delivery to schedule the next.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --toggle(true)--> Armed --delivered--> Armed
//!   ^                      |
//!   +----toggle(false)-----+
//! ```
//!
//! `Armed` owns the only delivery subscription together with the settings
//! captured when it was armed. Later settings edits have no effect until
//! the next toggle.
//!
//! If a reschedule from the listener fails, nothing is pending any more and
//! the loop has stalled: the state stays `Armed` so the next toggle still
//! releases the subscription, but [`RealityCheckController::is_armed`]
//! reports `false`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use tracing::{debug, error, info, warn};

use super::{ActiveFlag, ToggleOutcome};
use crate::clock::Clock;
use crate::error::BackendError;
use crate::notify::{
    DeliveredNotification, DeliveryListener, NotificationBackend, NotificationStyle,
    SubscriptionId, Trigger,
};
use crate::schedule::{compute_next_trigger, RealityCheckConfig, ScheduleKind};
use crate::storage::KeyValueStore;

const KIND: ScheduleKind = ScheduleKind::RealityCheckTimer;

type SharedRng = Arc<Mutex<Mcg128Xsl64>>;

#[derive(Debug, Clone, PartialEq)]
pub enum ArmState {
    Idle,
    Armed {
        subscription: SubscriptionId,
        config: RealityCheckConfig,
    },
}

pub struct RealityCheckController {
    backend: Arc<dyn NotificationBackend>,
    clock: Arc<dyn Clock>,
    rng: SharedRng,
    flag: ActiveFlag,
    style: NotificationStyle,
    state: ArmState,
    stalled: Arc<AtomicBool>,
}

impl RealityCheckController {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn NotificationBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_rng(store, backend, clock, Mcg128Xsl64::from_entropy())
    }

    /// Deterministic random intervals, for tests and simulations.
    pub fn with_seed(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn NotificationBackend>,
        clock: Arc<dyn Clock>,
        seed: u64,
    ) -> Self {
        Self::with_rng(store, backend, clock, Mcg128Xsl64::seed_from_u64(seed))
    }

    fn with_rng(
        store: Arc<dyn KeyValueStore>,
        backend: Arc<dyn NotificationBackend>,
        clock: Arc<dyn Clock>,
        rng: Mcg128Xsl64,
    ) -> Self {
        Self {
            backend,
            clock,
            rng: Arc::new(Mutex::new(rng)),
            flag: ActiveFlag::new(KIND, store),
            style: NotificationStyle::default(),
            state: ArmState::Idle,
            stalled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_style(mut self, style: NotificationStyle) -> Self {
        self.style = style;
        self
    }

    /// Load the persisted active flag. Does not re-arm.
    pub fn initialize(&mut self) -> bool {
        self.flag.load()
    }

    pub fn state(&self) -> bool {
        self.flag.get()
    }

    pub fn arm_state(&self) -> &ArmState {
        &self.state
    }

    /// Armed with a live loop: a reality check is pending.
    pub fn is_armed(&self) -> bool {
        matches!(self.state, ArmState::Armed { .. }) && !self.is_stalled()
    }

    /// Whether a reschedule from the delivery listener failed since arming.
    pub fn is_stalled(&self) -> bool {
        self.stalled.load(Ordering::SeqCst)
    }

    /// Settings captured at arm time, if armed.
    pub fn frozen_config(&self) -> Option<&RealityCheckConfig> {
        match &self.state {
            ArmState::Armed { config, .. } => Some(config),
            ArmState::Idle => None,
        }
    }

    pub fn toggle(&mut self, value: bool, config: &RealityCheckConfig) -> ToggleOutcome {
        let identifier = KIND.identifier();

        self.release_subscription();
        self.stalled = Arc::new(AtomicBool::new(false));
        let cancelled = self.backend.cancel(identifier);
        self.flag.set(value);

        if let Err(error) = cancelled {
            error!(identifier, %error, "failed to cancel pending reality check");
            return self.failed(value, error);
        }

        if !value {
            info!(identifier, "reality-check timer disarmed");
            return ToggleOutcome::Disarmed { kind: KIND };
        }

        let next = Rescheduler {
            backend: Arc::downgrade(&self.backend),
            stalled: Arc::clone(&self.stalled),
            clock: Arc::clone(&self.clock),
            rng: Arc::clone(&self.rng),
            config: config.clone(),
            style: self.style,
        };

        let trigger = match next.schedule() {
            Ok(trigger) => trigger,
            Err(error) => {
                error!(identifier, %error, "failed to schedule reality check");
                return self.failed(true, error);
            }
        };

        let listener: DeliveryListener = Arc::new(move |delivered: &DeliveredNotification| {
            next.on_delivered(delivered)
        });
        match self.backend.subscribe(listener) {
            Ok(subscription) => {
                self.state = ArmState::Armed {
                    subscription,
                    config: config.clone(),
                };
                info!(
                    identifier,
                    subscription,
                    interval_minutes = config.interval_minutes(),
                    random = config.is_random(),
                    "reality-check timer armed"
                );
                ToggleOutcome::Armed {
                    kind: KIND,
                    identifier: identifier.to_string(),
                    trigger,
                }
            }
            Err(error) => {
                error!(identifier, %error, "failed to subscribe to deliveries");
                if let Err(error) = self.backend.cancel(identifier) {
                    warn!(identifier, %error, "failed to cancel orphaned reality check");
                }
                self.failed(true, error)
            }
        }
    }

    fn failed(&self, requested: bool, error: BackendError) -> ToggleOutcome {
        ToggleOutcome::Failed {
            kind: KIND,
            requested,
            error,
        }
    }

    /// Leave `Armed`, removing the delivery subscription.
    fn release_subscription(&mut self) {
        if let ArmState::Armed { subscription, .. } =
            std::mem::replace(&mut self.state, ArmState::Idle)
        {
            if let Err(error) = self.backend.unsubscribe(subscription) {
                warn!(subscription, %error, "failed to remove delivery subscription");
            }
        }
    }
}

impl Drop for RealityCheckController {
    fn drop(&mut self) {
        self.release_subscription();
    }
}

/// Everything the delivery listener needs, frozen at arm time.
struct Rescheduler {
    backend: Weak<dyn NotificationBackend>,
    stalled: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
    rng: SharedRng,
    config: RealityCheckConfig,
    style: NotificationStyle,
}

impl Rescheduler {
    fn schedule(&self) -> Result<Trigger, BackendError> {
        let backend = self
            .backend
            .upgrade()
            .ok_or_else(|| BackendError::Unavailable("backend dropped".into()))?;
        let now = self.clock.now();
        let trigger = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            compute_next_trigger(now, &self.config, &mut *rng)
        };
        backend.schedule(KIND.identifier(), &self.config.content(self.style), &trigger)?;
        Ok(trigger)
    }

    fn on_delivered(&self, delivered: &DeliveredNotification) {
        if delivered.identifier != KIND.identifier() {
            return;
        }
        match self.schedule() {
            Ok(trigger) => debug!(?trigger, "rescheduled reality check"),
            Err(error) => {
                self.stalled.store(true, Ordering::SeqCst);
                error!(%error, "failed to reschedule reality check, loop stalled");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::notify::LocalNotificationCenter;
    use crate::schedule::TimeOfDay;
    use crate::storage::MemoryStore;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    const ID: &str = "reality-check";

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
        center: Arc<LocalNotificationCenter>,
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    impl Fixture {
        fn new(now: NaiveDateTime) -> Self {
            let clock = Arc::new(FixedClock::new(now));
            Self {
                store: Arc::new(MemoryStore::new()),
                center: Arc::new(LocalNotificationCenter::new(clock.clone())),
                clock,
            }
        }

        fn controller(&self) -> RealityCheckController {
            RealityCheckController::with_seed(
                self.store.clone(),
                self.center.clone(),
                self.clock.clone(),
                7,
            )
        }
    }

    fn config(interval: u32) -> RealityCheckConfig {
        RealityCheckConfig::with_timing(
            interval,
            false,
            TimeOfDay::new(8, 0).unwrap(),
            TimeOfDay::new(23, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn arming_inside_window_schedules_relative_trigger() {
        let fx = Fixture::new(at(9, 30));
        let mut timer = fx.controller();
        let outcome = timer.toggle(true, &config(60));

        assert_eq!(
            outcome,
            ToggleOutcome::Armed {
                kind: KIND,
                identifier: ID.into(),
                trigger: Trigger::RelativeSeconds { seconds: 3600 },
            }
        );
        assert!(timer.is_armed());
        assert_eq!(fx.center.subscription_count(), 1);
        assert_eq!(fx.center.pending_for(ID)[0].fire_at, at(10, 30));
    }

    #[test]
    fn arm_then_disarm_leaves_nothing_behind() {
        let fx = Fixture::new(at(9, 30));
        let mut timer = fx.controller();
        timer.toggle(true, &config(60));
        let outcome = timer.toggle(false, &config(60));

        assert_eq!(outcome, ToggleOutcome::Disarmed { kind: KIND });
        assert_eq!(timer.arm_state(), &ArmState::Idle);
        assert!(fx.center.pending_for(ID).is_empty());
        assert_eq!(fx.center.subscription_count(), 0);
        assert_eq!(fx.store.get_item("isTimerActive").unwrap().as_deref(), Some("false"));
    }

    #[test]
    fn rearming_never_duplicates() {
        let fx = Fixture::new(at(9, 30));
        let mut timer = fx.controller();
        timer.toggle(true, &config(60));
        timer.toggle(true, &config(30));

        assert_eq!(fx.center.pending_for(ID).len(), 1);
        assert_eq!(fx.center.subscription_count(), 1);
        assert_eq!(timer.frozen_config().map(|c| c.interval_minutes()), Some(30));
    }

    #[test]
    fn each_delivery_schedules_exactly_one_more() {
        let fx = Fixture::new(at(9, 0));
        let mut timer = fx.controller();
        timer.toggle(true, &config(20));
        let base = fx.center.schedule_calls();

        for n in 1..=5 {
            fx.clock.advance(Duration::minutes(20));
            let delivered = fx.center.deliver_due();
            assert_eq!(delivered.len(), 1);
            assert_eq!(fx.center.schedule_calls(), base + n);
            assert_eq!(fx.center.pending_for(ID).len(), 1);
            assert_eq!(fx.center.subscription_count(), 1);
        }
    }

    #[test]
    fn last_check_of_the_day_rolls_to_tomorrow() {
        let fx = Fixture::new(at(22, 30));
        let mut timer = fx.controller();
        timer.toggle(true, &config(60));

        fx.clock.set(at(23, 30));
        fx.center.deliver_due();
        let pending = fx.center.pending_for(ID);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].fire_at, at(8, 0) + Duration::days(1));
    }

    #[test]
    fn frozen_config_drives_rescheduling() {
        let fx = Fixture::new(at(9, 0));
        let mut timer = fx.controller();
        let armed_with = config(20);
        timer.toggle(true, &armed_with);

        // Saving different settings does not reach the armed loop.
        crate::schedule::settings::save_reality_check(fx.store.as_ref(), &config(120)).unwrap();

        fx.clock.advance(Duration::minutes(20));
        fx.center.deliver_due();
        assert_eq!(fx.center.pending_for(ID)[0].fire_at, at(9, 40));
        assert_eq!(timer.frozen_config(), Some(&armed_with));
    }

    #[test]
    fn other_deliveries_do_not_reschedule() {
        let fx = Fixture::new(at(9, 0));
        let mut timer = fx.controller();
        timer.toggle(true, &config(60));
        let content = crate::notify::NotificationContent::new("x", "y").unwrap();
        fx.center
            .schedule("dream-reminder", &content, &Trigger::RelativeSeconds { seconds: 60 })
            .unwrap();
        let base = fx.center.schedule_calls();

        fx.clock.advance(Duration::minutes(1));
        fx.center.deliver_due();
        assert_eq!(fx.center.schedule_calls(), base);
    }

    #[test]
    fn disarming_does_not_touch_other_schedules() {
        let fx = Fixture::new(at(9, 0));
        let content = crate::notify::NotificationContent::new("x", "y").unwrap();
        fx.center
            .schedule("dream-reminder", &content, &Trigger::RecurringDaily { hour: 8, minute: 0 })
            .unwrap();
        let mut timer = fx.controller();
        timer.toggle(true, &config(60));
        timer.toggle(false, &config(60));
        assert_eq!(fx.center.pending_for("dream-reminder").len(), 1);
    }

    #[test]
    fn permission_denied_stays_idle_with_optimistic_flag() {
        let fx = Fixture::new(at(9, 0));
        fx.center.set_permission(false);
        let mut timer = fx.controller();
        let outcome = timer.toggle(true, &config(60));

        assert!(!outcome.is_success());
        assert!(timer.state());
        assert!(!timer.is_armed());
        assert_eq!(fx.center.subscription_count(), 0);
        assert_eq!(fx.store.get_item("isTimerActive").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn dropping_armed_controller_releases_subscription() {
        let fx = Fixture::new(at(9, 0));
        {
            let mut timer = fx.controller();
            timer.toggle(true, &config(60));
            assert_eq!(fx.center.subscription_count(), 1);
        }
        assert_eq!(fx.center.subscription_count(), 0);
    }

    #[test]
    fn random_intervals_respect_bounds_across_deliveries() {
        let fx = Fixture::new(at(8, 0));
        let mut timer = fx.controller();
        let cfg = RealityCheckConfig::with_timing(
            45,
            true,
            TimeOfDay::new(8, 0).unwrap(),
            TimeOfDay::new(23, 0).unwrap(),
        )
        .unwrap();
        timer.toggle(true, &cfg);

        for _ in 0..10 {
            let now = fx.clock.now();
            let next = fx.center.pending_for(ID)[0].fire_at;
            let gap = (next - now).num_minutes();
            assert!((5..=45).contains(&gap), "gap {gap} out of bounds");
            fx.clock.set(next);
            fx.center.deliver_due();
        }
    }

    #[test]
    fn cancel_failure_reports_and_schedules_nothing() {
        let fx = Fixture::new(at(9, 0));
        let mut timer = fx.controller();
        fx.center.set_fail_cancel(true);
        let outcome = timer.toggle(true, &config(60));

        assert!(matches!(
            outcome,
            ToggleOutcome::Failed {
                requested: true,
                error: BackendError::Unavailable(_),
                ..
            }
        ));
        assert!(timer.state());
        assert!(!timer.is_armed());
        assert!(fx.center.pending_for(ID).is_empty());
        assert_eq!(fx.center.subscription_count(), 0);
        assert_eq!(fx.store.get_item("isTimerActive").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn subscribe_failure_cancels_orphan_and_stays_idle() {
        let fx = Fixture::new(at(9, 0));
        let mut timer = fx.controller();
        fx.center.set_fail_subscribe(true);
        let outcome = timer.toggle(true, &config(60));

        assert!(!outcome.is_success());
        assert_eq!(timer.arm_state(), &ArmState::Idle);
        assert!(timer.state());
        assert_eq!(fx.center.schedule_calls(), 1);
        assert!(fx.center.pending_for(ID).is_empty());
        assert_eq!(fx.center.subscription_count(), 0);
    }

    #[test]
    fn failed_reschedule_marks_loop_stalled() {
        let fx = Fixture::new(at(9, 0));
        let mut timer = fx.controller();
        timer.toggle(true, &config(30));

        fx.center.set_permission(false);
        fx.clock.advance(Duration::minutes(30));
        assert_eq!(fx.center.deliver_due().len(), 1);

        assert!(fx.center.pending_for(ID).is_empty());
        assert!(timer.is_stalled());
        assert!(!timer.is_armed());
        assert!(timer.state());

        fx.center.set_permission(true);
        assert!(timer.toggle(true, &config(30)).is_success());
        assert!(timer.is_armed());
        assert!(!timer.is_stalled());
        assert_eq!(fx.center.subscription_count(), 1);
        assert_eq!(fx.center.pending_for(ID).len(), 1);
    }
}
