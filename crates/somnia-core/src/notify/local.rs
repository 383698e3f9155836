//! In-process notification center.
//!
//! Holds pending notifications in memory and delivers them when the caller
//! invokes [`LocalNotificationCenter::deliver_due`]. It has no internal
//! thread: the caller drives time.
//!
//! Scheduling an identifier that is already pending adds a second entry
//! instead of replacing the first, so callers have to cancel before they
//! reschedule.

use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    DeliveredNotification, DeliveryListener, NotificationBackend, NotificationContent,
    ScheduledNotification, SubscriptionId, Trigger,
};
use crate::clock::Clock;
use crate::error::BackendError;

pub struct LocalNotificationCenter {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

struct Inner {
    permission_granted: bool,
    pending: Vec<ScheduledNotification>,
    listeners: Vec<(SubscriptionId, DeliveryListener)>,
    next_subscription: SubscriptionId,
    schedule_calls: usize,
    fail_cancel: bool,
    fail_subscribe: bool,
}

impl LocalNotificationCenter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(Inner {
                permission_granted: true,
                pending: Vec::new(),
                listeners: Vec::new(),
                next_subscription: 1,
                schedule_calls: 0,
                fail_cancel: false,
                fail_subscribe: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Grant or revoke notification permission.
    pub fn set_permission(&self, granted: bool) {
        self.lock().permission_granted = granted;
    }

    /// Make `cancel` fail with [`BackendError::Unavailable`].
    pub fn set_fail_cancel(&self, fail: bool) {
        self.lock().fail_cancel = fail;
    }

    /// Make `subscribe` fail with [`BackendError::Unavailable`].
    pub fn set_fail_subscribe(&self, fail: bool) {
        self.lock().fail_subscribe = fail;
    }

    pub fn permission_granted(&self) -> bool {
        self.lock().permission_granted
    }

    /// Number of successful `schedule` calls since creation.
    pub fn schedule_calls(&self) -> usize {
        self.lock().schedule_calls
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn pending_for(&self, identifier: &str) -> Vec<ScheduledNotification> {
        self.lock()
            .pending
            .iter()
            .filter(|n| n.identifier == identifier)
            .cloned()
            .collect()
    }

    /// Deliver every notification whose fire time is at or before the
    /// clock's current time, then notify listeners.
    ///
    /// One-shot notifications are removed; daily ones are re-queued for
    /// their next occurrence.
    pub fn deliver_due(&self) -> Vec<DeliveredNotification> {
        let now = self.clock.now();
        let (delivered, listeners) = {
            let mut inner = self.lock();
            let (mut due, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut inner.pending)
                .into_iter()
                .partition(|n| n.fire_at <= now);
            inner.pending = rest;
            due.sort_by_key(|n| n.fire_at);

            let mut delivered = Vec::with_capacity(due.len());
            for notification in due {
                delivered.push(DeliveredNotification {
                    identifier: notification.identifier.clone(),
                    content: notification.content.clone(),
                    delivered_at: now,
                });
                if notification.trigger.repeats() {
                    let fire_at = notification.trigger.first_fire_at(now);
                    inner.pending.push(ScheduledNotification {
                        fire_at,
                        ..notification
                    });
                }
            }
            let listeners: Vec<DeliveryListener> =
                inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            (delivered, listeners)
        };

        for notification in &delivered {
            for listener in &listeners {
                listener(notification);
            }
        }
        delivered
    }
}

impl NotificationBackend for LocalNotificationCenter {
    fn schedule(
        &self,
        identifier: &str,
        content: &NotificationContent,
        trigger: &Trigger,
    ) -> Result<String, BackendError> {
        if identifier.is_empty() {
            return Err(BackendError::Rejected("identifier must not be empty".into()));
        }
        let fire_at = trigger.first_fire_at(self.clock.now());
        let mut inner = self.lock();
        if !inner.permission_granted {
            return Err(BackendError::PermissionDenied);
        }
        inner.pending.push(ScheduledNotification {
            identifier: identifier.to_string(),
            content: content.clone(),
            trigger: *trigger,
            fire_at,
        });
        inner.schedule_calls += 1;
        Ok(identifier.to_string())
    }

    fn cancel(&self, identifier: &str) -> Result<(), BackendError> {
        let mut inner = self.lock();
        if inner.fail_cancel {
            return Err(BackendError::Unavailable("cancel failed".into()));
        }
        inner.pending.retain(|n| n.identifier != identifier);
        Ok(())
    }

    fn pending(&self) -> Result<Vec<ScheduledNotification>, BackendError> {
        Ok(self.lock().pending.clone())
    }

    fn subscribe(&self, listener: DeliveryListener) -> Result<SubscriptionId, BackendError> {
        let mut inner = self.lock();
        if inner.fail_subscribe {
            return Err(BackendError::Unavailable("subscribe failed".into()));
        }
        let id = inner.next_subscription;
        inner.next_subscription += 1;
        inner.listeners.push((id, listener));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), BackendError> {
        self.lock().listeners.retain(|(sid, _)| *sid != id);
        Ok(())
    }
}
