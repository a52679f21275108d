use crate::domain::models::{Notification, NotificationPermission, ScheduleItem};
use crate::domain::time::{Clock, parse_time};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notifier::Notifier;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const NOTIFICATION_TITLE: &str = "次のタスクの時間です！";
pub const NOTIFICATION_ICON: &str = "data:image/svg+xml,<svg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 100 100%22><text y=%22.9em%22 font-size=%2290%22>⏰</text></svg>";

#[derive(Debug, Default)]
struct TimerRegistry {
    timers: HashMap<u64, AbortHandle>,
    closed: bool,
}

impl TimerRegistry {
    fn abort_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

pub fn notification_for(item: &ScheduleItem) -> Notification {
    Notification {
        title: NOTIFICATION_TITLE.to_string(),
        body: format!("{} ({})", item.task, item.time),
        icon: NOTIFICATION_ICON.to_string(),
    }
}

/// One-shot start-of-item timers for the current schedule.
///
/// Must be used from within a tokio runtime.
pub struct NotificationScheduler<N>
where
    N: Notifier + ?Sized + 'static,
{
    notifier: Arc<N>,
    clock: Clock,
    armed: Arc<Mutex<TimerRegistry>>,
    next_timer_id: AtomicU64,
}

impl<N> NotificationScheduler<N>
where
    N: Notifier + ?Sized + 'static,
{
    pub fn new(notifier: Arc<N>, clock: Clock) -> Self {
        Self {
            notifier,
            clock,
            armed: Arc::new(Mutex::new(TimerRegistry::default())),
            next_timer_id: AtomicU64::new(1),
        }
    }

    /// Cancels every armed timer, then arms one per item whose start is still ahead.
    ///
    /// `permission` is read once here; nothing is armed unless it is granted.
    /// Nothing is armed after [`close`](Self::close).
    pub fn rebuild(
        &self,
        schedule: &[ScheduleItem],
        permission: NotificationPermission,
    ) -> Result<usize, InfraError> {
        let mut armed = self.lock_armed()?;
        armed.abort_all();

        if armed.closed {
            debug!("scheduler closed; no timers armed");
            return Ok(0);
        }
        if !permission.is_granted() {
            debug!(?permission, "notifications not granted; no timers armed");
            return Ok(0);
        }

        let now = self.clock.now();
        for item in schedule {
            let (start, _) = item.time_range();
            let Some(notification_time) = parse_time(start, &self.clock) else {
                continue;
            };
            let Ok(delay) = (notification_time - now).to_std() else {
                continue;
            };
            if delay.is_zero() {
                continue;
            }

            let timer_id = self.next_timer_id.fetch_add(1, Ordering::Relaxed);
            let notifier = Arc::clone(&self.notifier);
            let registry = Arc::clone(&self.armed);
            let notification = notification_for(item);

            let handle = tokio::spawn(async move {
                sleep(delay).await;
                if let Err(error) = notifier.notify(&notification).await {
                    warn!(error = %error, body = %notification.body, "failed to raise notification");
                }
                if let Ok(mut armed) = registry.lock() {
                    armed.timers.remove(&timer_id);
                }
            });
            armed.timers.insert(timer_id, handle.abort_handle());
        }

        debug!(count = armed.timers.len(), "notification timers armed");
        Ok(armed.timers.len())
    }

    /// Cancels every armed timer and refuses to arm new ones.
    pub fn close(&self) -> Result<(), InfraError> {
        let mut armed = self.lock_armed()?;
        armed.closed = true;
        armed.abort_all();
        Ok(())
    }

    pub fn armed_count(&self) -> usize {
        self.lock_armed().map(|armed| armed.timers.len()).unwrap_or(0)
    }

    fn lock_armed(&self) -> Result<MutexGuard<'_, TimerRegistry>, InfraError> {
        self.armed
            .lock()
            .map_err(|error| InfraError::Notification(format!("timer registry lock poisoned: {error}")))
    }
}
