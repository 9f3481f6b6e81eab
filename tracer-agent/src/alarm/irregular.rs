use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::WakePolicy;

/// Floor applied to every computed delay so a zero delay cannot spin.
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Decides, on every firing, what to do and when to fire next.
pub trait IrregularSchedule: Send + Sync {
    /// Delay from `now` until the next firing.
    fn next_delay(&self, now: Instant) -> Duration;

    /// Work performed when the alarm fires at `now`.
    fn on_fire(&self, now: Instant);
}

/// Self-rescheduling alarm.
///
/// The first delay is computed at `start()`; after each firing the schedule is
/// asked again with the firing instant.
pub struct IrregularRecurringAlarm {
    name: String,
    wake: WakePolicy,
    schedule: Arc<dyn IrregularSchedule>,
    cancel: Option<CancellationToken>,
}

impl IrregularRecurringAlarm {
    pub fn new(
        name: impl Into<String>,
        wake: WakePolicy,
        schedule: Arc<dyn IrregularSchedule>,
    ) -> Self {
        Self {
            name: name.into(),
            wake,
            schedule,
            cancel: None,
        }
    }

    pub fn wake(&self) -> WakePolicy {
        self.wake
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn start(&mut self) {
        if self.cancel.is_some() {
            return;
        }

        let token = CancellationToken::new();
        let cancel = token.clone();
        let schedule = self.schedule.clone();
        let name = self.name.clone();

        log::debug!("[ALARM] Starting irregular '{}' (wake: {})", name, self.wake.wakes());

        tokio::spawn(async move {
            let mut delay = schedule.next_delay(Instant::now()).max(MIN_DELAY);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                let fired_at = Instant::now();
                schedule.on_fire(fired_at);
                delay = schedule.next_delay(fired_at).max(MIN_DELAY);
                log::debug!("[ALARM] '{}' next firing in {}ms", name, delay.as_millis());
            }
            log::debug!("[ALARM] '{}' stopped", name);
        });

        self.cancel = Some(token);
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

impl Drop for IrregularRecurringAlarm {
    fn drop(&mut self) {
        self.stop();
    }
}
