use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::WakePolicy;

/// Callback invoked on every firing of a `RecurringAlarm`.
#[async_trait]
pub trait AlarmHandler: Send + Sync {
    async fn handle_alarm(&self, fired_at: Instant);
}

/// Fixed-interval alarm. The first firing happens one `interval` after `start()`.
///
/// A slow handler delays the following firing instead of bunching missed ones.
pub struct RecurringAlarm {
    name: String,
    interval: Duration,
    wake: WakePolicy,
    handler: Arc<dyn AlarmHandler>,
    cancel: Option<CancellationToken>,
}

impl RecurringAlarm {
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        wake: WakePolicy,
        handler: Arc<dyn AlarmHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            interval,
            wake,
            handler,
            cancel: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn wake(&self) -> WakePolicy {
        self.wake
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }

    /// Spawn the firing loop. No-op if already running.
    pub fn start(&mut self) {
        if self.cancel.is_some() {
            return;
        }

        let token = CancellationToken::new();
        let cancel = token.clone();
        let handler = self.handler.clone();
        let name = self.name.clone();
        // tokio::time::interval panics on a zero period
        let period = self.interval.max(Duration::from_millis(1));

        log::debug!(
            "[ALARM] Starting '{}' (interval: {}ms, wake: {})",
            name,
            period.as_millis(),
            self.wake.wakes()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // skip first immediate tick

            loop {
                let fired_at = tokio::select! {
                    _ = cancel.cancelled() => break,
                    fired_at = ticker.tick() => fired_at,
                };
                handler.handle_alarm(fired_at).await;
            }
            log::debug!("[ALARM] '{}' stopped", name);
        });

        self.cancel = Some(token);
    }

    /// Cancel future firings. No-op if not running.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

impl Drop for RecurringAlarm {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandler {
        fired: AtomicUsize,
    }

    #[async_trait]
    impl AlarmHandler for CountingHandler {
        async fn handle_alarm(&self, _fired_at: Instant) {
            self.fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_every_interval() {
        let handler = Arc::new(CountingHandler::default());
        let mut alarm = RecurringAlarm::new(
            "test",
            Duration::from_secs(10),
            WakePolicy::NoWake,
            handler.clone(),
        );

        assert_eq!(alarm.interval(), Duration::from_secs(10));
        alarm.start();
        assert!(alarm.is_running());
        tokio::time::sleep(Duration::from_secs(35)).await;

        assert_eq!(handler.fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_firings() {
        let handler = Arc::new(CountingHandler::default());
        let mut alarm = RecurringAlarm::new(
            "test",
            Duration::from_secs(10),
            WakePolicy::Wake,
            handler.clone(),
        );

        alarm.start();
        tokio::time::sleep(Duration::from_secs(15)).await;
        alarm.stop();
        assert!(!alarm.is_running());
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(handler.fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_alarm() {
        let handler = Arc::new(CountingHandler::default());
        {
            let mut alarm = RecurringAlarm::new(
                "test",
                Duration::from_secs(5),
                WakePolicy::NoWake,
                handler.clone(),
            );
            alarm.start();
        }
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(handler.fired.load(Ordering::SeqCst), 0);
    }
}
