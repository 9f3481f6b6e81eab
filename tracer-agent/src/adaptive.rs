//! Active-request schedule for passive sampling sessions.
//!
//! Passive sampling costs nothing but only yields samples when some other
//! consumer asks for them. This schedule watches the observation clock and,
//! once the newest sample is at least `interval` old (or none has arrived),
//! issues a single one-shot request. Otherwise it sleeps exactly until the
//! newest sample would go stale.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::alarm::IrregularSchedule;
use crate::clock::LastObservationClock;
use crate::events::{EventHub, TracerEvent};
use crate::sampling::{DiscardingListener, ProviderStrategy, SampleListener, SamplingBoundary};

pub struct ActiveRequestSchedule<R> {
    interval: Duration,
    clock: Arc<LastObservationClock>,
    sampler: Arc<dyn SamplingBoundary<R>>,
    provider: Arc<dyn ProviderStrategy>,
    /// Receives the requested fix; the passive subscription buffers it instead.
    discard: Arc<dyn SampleListener<R>>,
    events: Arc<EventHub>,
}

impl<R: 'static> ActiveRequestSchedule<R> {
    pub fn new(
        interval: Duration,
        clock: Arc<LastObservationClock>,
        sampler: Arc<dyn SamplingBoundary<R>>,
        provider: Arc<dyn ProviderStrategy>,
        events: Arc<EventHub>,
    ) -> Self {
        Self {
            interval,
            clock,
            sampler,
            provider,
            discard: Arc::new(DiscardingListener::<R>::default()),
            events,
        }
    }
}

impl<R> ActiveRequestSchedule<R> {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time since the newest observation, `None` if nothing was observed yet.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.clock.elapsed_at(now)
    }

    /// Whether a fresh sample must be requested at `now`.
    pub fn is_stale(&self, now: Instant) -> bool {
        match self.elapsed(now) {
            Some(elapsed) => elapsed >= self.interval,
            None => true,
        }
    }
}

impl<R> IrregularSchedule for ActiveRequestSchedule<R> {
    fn next_delay(&self, now: Instant) -> Duration {
        match self.elapsed(now) {
            Some(elapsed) if elapsed < self.interval => self.interval - elapsed,
            _ => self.interval,
        }
    }

    fn on_fire(&self, now: Instant) {
        if !self.is_stale(now) {
            log::debug!("[ACTIVE_REQUEST] Recent passive sample is fresh, skipping request");
            return;
        }

        let provider = self.provider.select(&self.sampler.available_providers());
        match self.sampler.request_once(&provider, self.discard.clone()) {
            Ok(()) => {
                log::debug!("[ACTIVE_REQUEST] Requested one sample from '{}'", provider);
                self.events.emit(&TracerEvent::ActiveRequestIssued {
                    provider: provider.to_string(),
                });
            }
            Err(e) => {
                log::warn!("[ACTIVE_REQUEST] Request to '{}' failed: {}", provider, e);
            }
        }
    }
}
