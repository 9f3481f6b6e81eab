//! Session controller.
//!
//! Two independent lifecycles:
//! - sampling: `Idle` -> `Active` | `Passive` -> `Idle`
//! - reporting: off -> on -> off
//!
//! Starting a passive session with an active-request interval, or starting
//! reporting, spawns an alarm task and so needs a running tokio runtime; both
//! return `TracerError::InvalidState` without touching the sampling boundary
//! when called outside one. Zero intervals are rejected with
//! `TracerError::InvalidArgument`.
//!
//! Sampling transitions hold the listening lock for their full duration,
//! including the subscribe/unsubscribe call, so a caller and an alarm callback
//! cannot interleave into a half-built session. Reporting has its own lock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::adaptive::ActiveRequestSchedule;
use crate::alarm::{IrregularRecurringAlarm, RecurringAlarm, WakePolicy};
use crate::clock::{LastObservationClock, saturating_millis};
use crate::error::TracerError;
use crate::events::{EventHub, SamplingMode, TracerEvent, TracerEventListener};
use crate::reporting::{FlushOutcome, ReportingPipeline, SampleSink};
use crate::sampling::{
    CachingListener, FixedProvider, ObservationPoint, Passthrough, ProviderId, ProviderStrategy,
    SampleListener, SamplingBoundary, Transform,
};
use crate::store::SampleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingState {
    Idle,
    Active,
    Passive,
}

#[derive(Debug, Clone, Serialize)]
pub struct TracerStatus {
    pub sampling: SamplingState,
    pub reporting: bool,
    pub buffered: usize,
    pub since_last_observation_ms: Option<u64>,
}

struct ListeningSession {
    mode: SamplingMode,
    /// Only passive sessions started with an active-request interval own one
    active_request_alarm: Option<IrregularRecurringAlarm>,
}

struct ReportingSession {
    alarm: RecurringAlarm,
}

pub struct TracerBuilder<R, S> {
    sampler: Arc<dyn SamplingBoundary<R>>,
    store: Arc<dyn SampleStore<S>>,
    transform: Arc<dyn Transform<R, S>>,
    sink: Arc<dyn SampleSink<S>>,
    active_provider: Arc<dyn ProviderStrategy>,
    request_provider: Arc<dyn ProviderStrategy>,
    observation_point: ObservationPoint,
}

impl<R, S> TracerBuilder<R, S>
where
    R: Send + 'static,
    S: Clone + PartialEq + Send + Sync + 'static,
{
    /// Provider strategy for active sampling sessions. Defaults to gps.
    pub fn active_provider(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
        self.active_provider = strategy;
        self
    }

    /// Provider strategy for one-shot requests in passive sessions. Defaults to network.
    pub fn request_provider(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
        self.request_provider = strategy;
        self
    }

    pub fn observation_point(mut self, point: ObservationPoint) -> Self {
        self.observation_point = point;
        self
    }

    pub fn build(self) -> Tracer<R, S> {
        let events = Arc::new(EventHub::new());
        let clock = Arc::new(LastObservationClock::new());
        let listener: Arc<dyn SampleListener<R>> = Arc::new(CachingListener::new(
            self.transform,
            self.store.clone(),
            clock.clone(),
            self.observation_point,
        ));
        let pipeline = Arc::new(ReportingPipeline::new(
            self.store.clone(),
            self.sink,
            events.clone(),
        ));

        Tracer {
            sampler: self.sampler,
            store: self.store,
            listener,
            clock,
            pipeline,
            active_provider: self.active_provider,
            request_provider: self.request_provider,
            events,
            listening: Mutex::new(None),
            reporting: Mutex::new(None),
        }
    }
}

/// Samples positions into a store and periodically reports them.
pub struct Tracer<R, S> {
    sampler: Arc<dyn SamplingBoundary<R>>,
    store: Arc<dyn SampleStore<S>>,
    listener: Arc<dyn SampleListener<R>>,
    clock: Arc<LastObservationClock>,
    pipeline: Arc<ReportingPipeline<S>>,
    active_provider: Arc<dyn ProviderStrategy>,
    request_provider: Arc<dyn ProviderStrategy>,
    events: Arc<EventHub>,
    listening: Mutex<Option<ListeningSession>>,
    reporting: Mutex<Option<ReportingSession>>,
}

impl<S> Tracer<S, S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
{
    /// Builder that stores raw samples unchanged.
    pub fn passthrough(
        sampler: Arc<dyn SamplingBoundary<S>>,
        store: Arc<dyn SampleStore<S>>,
        sink: Arc<dyn SampleSink<S>>,
    ) -> TracerBuilder<S, S> {
        Self::builder(sampler, store, Arc::new(Passthrough), sink)
    }
}

impl<R, S> Tracer<R, S>
where
    R: Send + 'static,
    S: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn builder(
        sampler: Arc<dyn SamplingBoundary<R>>,
        store: Arc<dyn SampleStore<S>>,
        transform: Arc<dyn Transform<R, S>>,
        sink: Arc<dyn SampleSink<S>>,
    ) -> TracerBuilder<R, S> {
        TracerBuilder {
            sampler,
            store,
            transform,
            sink,
            active_provider: Arc::new(FixedProvider(ProviderId::gps())),
            request_provider: Arc::new(FixedProvider(ProviderId::network())),
            observation_point: ObservationPoint::default(),
        }
    }

    // =====================================================
    // Sampling lifecycle
    // =====================================================

    /// Subscribe to the active provider at a fixed interval.
    pub fn start_listening_actively(&self, interval: Duration) -> Result<(), TracerError> {
        {
            let mut listening = self.listening.lock();
            verify_listening_not_in_progress(&listening)?;

            let provider = self.active_provider.select(&self.sampler.available_providers());
            self.sampler
                .subscribe(&provider, interval, self.listener.clone())
                .map_err(TracerError::Sampling)?;

            *listening = Some(ListeningSession {
                mode: SamplingMode::Active,
                active_request_alarm: None,
            });
            log::info!(
                "[TRACER] Listening actively via '{}' every {}ms",
                provider,
                interval.as_millis()
            );
        }

        self.events.emit(&TracerEvent::ListeningStarted {
            mode: SamplingMode::Active,
            active_request_interval_ms: None,
        });
        Ok(())
    }

    /// Subscribe to the passive provider. With `active_request_interval`, a
    /// one-shot request is issued whenever the newest sample is that old.
    pub fn start_listening_passively(
        &self,
        active_request_interval: Option<Duration>,
        wake: bool,
    ) -> Result<(), TracerError> {
        {
            let mut listening = self.listening.lock();
            verify_listening_not_in_progress(&listening)?;
            if let Some(interval) = active_request_interval {
                verify_nonzero_interval("active request", interval)?;
                verify_runtime("active requests")?;
            }

            self.sampler
                .subscribe(&ProviderId::passive(), Duration::ZERO, self.listener.clone())
                .map_err(TracerError::Sampling)?;

            let active_request_alarm = active_request_interval.map(|interval| {
                let schedule = ActiveRequestSchedule::new(
                    interval,
                    self.clock.clone(),
                    self.sampler.clone(),
                    self.request_provider.clone(),
                    self.events.clone(),
                );
                let mut alarm = IrregularRecurringAlarm::new(
                    "active-request",
                    WakePolicy::from_flag(wake),
                    Arc::new(schedule),
                );
                alarm.start();
                alarm
            });

            *listening = Some(ListeningSession {
                mode: SamplingMode::Passive,
                active_request_alarm,
            });
            match active_request_interval {
                Some(interval) => log::info!(
                    "[TRACER] Listening passively, active request after {}ms without a sample",
                    interval.as_millis()
                ),
                None => log::info!("[TRACER] Listening passively"),
            }
        }

        self.events.emit(&TracerEvent::ListeningStarted {
            mode: SamplingMode::Passive,
            active_request_interval_ms: active_request_interval.map(saturating_millis),
        });
        Ok(())
    }

    /// Unsubscribe and stop the session's active-request alarm, if any.
    pub fn stop_listening(&self) -> Result<(), TracerError> {
        {
            let mut listening = self.listening.lock();
            if listening.is_none() {
                return Err(TracerError::InvalidState(
                    "Cannot stop listening when listening is not in progress.".to_string(),
                ));
            }

            self.sampler
                .unsubscribe(&self.listener)
                .map_err(TracerError::Sampling)?;

            if let Some(mut session) = listening.take() {
                if let Some(alarm) = session.active_request_alarm.as_mut() {
                    alarm.stop();
                }
            }
            log::info!("[TRACER] Listening stopped");
        }

        self.events.emit(&TracerEvent::ListeningStopped);
        Ok(())
    }

    pub fn sampling_state(&self) -> SamplingState {
        match self.listening.lock().as_ref().map(|s| s.mode) {
            None => SamplingState::Idle,
            Some(SamplingMode::Active) => SamplingState::Active,
            Some(SamplingMode::Passive) => SamplingState::Passive,
        }
    }

    // =====================================================
    // Reporting lifecycle
    // =====================================================

    /// Flush the store to the sink every `interval`.
    pub fn start_reporting(&self, interval: Duration, wake: bool) -> Result<(), TracerError> {
        let wake = WakePolicy::from_flag(wake);
        {
            let mut reporting = self.reporting.lock();
            if reporting.is_some() {
                return Err(TracerError::InvalidState(
                    "Cannot start reporting when reporting is already in progress.".to_string(),
                ));
            }
            verify_nonzero_interval("reporting", interval)?;
            verify_runtime("reporting")?;

            let mut alarm = RecurringAlarm::new("reporting", interval, wake, self.pipeline.clone());
            alarm.start();
            *reporting = Some(ReportingSession { alarm });
            log::info!("[TRACER] Reporting every {}ms", interval.as_millis());
        }

        self.events.emit(&TracerEvent::ReportingStarted {
            interval_ms: saturating_millis(interval),
            wake,
        });
        Ok(())
    }

    /// Stop the reporting alarm, then optionally flush once more.
    ///
    /// Returns the final flush outcome when `flush_remaining` is set and the
    /// store was not empty.
    pub async fn stop_reporting(
        &self,
        flush_remaining: bool,
    ) -> Result<Option<FlushOutcome>, TracerError> {
        {
            let mut reporting = self.reporting.lock();
            let Some(mut session) = reporting.take() else {
                return Err(TracerError::InvalidState(
                    "Cannot stop reporting when reporting is not in progress.".to_string(),
                ));
            };
            session.alarm.stop();
            log::info!("[TRACER] Reporting stopped");
        }

        let outcome = if flush_remaining {
            self.pipeline.flush().await
        } else {
            None
        };

        self.events.emit(&TracerEvent::ReportingStopped {
            flushed_remaining: flush_remaining,
        });
        Ok(outcome)
    }

    pub fn is_reporting(&self) -> bool {
        self.reporting.lock().is_some()
    }

    /// Flush immediately, independent of the reporting session.
    pub async fn flush(&self) -> Option<FlushOutcome> {
        self.pipeline.flush().await
    }

    // =====================================================
    // Events & status
    // =====================================================

    pub fn add_event_listener(&self, listener: Arc<dyn TracerEventListener>) -> String {
        self.events.add_listener(listener)
    }

    pub fn remove_event_listener(&self, id: &str) -> bool {
        self.events.remove_listener(id)
    }

    /// The listener boundary handed to the sampling boundary on subscribe.
    pub fn listener(&self) -> Arc<dyn SampleListener<R>> {
        self.listener.clone()
    }

    pub fn buffered(&self) -> usize {
        self.store.size()
    }

    pub fn status(&self) -> TracerStatus {
        TracerStatus {
            sampling: self.sampling_state(),
            reporting: self.is_reporting(),
            buffered: self.buffered(),
            since_last_observation_ms: self
                .clock
                .elapsed_at(Instant::now())
                .map(saturating_millis),
        }
    }
}

fn verify_listening_not_in_progress(listening: &Option<ListeningSession>) -> Result<(), TracerError> {
    if listening.is_some() {
        return Err(TracerError::InvalidState(
            "Cannot start listening when listening is already in progress.".to_string(),
        ));
    }
    Ok(())
}

fn verify_nonzero_interval(what: &str, interval: Duration) -> Result<(), TracerError> {
    if interval.is_zero() {
        return Err(TracerError::InvalidArgument(format!(
            "The {} interval must be greater than zero.",
            what
        )));
    }
    Ok(())
}

/// Alarms are spawned onto the current tokio runtime.
fn verify_runtime(what: &str) -> Result<(), TracerError> {
    if tokio::runtime::Handle::try_current().is_err() {
        return Err(TracerError::InvalidState(format!(
            "Cannot schedule {} outside a tokio runtime.",
            what
        )));
    }
    Ok(())
}
