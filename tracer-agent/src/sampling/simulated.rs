//! Random-walk sampling source for running the agent without platform hardware.
//!
//! Each non-passive subscription gets its own producer task emitting a fix every
//! `min_interval`. Every fix produced, by a subscription or a one-shot request,
//! is also fanned out to the passive subscribers, the same way a platform
//! passive provider piggybacks on other consumers' requests.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use position_types::PositionFix;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::{ProviderId, SampleListener, SamplingBoundary};

/// Producer intervals are floored at this value.
const MIN_PRODUCER_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum per-step movement in degrees.
const WALK_STEP_DEG: f64 = 0.0005;

#[derive(Debug, Clone)]
pub struct SimulatedSamplerConfig {
    pub start_latitude: f64,
    pub start_longitude: f64,
    /// Delay before a one-shot request produces its fix
    pub acquisition_delay: Duration,
    pub providers: Vec<ProviderId>,
}

impl Default for SimulatedSamplerConfig {
    fn default() -> Self {
        Self {
            start_latitude: 47.3769,
            start_longitude: 8.5417,
            acquisition_delay: Duration::from_millis(500),
            providers: vec![ProviderId::gps(), ProviderId::network(), ProviderId::passive()],
        }
    }
}

struct Subscription {
    listener: Arc<dyn SampleListener<PositionFix>>,
    provider: ProviderId,
    /// `None` for passive subscriptions, which have no producer task
    producer: Option<CancellationToken>,
}

struct WalkState {
    latitude: f64,
    longitude: f64,
    subscriptions: Vec<Subscription>,
}

struct Inner {
    config: SimulatedSamplerConfig,
    state: Mutex<WalkState>,
}

impl Inner {
    /// Advance the walk and produce a fix attributed to `provider`.
    fn next_fix(&self, provider: &ProviderId) -> PositionFix {
        let mut rng = rand::thread_rng();
        let mut state = self.state.lock();
        state.latitude += rng.gen_range(-WALK_STEP_DEG..WALK_STEP_DEG);
        state.longitude += rng.gen_range(-WALK_STEP_DEG..WALK_STEP_DEG);

        let accuracy_m = if provider.as_str() == ProviderId::GPS {
            rng.gen_range(3.0..12.0)
        } else {
            rng.gen_range(30.0..150.0)
        };

        PositionFix {
            latitude: state.latitude,
            longitude: state.longitude,
            accuracy_m: Some(accuracy_m),
            provider: provider.to_string(),
            captured_at: Utc::now().to_rfc3339(),
        }
    }

    fn passive_listeners(&self) -> Vec<Arc<dyn SampleListener<PositionFix>>> {
        self.state
            .lock()
            .subscriptions
            .iter()
            .filter(|s| s.provider.is_passive())
            .map(|s| s.listener.clone())
            .collect()
    }

    /// Deliver to the requesting listener, then to every passive subscriber.
    fn deliver(&self, fix: PositionFix, target: &Arc<dyn SampleListener<PositionFix>>) {
        let passive = self.passive_listeners();
        for listener in passive.iter().filter(|l| !Arc::ptr_eq(*l, target)) {
            listener.on_sample(fix.clone());
        }
        target.on_sample(fix);
    }
}

/// Simulated implementation of the sampling boundary.
#[derive(Clone)]
pub struct SimulatedSampler {
    inner: Arc<Inner>,
}

impl SimulatedSampler {
    pub fn new(config: SimulatedSamplerConfig) -> Self {
        let state = WalkState {
            latitude: config.start_latitude,
            longitude: config.start_longitude,
            subscriptions: Vec::new(),
        };
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.state.lock().subscriptions.len()
    }

    fn ensure_available(&self, provider: &ProviderId) -> Result<(), String> {
        if self.inner.config.providers.contains(provider) {
            Ok(())
        } else {
            Err(format!("Provider '{}' is not available", provider))
        }
    }

    fn spawn_producer(
        &self,
        provider: ProviderId,
        interval: Duration,
        listener: Arc<dyn SampleListener<PositionFix>>,
    ) -> CancellationToken {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let inner = self.inner.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // skip first immediate tick

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let fix = inner.next_fix(&provider);
                inner.deliver(fix, &listener);
            }
            log::debug!("[SAMPLER] Producer for '{}' stopped", provider);
        });

        token
    }
}

impl SamplingBoundary<PositionFix> for SimulatedSampler {
    fn available_providers(&self) -> Vec<ProviderId> {
        self.inner.config.providers.clone()
    }

    fn subscribe(
        &self,
        provider: &ProviderId,
        min_interval: Duration,
        listener: Arc<dyn SampleListener<PositionFix>>,
    ) -> Result<(), String> {
        self.ensure_available(provider)?;

        let producer = if provider.is_passive() {
            None
        } else {
            let interval = min_interval.max(MIN_PRODUCER_INTERVAL);
            Some(self.spawn_producer(provider.clone(), interval, listener.clone()))
        };

        log::info!(
            "[SAMPLER] Subscribed to '{}' (min interval: {}ms)",
            provider,
            min_interval.as_millis()
        );

        self.inner.state.lock().subscriptions.push(Subscription {
            listener,
            provider: provider.clone(),
            producer,
        });
        Ok(())
    }

    fn unsubscribe(&self, listener: &Arc<dyn SampleListener<PositionFix>>) -> Result<(), String> {
        let mut state = self.inner.state.lock();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|s| {
            if Arc::ptr_eq(&s.listener, listener) {
                if let Some(token) = &s.producer {
                    token.cancel();
                }
                false
            } else {
                true
            }
        });
        log::info!(
            "[SAMPLER] Removed {} subscription(s)",
            before - state.subscriptions.len()
        );
        Ok(())
    }

    fn request_once(
        &self,
        provider: &ProviderId,
        listener: Arc<dyn SampleListener<PositionFix>>,
    ) -> Result<(), String> {
        self.ensure_available(provider)?;

        let inner = self.inner.clone();
        let provider = provider.clone();
        let delay = inner.config.acquisition_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let fix = inner.next_fix(&provider);
            log::debug!("[SAMPLER] One-shot fix from '{}'", provider);
            inner.deliver(fix, &listener);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect {
        fixes: Mutex<Vec<PositionFix>>,
    }

    impl SampleListener<PositionFix> for Collect {
        fn on_sample(&self, raw: PositionFix) {
            self.fixes.lock().push(raw);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_subscription_fans_out_to_passive() {
        let sampler = SimulatedSampler::new(SimulatedSamplerConfig::default());
        let active = Arc::new(Collect::default());
        let passive = Arc::new(Collect::default());

        sampler
            .subscribe(&ProviderId::passive(), Duration::ZERO, passive.clone())
            .unwrap();
        sampler
            .subscribe(&ProviderId::gps(), Duration::from_secs(10), active.clone())
            .unwrap();

        tokio::time::sleep(Duration::from_secs(35)).await;

        assert_eq!(active.fixes.lock().len(), 3);
        assert_eq!(passive.fixes.lock().len(), 3);
        assert!(active.fixes.lock().iter().all(|f| f.provider == "gps"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_stops_producer() {
        let sampler = SimulatedSampler::new(SimulatedSamplerConfig::default());
        let active = Arc::new(Collect::default());
        let handle: Arc<dyn SampleListener<PositionFix>> = active.clone();

        sampler
            .subscribe(&ProviderId::network(), Duration::from_secs(5), handle.clone())
            .unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;
        sampler.unsubscribe(&handle).unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(active.fixes.lock().len(), 2);
        assert_eq!(sampler.subscription_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_once_reaches_target_and_passive() {
        let sampler = SimulatedSampler::new(SimulatedSamplerConfig::default());
        let passive = Arc::new(Collect::default());
        let target = Arc::new(Collect::default());

        sampler
            .subscribe(&ProviderId::passive(), Duration::ZERO, passive.clone())
            .unwrap();
        sampler.request_once(&ProviderId::network(), target.clone()).unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(target.fixes.lock().len(), 1);
        assert_eq!(passive.fixes.lock().len(), 1);
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let sampler = SimulatedSampler::new(SimulatedSamplerConfig {
            providers: vec![ProviderId::passive()],
            ..Default::default()
        });
        let listener = Arc::new(Collect::default());
        let err = sampler
            .subscribe(&ProviderId::gps(), Duration::from_secs(1), listener)
            .unwrap_err();
        assert!(err.contains("gps"));
    }
}
