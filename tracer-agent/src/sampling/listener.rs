//! Listener boundary: stamps the observation clock, transforms, and stores.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::transform::Transform;
use super::SampleListener;
use crate::clock::LastObservationClock;
use crate::store::SampleStore;

/// Which event counts as an observation for staleness purposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationPoint {
    /// Only samples the transform accepted into the store
    #[default]
    Accepted,
    /// Every raw sample handed to the listener, accepted or not
    Offered,
}

impl std::str::FromStr for ObservationPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accepted" => Ok(ObservationPoint::Accepted),
            "offered" => Ok(ObservationPoint::Offered),
            other => Err(format!("unknown observation point '{}'", other)),
        }
    }
}

/// Feeds raw samples into a `SampleStore` after transforming them.
pub struct CachingListener<R, S> {
    transform: Arc<dyn Transform<R, S>>,
    store: Arc<dyn SampleStore<S>>,
    clock: Arc<LastObservationClock>,
    observation_point: ObservationPoint,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl<R, S> CachingListener<R, S> {
    pub fn new(
        transform: Arc<dyn Transform<R, S>>,
        store: Arc<dyn SampleStore<S>>,
        clock: Arc<LastObservationClock>,
        observation_point: ObservationPoint,
    ) -> Self {
        Self {
            transform,
            store,
            clock,
            observation_point,
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl<R, S> SampleListener<R> for CachingListener<R, S>
where
    R: Send,
    S: Send,
{
    fn on_sample(&self, raw: R) {
        if self.observation_point == ObservationPoint::Offered {
            self.clock.record_now();
        }

        match self.transform.transform(raw) {
            Some(sample) => {
                if self.observation_point == ObservationPoint::Accepted {
                    self.clock.record_now();
                }
                self.store.append(sample);
                self.accepted.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                log::debug!("[TRACER] Sample rejected by transform");
            }
        }
    }
}

/// Drops every sample it receives.
///
/// Used for one-shot active requests issued while a passive subscription is
/// live: the passive listener already receives the resulting fix, so handing
/// it to the caching listener a second time would buffer it twice.
pub struct DiscardingListener<R> {
    _raw: PhantomData<fn(R)>,
}

impl<R> Default for DiscardingListener<R> {
    fn default() -> Self {
        Self { _raw: PhantomData }
    }
}

impl<R> SampleListener<R> for DiscardingListener<R> {
    fn on_sample(&self, _raw: R) {}
}
