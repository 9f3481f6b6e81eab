//! Boundary to the platform's position-sampling primitive.
//!
//! The tracer never acquires samples itself. It subscribes listeners to a
//! `SamplingBoundary`, picks provider ids through a `ProviderStrategy`, and
//! lets the listener boundary (`CachingListener`) feed the store.

mod listener;
mod simulated;
mod transform;

pub use listener::{CachingListener, DiscardingListener, ObservationPoint};
pub use simulated::{SimulatedSampler, SimulatedSamplerConfig};
pub use transform::{Passthrough, Transform};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Identifies one physical sampling source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl ProviderId {
    pub const GPS: &'static str = "gps";
    pub const NETWORK: &'static str = "network";
    pub const PASSIVE: &'static str = "passive";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Satellite fixes: most accurate, most power.
    pub fn gps() -> Self {
        Self::new(Self::GPS)
    }

    /// Cell/wifi fixes: coarse, cheap.
    pub fn network() -> Self {
        Self::new(Self::NETWORK)
    }

    /// Receives fixes other consumers already requested.
    pub fn passive() -> Self {
        Self::new(Self::PASSIVE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_passive(&self) -> bool {
        self.0 == Self::PASSIVE
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receives raw samples from the sampling boundary.
pub trait SampleListener<R>: Send + Sync {
    fn on_sample(&self, raw: R);
}

/// The platform sampling primitive.
///
/// Listeners are identified by `Arc` pointer identity, so `unsubscribe` must be
/// called with the same `Arc` that was passed to `subscribe`.
pub trait SamplingBoundary<R>: Send + Sync {
    /// Providers currently able to produce samples.
    fn available_providers(&self) -> Vec<ProviderId>;

    /// Deliver samples from `provider` to `listener`, no more often than `min_interval`.
    fn subscribe(
        &self,
        provider: &ProviderId,
        min_interval: Duration,
        listener: Arc<dyn SampleListener<R>>,
    ) -> Result<(), String>;

    /// Stop every subscription held by `listener`.
    fn unsubscribe(&self, listener: &Arc<dyn SampleListener<R>>) -> Result<(), String>;

    /// Acquire exactly one sample from `provider` and hand it to `listener`.
    fn request_once(
        &self,
        provider: &ProviderId,
        listener: Arc<dyn SampleListener<R>>,
    ) -> Result<(), String>;
}

/// Picks which provider a subscription or request should use.
pub trait ProviderStrategy: Send + Sync {
    fn select(&self, available: &[ProviderId]) -> ProviderId;
}

/// Always selects the same provider, available or not.
#[derive(Debug, Clone)]
pub struct FixedProvider(pub ProviderId);

impl ProviderStrategy for FixedProvider {
    fn select(&self, _available: &[ProviderId]) -> ProviderId {
        self.0.clone()
    }
}

/// Selects the first available provider from a preference list, falling back
/// to `fallback` when none of them is available.
#[derive(Debug, Clone)]
pub struct PreferredProvider {
    pub preference: Vec<ProviderId>,
    pub fallback: ProviderId,
}

impl PreferredProvider {
    /// Accuracy first: gps, then network.
    pub fn most_accurate() -> Self {
        Self {
            preference: vec![ProviderId::gps(), ProviderId::network()],
            fallback: ProviderId::gps(),
        }
    }

    /// Power first: network, then gps.
    pub fn lowest_power() -> Self {
        Self {
            preference: vec![ProviderId::network(), ProviderId::gps()],
            fallback: ProviderId::network(),
        }
    }
}

impl ProviderStrategy for PreferredProvider {
    fn select(&self, available: &[ProviderId]) -> ProviderId {
        self.preference
            .iter()
            .find(|p| available.contains(p))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
