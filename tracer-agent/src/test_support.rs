//! Recording collaborators shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::reporting::SampleSink;
use crate::sampling::{ProviderId, SampleListener, SamplingBoundary};

/// Sampling boundary that records calls and delivers samples on demand.
pub struct RecordingSampler<R> {
    subscriptions: Mutex<Vec<(ProviderId, Duration, Arc<dyn SampleListener<R>>)>>,
    pending_requests: Mutex<Vec<Arc<dyn SampleListener<R>>>>,
    requests: Mutex<Vec<ProviderId>>,
    unsubscribes: Mutex<usize>,
    fail_subscribe: AtomicBool,
}

impl<R: Clone> RecordingSampler<R> {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
            pending_requests: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            unsubscribes: Mutex::new(0),
            fail_subscribe: AtomicBool::new(false),
        }
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// (provider, min interval) of every live subscription.
    pub fn subscriptions(&self) -> Vec<(ProviderId, Duration)> {
        self.subscriptions
            .lock()
            .iter()
            .map(|(p, i, _)| (p.clone(), *i))
            .collect()
    }

    pub fn unsubscribe_count(&self) -> usize {
        *self.unsubscribes.lock()
    }

    pub fn requests(&self) -> Vec<ProviderId> {
        self.requests.lock().clone()
    }

    /// Deliver `raw` to every subscribed listener.
    pub fn emit(&self, raw: R) {
        let listeners: Vec<_> = self.subscriptions.lock().iter().map(|(_, _, l)| l.clone()).collect();
        for listener in listeners {
            listener.on_sample(raw.clone());
        }
    }

    /// Deliver `raw` to every listener waiting on a one-shot request.
    pub fn answer_requests(&self, raw: R) {
        let pending: Vec<_> = self.pending_requests.lock().drain(..).collect();
        for listener in pending {
            listener.on_sample(raw.clone());
        }
    }
}

impl<R: Send> SamplingBoundary<R> for RecordingSampler<R> {
    fn available_providers(&self) -> Vec<ProviderId> {
        vec![ProviderId::gps(), ProviderId::network(), ProviderId::passive()]
    }

    fn subscribe(
        &self,
        provider: &ProviderId,
        min_interval: Duration,
        listener: Arc<dyn SampleListener<R>>,
    ) -> Result<(), String> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(format!("provider '{}' disabled", provider));
        }
        self.subscriptions
            .lock()
            .push((provider.clone(), min_interval, listener));
        Ok(())
    }

    fn unsubscribe(&self, listener: &Arc<dyn SampleListener<R>>) -> Result<(), String> {
        self.subscriptions
            .lock()
            .retain(|(_, _, l)| !Arc::ptr_eq(l, listener));
        *self.unsubscribes.lock() += 1;
        Ok(())
    }

    fn request_once(
        &self,
        provider: &ProviderId,
        listener: Arc<dyn SampleListener<R>>,
    ) -> Result<(), String> {
        self.requests.lock().push(provider.clone());
        self.pending_requests.lock().push(listener);
        Ok(())
    }
}

type Confirm<S> = Box<dyn Fn(&S) -> bool + Send + Sync>;

/// Sink that confirms samples matching a predicate and records every batch.
pub struct ScriptedSink<S> {
    confirm: Confirm<S>,
    batches: Mutex<Vec<Vec<S>>>,
}

impl<S: Clone + Send + Sync + 'static> ScriptedSink<S> {
    pub fn confirming(confirm: impl Fn(&S) -> bool + Send + Sync + 'static) -> Self {
        Self {
            confirm: Box::new(confirm),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn confirm_all() -> Self {
        Self::confirming(|_| true)
    }

    pub fn confirm_none() -> Self {
        Self::confirming(|_| false)
    }

    pub fn batches(&self) -> Vec<Vec<S>> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl<S: Clone + Send + Sync + 'static> SampleSink<S> for ScriptedSink<S> {
    async fn report(&self, batch: Vec<S>) -> Vec<S> {
        self.batches.lock().push(batch.clone());
        batch.into_iter().filter(|s| (self.confirm)(s)).collect()
    }
}
