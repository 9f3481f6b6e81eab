//! Snapshot, report, evict.
//!
//! Each flush hands the whole buffer to the sink and evicts only what the sink
//! confirms. Anything unconfirmed stays buffered and is offered again on the
//! next tick, until it is delivered or pushed out by the buffer's capacity.

mod http;

pub use http::HttpSink;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;

use crate::alarm::AlarmHandler;
use crate::events::{EventHub, TracerEvent};
use crate::store::SampleStore;

/// Remote destination for buffered samples.
///
/// Returns the subset of `batch` that was delivered. Partial failure is a
/// strict subset, total failure an empty vec; implementations do not error.
#[async_trait]
pub trait SampleSink<S>: Send + Sync {
    async fn report(&self, batch: Vec<S>) -> Vec<S>;
}

/// Result of one flush that reached the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlushOutcome {
    pub reported: usize,
    pub confirmed: usize,
    pub remaining: usize,
}

pub struct ReportingPipeline<S> {
    store: Arc<dyn SampleStore<S>>,
    sink: Arc<dyn SampleSink<S>>,
    events: Arc<EventHub>,
    /// Serializes flushes so a tick and a final flush never report the same snapshot concurrently
    lane: tokio::sync::Mutex<()>,
}

impl<S> ReportingPipeline<S>
where
    S: Clone + Send + 'static,
{
    pub fn new(
        store: Arc<dyn SampleStore<S>>,
        sink: Arc<dyn SampleSink<S>>,
        events: Arc<EventHub>,
    ) -> Self {
        Self {
            store,
            sink,
            events,
            lane: tokio::sync::Mutex::new(()),
        }
    }

    /// Report the buffered samples. Returns `None` when the buffer was empty
    /// and the sink was not called.
    pub async fn flush(&self) -> Option<FlushOutcome> {
        let _lane = self.lane.lock().await;

        if self.store.size() == 0 {
            log::debug!("[REPORTING] Nothing buffered, skipping flush");
            return None;
        }

        let batch = self.store.snapshot();
        let reported = batch.len();
        let confirmed = self.sink.report(batch).await;
        self.store.remove_all(&confirmed);

        let outcome = FlushOutcome {
            reported,
            confirmed: confirmed.len(),
            remaining: self.store.size(),
        };

        if outcome.confirmed < outcome.reported {
            log::warn!(
                "[REPORTING] Sink confirmed {}/{} samples, {} remain buffered",
                outcome.confirmed,
                outcome.reported,
                outcome.remaining
            );
        } else {
            log::info!(
                "[REPORTING] Flushed {} samples ({} remain buffered)",
                outcome.reported,
                outcome.remaining
            );
        }

        self.events.emit(&TracerEvent::Flushed {
            reported: outcome.reported,
            confirmed: outcome.confirmed,
            remaining: outcome.remaining,
        });
        Some(outcome)
    }
}

#[async_trait]
impl<S> AlarmHandler for ReportingPipeline<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn handle_alarm(&self, _fired_at: Instant) {
        self.flush().await;
    }
}
