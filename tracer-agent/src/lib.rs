//! Position tracer agent.
//!
//! Samples a position signal (actively at a fixed interval, or passively with
//! an adaptive one-shot request when passive samples go stale), buffers
//! samples in a bounded store, and periodically reports the buffer to a sink,
//! evicting only what the sink confirms.

pub mod adaptive;
pub mod alarm;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod reporting;
pub mod sampling;
pub mod store;
pub mod tracer;

#[cfg(test)]
mod test_support;

pub use config::TracerConfig;
pub use error::TracerError;
pub use events::{EventHub, SamplingMode, TracerEvent, TracerEventListener};
pub use reporting::{FlushOutcome, HttpSink, ReportingPipeline, SampleSink};
pub use sampling::{ObservationPoint, ProviderId, SampleListener, SamplingBoundary, Transform};
pub use store::{BoundedBuffer, SampleStore};
pub use tracer::{SamplingState, Tracer, TracerBuilder, TracerStatus};
