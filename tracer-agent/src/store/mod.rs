//! Sample storage between the listener boundary and the reporting pipeline.

mod bounded;

pub use bounded::BoundedBuffer;

/// Backing store for samples awaiting delivery.
///
/// Implementations are shared between the listener callback (appends) and the
/// reporting tick (snapshot + removal), so every method must be safe to call
/// concurrently with the others.
pub trait SampleStore<S>: Send + Sync {
    /// Insert a sample at the tail, evicting from the head if over capacity.
    fn append(&self, sample: S);

    /// Number of samples currently held.
    fn size(&self) -> usize;

    /// Independent copy of the held samples in insertion order.
    fn snapshot(&self) -> Vec<S>;

    /// Remove every held sample equal to any sample in `samples`.
    fn remove_all(&self, samples: &[S]);
}
