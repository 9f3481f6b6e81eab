/// Maps a raw sample into its stored representation.
///
/// Returning `None` rejects the sample; it is not appended to the store.
pub trait Transform<R, S>: Send + Sync {
    fn transform(&self, raw: R) -> Option<S>;
}

/// Stores raw samples unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl<R> Transform<R, R> for Passthrough {
    fn transform(&self, raw: R) -> Option<R> {
        Some(raw)
    }
}
