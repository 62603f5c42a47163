//! Progress reporting seam for long-running builds.
//!
//! The builder emits monotonically increasing completion counts; concurrent
//! workers batch their updates so a shared display lock is touched at most
//! once every [`PROGRESS_BATCH`] insertions.

/// Receives completion counts while an index is being built.
///
/// Implementations own their synchronisation (typically a display lock); the
/// builder only guarantees that the sum of all `add` deltas equals the number
/// of inserted objects and that every delta is positive.
pub trait ProgressSink: Sync {
    /// Reports that `completed` additional objects were inserted.
    fn add(&self, completed: usize);
}

/// Sink that discards all updates.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn add(&self, _completed: usize) {}
}

/// Concurrent workers flush their pending counts at this granularity.
pub(crate) const PROGRESS_BATCH: usize = 200;
