//! Identifier aliases and heap-ordering adapters shared by the beam searches.
//!
//! Distance values are only [`PartialOrd`]; the adapters collapse incomparable
//! pairs to `Equal` and break ties on node id so heap behaviour stays
//! deterministic.

use std::cmp::Ordering;

/// Dense 0-based internal node index, equal to the object's position in the
/// input data sequence.
pub type NodeId = usize;

/// Externally supplied, globally unique object identifier.
pub type ObjectId = i32;

/// A node paired with its distance from the current query, ordered so that a
/// `BinaryHeap` keeps the farthest element on top.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Scored<D> {
    pub(crate) dist: D,
    pub(crate) node: NodeId,
}

impl<D: PartialOrd> PartialEq for Scored<D> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
            && self
                .dist
                .partial_cmp(&other.dist)
                .is_some_and(|ord| ord == Ordering::Equal)
    }
}

impl<D: PartialOrd> Eq for Scored<D> {}

impl<D: PartialOrd> Ord for Scored<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl<D: PartialOrd> PartialOrd for Scored<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reversed wrapper turning a `BinaryHeap` of [`Scored`] into a min-heap, used
/// for the expansion frontier.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ReverseScored<D>(pub(crate) Scored<D>);

impl<D: PartialOrd> PartialEq for ReverseScored<D> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<D: PartialOrd> Eq for ReverseScored<D> {}

impl<D: PartialOrd> Ord for ReverseScored<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}

impl<D: PartialOrd> PartialOrd for ReverseScored<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bare distance with max-heap ordering, used for the pruning threshold queue.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MaxDist<D>(pub(crate) D);

impl<D: PartialOrd> PartialEq for MaxDist<D> {
    fn eq(&self, other: &Self) -> bool {
        self.0
            .partial_cmp(&other.0)
            .is_some_and(|ord| ord == Ordering::Equal)
    }
}

impl<D: PartialOrd> Eq for MaxDist<D> {}

impl<D: PartialOrd> Ord for MaxDist<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

impl<D: PartialOrd> PartialOrd for MaxDist<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
