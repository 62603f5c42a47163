//! Query-time beam searches and the result sink they feed.
//!
//! Two variants share the entry point and visited bitset but differ in how
//! they track the frontier: the classic beam keeps two heaps and offers every
//! evaluated neighbour to the sink, while the merge variant drives a single
//! sorted buffer with a resumable cursor and only emits the buffer prefix.

use std::{cmp::Ordering, collections::BinaryHeap};

use crate::{
    error::Result,
    index::{corruption_at, SmallWorld},
    sorted_buffer::SortedBuffer,
    space::{DataObject, DistValue, Space},
    types::{MaxDist, NodeId, ObjectId, ReverseScored, Scored},
    visited::VisitedBitset,
};

/// Batches longer than this are applied through one sorted merge instead of
/// element-wise insertion.
const MERGE_BUFFER_ALGO_SWITCH_THRESHOLD: usize = 100;

/// Receives candidate results during a kNN query.
///
/// The core offers `(distance, object)` pairs as it evaluates them and makes
/// no assumption about deduplication; the sink owns the top-k bookkeeping.
pub trait KnnSink<O: ?Sized, D> {
    /// Number of neighbours the caller wants.
    fn k(&self) -> usize;

    /// Offers one evaluated object to the sink.
    fn check_and_add(&mut self, dist: D, object: &O);
}

#[derive(Clone, Copy, Debug)]
struct CollectedResult<D> {
    dist: D,
    obj_id: ObjectId,
}

impl<D: PartialOrd> PartialEq for CollectedResult<D> {
    fn eq(&self, other: &Self) -> bool {
        self.obj_id == other.obj_id
            && self
                .dist
                .partial_cmp(&other.dist)
                .is_some_and(|ord| ord == Ordering::Equal)
    }
}

impl<D: PartialOrd> Eq for CollectedResult<D> {}

impl<D: PartialOrd> Ord for CollectedResult<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.obj_id.cmp(&other.obj_id))
    }
}

impl<D: PartialOrd> PartialOrd for CollectedResult<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ready-made sink keeping the k smallest distances seen.
#[derive(Debug)]
pub struct TopKCollector<D> {
    k: usize,
    heap: BinaryHeap<CollectedResult<D>>,
}

impl<D: DistValue> TopKCollector<D> {
    /// Creates a collector for `k` neighbours.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    /// Consumes the collector, returning `(distance, obj_id)` pairs in
    /// ascending distance order.
    #[must_use]
    pub fn into_sorted_vec(self) -> Vec<(D, ObjectId)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|result| (result.dist, result.obj_id))
            .collect()
    }
}

impl<O: DataObject, D: DistValue> KnnSink<O, D> for TopKCollector<D> {
    fn k(&self) -> usize {
        self.k
    }

    fn check_and_add(&mut self, dist: D, object: &O) {
        if self.k == 0 {
            return;
        }
        let admits = self.heap.len() < self.k
            || self
                .heap
                .peek()
                .is_some_and(|farthest| farthest.dist > dist);
        if admits {
            self.heap.push(CollectedResult {
                dist,
                obj_id: object.id(),
            });
            if self.heap.len() > self.k {
                self.heap.pop();
            }
        }
    }
}

#[inline]
fn prefetch(bytes: &[u8]) {
    #[cfg(target_arch = "x86_64")]
    if let Some(first) = bytes.first() {
        // SAFETY: prefetch is a pure hint; any address is allowed.
        unsafe {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            _mm_prefetch::<_MM_HINT_T0>((first as *const u8).cast());
        }
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = bytes;
}

impl<S, O> SmallWorld<'_, S, O>
where
    O: DataObject,
    S: Space<O>,
{
    /// Classic two-heap beam (`algoType = old`).
    ///
    /// Every evaluated neighbour is offered to the sink, whether or not the
    /// pruning heap admits it.
    pub(crate) fn search_old<K: KnnSink<O, S::Dist>>(
        &self,
        query: &O,
        ef_search: usize,
        sink: &mut K,
    ) -> Result<()> {
        let bound = self.graph().published();
        if bound == 0 {
            return Ok(());
        }
        let entry = self
            .graph()
            .entry()
            .expect("a non-empty graph always has an entry point");
        if entry >= bound {
            return Err(corruption_at(entry, bound));
        }

        let mut visited = VisitedBitset::new(bound);
        let mut candidates = BinaryHeap::new();
        let mut closest: BinaryHeap<MaxDist<S::Dist>> = BinaryHeap::new();
        let mut friend_buf: Vec<NodeId> = Vec::new();

        let entry_dist = self.space().distance(&self.data()[entry], query);
        sink.check_and_add(entry_dist, &self.data()[entry]);
        candidates.push(ReverseScored(Scored {
            dist: entry_dist,
            node: entry,
        }));
        closest.push(MaxDist(entry_dist));
        visited.insert(entry);

        while let Some(ReverseScored(curr)) = candidates.pop() {
            let lower_bound = closest
                .peek()
                .expect("the pruning heap is never empty during traversal")
                .0;
            if curr.dist > lower_bound {
                break;
            }
            self.graph().copy_friends_into(curr.node, &mut friend_buf);
            for &friend in &friend_buf {
                if let Some(object) = self.data().get(friend) {
                    prefetch(object.bytes());
                }
            }
            for &friend in &friend_buf {
                if friend >= bound {
                    return Err(corruption_at(friend, bound));
                }
                if !visited.insert(friend) {
                    continue;
                }
                let dist = self.space().distance(&self.data()[friend], query);
                let threshold = closest
                    .peek()
                    .expect("the pruning heap is never empty during traversal")
                    .0;
                if closest.len() < ef_search || dist < threshold {
                    closest.push(MaxDist(dist));
                    if closest.len() > ef_search {
                        closest.pop();
                    }
                    candidates.push(ReverseScored(Scored { dist, node: friend }));
                }
                sink.check_and_add(dist, &self.data()[friend]);
            }
        }
        Ok(())
    }

    /// Sorted-array beam (`algoType = v1merge`).
    ///
    /// The buffer doubles as frontier and result set; insertions below the
    /// cursor rewind it so better-scoring entries discovered late are still
    /// expanded.
    pub(crate) fn search_v1_merge<K: KnnSink<O, S::Dist>>(
        &self,
        query: &O,
        ef_search: usize,
        sink: &mut K,
    ) -> Result<()> {
        let bound = self.graph().published();
        if bound == 0 {
            return Ok(());
        }
        let entry = self
            .graph()
            .entry()
            .expect("a non-empty graph always has an entry point");
        if entry >= bound {
            return Err(corruption_at(entry, bound));
        }

        let mut visited = VisitedBitset::new(bound);
        let mut buffer = SortedBuffer::new(ef_search.max(sink.k()));
        let mut batch: Vec<(S::Dist, NodeId)> = Vec::new();
        let mut friend_buf: Vec<NodeId> = Vec::new();

        let entry_dist = self.space().distance(&self.data()[entry], query);
        buffer.push_first(entry_dist, entry);
        visited.insert(entry);

        let mut cursor = 0;
        while cursor < buffer.len().min(ef_search) {
            debug_assert!(!buffer.get(cursor).used, "the cursor points at an unexpanded entry");
            buffer.mark_used(cursor);
            let curr = buffer.get(cursor).node;
            cursor += 1;

            self.graph().copy_friends_into(curr, &mut friend_buf);
            for &friend in &friend_buf {
                if let Some(object) = self.data().get(friend) {
                    prefetch(object.bytes());
                }
            }

            batch.clear();
            let top_key = buffer.top_key();
            for &friend in &friend_buf {
                if friend >= bound {
                    return Err(corruption_at(friend, bound));
                }
                if !visited.insert(friend) {
                    continue;
                }
                let dist = self.space().distance(&self.data()[friend], query);
                if buffer.len() < ef_search || top_key.map_or(true, |key| dist < key) {
                    batch.push((dist, friend));
                }
            }

            if !batch.is_empty() {
                batch.sort_by(|a, b| {
                    a.0.partial_cmp(&b.0)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| a.1.cmp(&b.1))
                });
                let insertion = if batch.len() > MERGE_BUFFER_ALGO_SWITCH_THRESHOLD {
                    buffer.merge_with_sorted(&batch)
                } else {
                    let mut first = None;
                    for &(dist, node) in &batch {
                        if let Some(index) = buffer.push_or_replace(dist, node) {
                            first = Some(first.map_or(index, |best: usize| best.min(index)));
                        }
                    }
                    first
                };
                if let Some(index) = insertion {
                    if index < cursor {
                        cursor = index;
                    }
                }
            }

            while cursor < buffer.len() && buffer.get(cursor).used {
                cursor += 1;
            }
        }

        for index in 0..sink.k().min(buffer.len()) {
            let entry = buffer.get(index);
            sink.check_and_add(entry.key, &self.data()[entry.node]);
        }
        Ok(())
    }
}
