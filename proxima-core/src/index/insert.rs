//! Insertion path: the indexing beam search and the bidirectional linking of
//! freshly discovered neighbours.

use std::collections::BinaryHeap;

use crate::{
    error::{Result, SmallWorldError},
    index::{corruption_at, SmallWorld},
    space::{DataObject, Space},
    types::{MaxDist, NodeId, ReverseScored, Scored},
    visited::VisitedBitset,
};

impl<S, O> SmallWorld<'_, S, O>
where
    O: DataObject,
    S: Space<O>,
{
    /// Inserts the object at dense position `node` into the graph.
    ///
    /// The beam search runs against whatever portion of the graph is
    /// reachable at the time; concurrent inserters may observe the new node
    /// through its links before it is published in the table.
    pub(crate) fn insert(&self, node: NodeId) -> Result<()> {
        self.graph().clear_friends(node);
        if self.graph().is_table_empty() {
            return Err(SmallWorldError::NotInitialized);
        }
        let max_internal_id = self.data().len() - 1;
        let mut result = self.search_for_indexing(&self.data()[node], max_internal_id)?;
        while let Some(Scored {
            node: candidate, ..
        }) = result.pop()
        {
            self.graph().link(candidate, node);
        }
        self.graph().publish(self.data()[node].id(), node);
        Ok(())
    }

    /// Greedy beam search returning the up-to-`NN` closest nodes to `query`
    /// as a max-heap, so the farthest retained candidate is on top.
    ///
    /// `closest` (capped at `ef_construction`) drives exploration; `result`
    /// (capped at `NN`) is what the caller links against. A node admitted to
    /// `closest` but rejected by `result` is still expanded, which is what
    /// lets the frontier widen beyond the returned set.
    pub(crate) fn search_for_indexing(
        &self,
        query: &O,
        max_internal_id: NodeId,
    ) -> Result<BinaryHeap<Scored<S::Dist>>> {
        let entry = self.graph().entry().ok_or(SmallWorldError::NotInitialized)?;
        let nn = self.params().nn();
        let ef_construction = self.params().ef_construction();

        let mut visited = VisitedBitset::new(max_internal_id + 1);
        let mut candidates = BinaryHeap::new();
        let mut closest: BinaryHeap<MaxDist<S::Dist>> = BinaryHeap::new();
        let mut result = BinaryHeap::new();
        let mut friend_buf: Vec<NodeId> = Vec::new();

        if entry > max_internal_id {
            return Err(corruption_at(entry, max_internal_id + 1));
        }
        let entry_dist = self.index_distance(&self.data()[entry], query);
        visited.insert(entry);
        candidates.push(ReverseScored(Scored {
            dist: entry_dist,
            node: entry,
        }));
        closest.push(MaxDist(entry_dist));
        if closest.len() > ef_construction {
            closest.pop();
        }
        result.push(Scored {
            dist: entry_dist,
            node: entry,
        });
        if result.len() > nn {
            result.pop();
        }

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
                if friend > max_internal_id {
                    return Err(corruption_at(friend, max_internal_id + 1));
                }
                if !visited.insert(friend) {
                    continue;
                }
                let dist = self.index_distance(&self.data()[friend], query);
                let threshold = closest
                    .peek()
                    .expect("the pruning heap is never empty during traversal")
                    .0;
                if closest.len() < ef_construction || dist < threshold {
                    closest.push(MaxDist(dist));
                    if closest.len() > ef_construction {
                        closest.pop();
                    }
                    candidates.push(ReverseScored(Scored { dist, node: friend }));
                }
                let admits = result.len() < nn
                    || result
                        .peek()
                        .is_some_and(|farthest: &Scored<S::Dist>| farthest.dist > dist);
                if admits {
                    result.push(Scored { dist, node: friend });
                    if result.len() > nn {
                        result.pop();
                    }
                }
            }
        }
        Ok(result)
    }
}
