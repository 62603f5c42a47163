//! Fixed-capacity sorted buffer backing the merge-variant query beam.
//!
//! The buffer doubles as frontier and result set: entries stay ordered by
//! ascending key, carry a `used` flag that marks expanded entries, and every
//! insertion reports the index it landed at so the traversal cursor can be
//! rewound below it.

use std::cmp::Ordering;

use crate::{space::DistValue, types::NodeId};

/// One `(key, node, used)` slot.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BufferEntry<D> {
    pub(crate) key: D,
    pub(crate) node: NodeId,
    pub(crate) used: bool,
}

/// Ordered buffer with a hard capacity.
#[derive(Debug)]
pub(crate) struct SortedBuffer<D> {
    entries: Vec<BufferEntry<D>>,
    capacity: usize,
}

impl<D: DistValue> SortedBuffer<D> {
    /// Creates an empty buffer holding at most `capacity` entries.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "the buffer needs room for the entry point");
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Current element count.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Borrow the entry at `index`.
    pub(crate) fn get(&self, index: usize) -> &BufferEntry<D> {
        &self.entries[index]
    }

    /// Flags the entry at `index` as expanded.
    pub(crate) fn mark_used(&mut self, index: usize) {
        self.entries[index].used = true;
    }

    /// The pruning threshold: the largest retained key once the buffer is
    /// full, unbounded (`None`) before that.
    pub(crate) fn top_key(&self) -> Option<D> {
        if self.entries.len() == self.capacity {
            self.entries.last().map(|entry| entry.key)
        } else {
            None
        }
    }

    /// Seeds the buffer with its first entry.
    pub(crate) fn push_first(&mut self, key: D, node: NodeId) {
        debug_assert!(self.entries.is_empty());
        self.entries.push(BufferEntry {
            key,
            node,
            used: false,
        });
    }

    /// Inserts one entry at its sorted position, evicting the last element
    /// when full. Returns the insertion index, or `None` when the key ranks
    /// at or beyond the current tail of a full buffer.
    pub(crate) fn push_or_replace(&mut self, key: D, node: NodeId) -> Option<usize> {
        let full = self.entries.len() == self.capacity;
        if full && self.entries.last().is_some_and(|last| !(key < last.key)) {
            return None;
        }
        let position = self.entries.partition_point(|entry| entry.key < key);
        if full {
            self.entries.pop();
        }
        self.entries.insert(
            position,
            BufferEntry {
                key,
                node,
                used: false,
            },
        );
        Some(position)
    }

    /// Merges an ascending-sorted batch, keeping the best `capacity` entries.
    /// Returns the smallest index a batch item landed at, if any did.
    pub(crate) fn merge_with_sorted(&mut self, items: &[(D, NodeId)]) -> Option<usize> {
        let mut merged = Vec::with_capacity(self.capacity.min(self.entries.len() + items.len()));
        let mut first_insertion = None;
        let mut existing = self.entries.iter().copied().peekable();
        let mut incoming = items.iter().copied().peekable();
        while merged.len() < self.capacity {
            let take_incoming = match (existing.peek(), incoming.peek()) {
                (Some(entry), Some(&(key, _))) => key
                    .partial_cmp(&entry.key)
                    .is_some_and(|ord| ord == Ordering::Less),
                (None, Some(_)) => true,
                (Some(_), None) => false,
                (None, None) => break,
            };
            if take_incoming {
                let (key, node) = incoming.next().expect("peeked incoming item");
                first_insertion.get_or_insert(merged.len());
                merged.push(BufferEntry {
                    key,
                    node,
                    used: false,
                });
            } else {
                merged.push(existing.next().expect("peeked existing entry"));
            }
        }
        self.entries = merged;
        first_insertion
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn filled(capacity: usize, keys: &[f32]) -> SortedBuffer<f32> {
        let mut buffer = SortedBuffer::new(capacity);
        for (node, &key) in keys.iter().enumerate() {
            buffer.push_or_replace(key, node);
        }
        buffer
    }

    fn keys(buffer: &SortedBuffer<f32>) -> Vec<f32> {
        (0..buffer.len()).map(|i| buffer.get(i).key).collect()
    }

    #[test]
    fn push_keeps_entries_sorted_and_reports_positions() {
        let mut buffer = SortedBuffer::new(4);
        assert_eq!(buffer.push_or_replace(5.0, 0), Some(0));
        assert_eq!(buffer.push_or_replace(1.0, 1), Some(0));
        assert_eq!(buffer.push_or_replace(3.0, 2), Some(1));
        assert_eq!(buffer.push_or_replace(4.0, 3), Some(2));
        assert_eq!(keys(&buffer), vec![1.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn full_buffer_evicts_the_tail_or_drops() {
        let mut buffer = filled(3, &[1.0, 2.0, 3.0]);
        assert_eq!(buffer.push_or_replace(9.0, 9), None);
        assert_eq!(buffer.push_or_replace(3.0, 9), None);
        assert_eq!(buffer.push_or_replace(1.5, 9), Some(1));
        assert_eq!(keys(&buffer), vec![1.0, 1.5, 2.0]);
        assert_eq!(buffer.len(), 3);
    }

    #[rstest]
    #[case(&[1.0, 2.0], None)]
    #[case(&[1.0, 2.0, 3.0], Some(3.0))]
    fn top_key_is_unbounded_until_full(#[case] seed: &[f32], #[case] expected: Option<f32>) {
        let buffer = filled(3, seed);
        assert_eq!(buffer.top_key(), expected);
    }

    #[test]
    fn merge_interleaves_and_reports_the_first_touched_index() {
        let mut buffer = filled(5, &[1.0, 4.0, 7.0]);
        let first = buffer.merge_with_sorted(&[(2.0, 10), (5.0, 11), (9.0, 12)]);
        assert_eq!(first, Some(1));
        assert_eq!(keys(&buffer), vec![1.0, 2.0, 4.0, 5.0, 7.0]);
    }

    #[test]
    fn merge_preserves_used_flags_of_retained_entries() {
        let mut buffer = filled(4, &[1.0, 4.0]);
        buffer.mark_used(0);
        let first = buffer.merge_with_sorted(&[(2.0, 10)]);
        assert_eq!(first, Some(1));
        assert!(buffer.get(0).used);
        assert!(!buffer.get(1).used);
        assert!(!buffer.get(2).used);
    }

    #[test]
    fn merge_that_lands_nothing_returns_none() {
        let mut buffer = filled(2, &[1.0, 2.0]);
        assert_eq!(buffer.merge_with_sorted(&[(5.0, 9), (6.0, 9)]), None);
        assert_eq!(keys(&buffer), vec![1.0, 2.0]);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        fn is_sorted(buffer: &SortedBuffer<f32>) -> bool {
            keys(buffer).windows(2).all(|pair| pair[0] <= pair[1])
        }

        proptest! {
            #[test]
            fn pushes_keep_order_capacity_and_indices(
                capacity in 1_usize..16,
                incoming in proptest::collection::vec(0.0_f32..100.0, 0..64),
            ) {
                let mut buffer = SortedBuffer::new(capacity);
                for (node, key) in incoming.into_iter().enumerate() {
                    let inserted = buffer.push_or_replace(key, node);
                    if let Some(index) = inserted {
                        prop_assert!((buffer.get(index).key - key).abs() < f32::EPSILON);
                    }
                    prop_assert!(buffer.len() <= capacity);
                    prop_assert!(is_sorted(&buffer));
                }
            }

            #[test]
            fn merge_agrees_with_element_wise_insertion(
                capacity in 1_usize..12,
                seed in proptest::collection::vec(0.0_f32..100.0, 0..12),
                batch in proptest::collection::vec(0.0_f32..100.0, 1..24),
            ) {
                let mut merged = filled(capacity, &seed);
                let mut element_wise = filled(capacity, &seed);

                let mut items: Vec<(f32, usize)> = batch
                    .into_iter()
                    .enumerate()
                    .map(|(node, key)| (key, node + 100))
                    .collect();
                items.sort_by(|a, b| a.0.total_cmp(&b.0));

                merged.merge_with_sorted(&items);
                for &(key, node) in &items {
                    element_wise.push_or_replace(key, node);
                }

                prop_assert_eq!(keys(&merged), keys(&element_wise));
            }
        }
    }
}
