//! Dense visited bitset used by every graph traversal.
//!
//! One bitset is allocated per search and zero-initialised; for N nodes that
//! is N/8 bytes, which stays cache-friendly even for multi-million node
//! graphs.

/// Fixed-length bitset over internal node ids.
#[derive(Debug)]
pub(crate) struct VisitedBitset {
    words: Vec<u64>,
    len: usize,
}

impl VisitedBitset {
    /// Creates a zeroed bitset covering ids `0..len`.
    pub(crate) fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Marks `id` visited, returning `true` when it was not set before.
    pub(crate) fn insert(&mut self, id: usize) -> bool {
        debug_assert!(id < self.len, "id {id} outside bitset of length {}", self.len);
        let word = &mut self.words[id / 64];
        let mask = 1_u64 << (id % 64);
        let fresh = *word & mask == 0;
        *word |= mask;
        fresh
    }
}
