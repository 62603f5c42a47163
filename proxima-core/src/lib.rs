//! Small-world proximity-graph approximate nearest-neighbour index.
//!
//! The index builds a navigable graph by incremental insertion and answers
//! kNN queries with greedy beam search from a fixed entry point, for
//! arbitrary (possibly non-metric) distance functions supplied by a
//! [`Space`]. Results are approximate by design; there is no support for
//! deleting or updating objects once inserted.
//!
//! Insertion runs concurrently across a configurable worker pool with
//! per-node locking; queries run on caller threads against the finished
//! graph. The graph topology can be saved to a line-oriented text format and
//! reconstructed over the same data sequence.

mod error;
mod graph;
mod index;
mod invariants;
mod params;
mod persist;
mod progress;
mod sorted_buffer;
mod space;
mod types;
mod visited;

pub use crate::{
    error::{Result, SmallWorldError, SmallWorldErrorCode},
    index::{KnnSink, SmallWorld, TopKCollector},
    invariants::{InvariantChecker, InvariantViolation},
    params::{IndexParams, QueryParams, SearchAlgo, DEFAULT_NN},
    persist::METHOD_DESC,
    progress::{NullProgress, ProgressSink},
    space::{
        dense::{DenseVector, L2Space},
        DataObject, DistValue, Space,
    },
    types::{NodeId, ObjectId},
};
