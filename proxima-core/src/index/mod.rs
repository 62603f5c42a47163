//! The small-world index: concurrent build, beam-search queries, and the
//! navigable graph they share.
//!
//! The build seeds the first object single-threaded, then drives the
//! remaining insertions through a rayon pool sized to `index_thread_qty`,
//! with worker `i` owning the ids congruent to `i` modulo the worker count.
//! Queries run on caller threads against the finished graph; mixing builders
//! and readers is not supported.

mod insert;
mod query;

pub use query::{KnnSink, TopKCollector};

use rayon::prelude::*;
use tracing::info;

use crate::{
    error::{Result, SmallWorldError},
    graph::Graph,
    params::{IndexParams, QueryParams, SearchAlgo},
    progress::{NullProgress, ProgressSink, PROGRESS_BATCH},
    space::{DataObject, Space},
    types::NodeId,
};

/// Navigable small-world graph over a borrowed data sequence.
///
/// Data objects and the space are borrowed and must outlive the index. Nodes
/// are owned centrally; friend lists hold internal ids, never references.
///
/// # Examples
/// ```
/// use proxima_core::{
///     DenseVector, IndexParams, L2Space, QueryParams, SmallWorld, TopKCollector,
/// };
///
/// let data: Vec<DenseVector> = (0..64)
///     .map(|i| DenseVector::new(i, vec![i as f32, 0.0]))
///     .collect();
/// let params = IndexParams::new(4, 16).expect("parameters must be valid");
/// let index = SmallWorld::build(&L2Space, &data, params).expect("build must succeed");
///
/// let query = DenseVector::new(-1, vec![10.2, 0.0]);
/// let mut sink = TopKCollector::new(3);
/// index
///     .knn(&query, &QueryParams::new(), &mut sink)
///     .expect("search must succeed");
/// assert_eq!(sink.into_sorted_vec()[0].1, 10);
/// ```
#[derive(Debug)]
pub struct SmallWorld<'a, S, O> {
    space: &'a S,
    data: &'a [O],
    params: IndexParams,
    graph: Graph,
}

impl<'a, S, O> SmallWorld<'a, S, O>
where
    O: DataObject,
    S: Space<O>,
{
    /// Builds an index over `data` by incremental insertion.
    ///
    /// An empty dataset yields an empty index; queries against it return no
    /// results.
    ///
    /// # Errors
    /// Returns [`SmallWorldError::GraphCorruption`] when the node table does
    /// not cover the dataset after all workers join, and propagates any
    /// insertion failure.
    pub fn build(space: &'a S, data: &'a [O], params: IndexParams) -> Result<Self> {
        Self::build_with_progress(space, data, params, &NullProgress)
    }

    /// Builds an index, reporting completion counts to `progress`.
    pub fn build_with_progress(
        space: &'a S,
        data: &'a [O],
        params: IndexParams,
        progress: &dyn ProgressSink,
    ) -> Result<Self> {
        info!(
            nn = params.nn(),
            ef_construction = params.ef_construction(),
            index_thread_qty = params.index_thread_qty(),
            use_proxy_dist = params.use_proxy_dist(),
            objects = data.len(),
            "building small-world index"
        );
        let index = Self {
            space,
            data,
            params,
            graph: Graph::with_len(data.len()),
        };
        if data.is_empty() {
            return Ok(index);
        }

        index.seed_first();
        progress.add(1);

        let qty = index.params.index_thread_qty();
        if qty <= 1 {
            for id in 1..data.len() {
                index.insert(id)?;
                progress.add(1);
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(qty)
                .build()
                .map_err(|source| SmallWorldError::BadParam {
                    reason: format!("cannot start {qty} indexing threads: {source}"),
                })?;
            pool.install(|| {
                (0..qty)
                    .into_par_iter()
                    .try_for_each(|worker| index.insert_partition(worker, qty, progress))
            })?;
            let published = index.graph.published();
            if published != data.len() {
                return Err(SmallWorldError::GraphCorruption {
                    message: format!(
                        "node table holds {published} entries but the dataset has {} objects",
                        data.len()
                    ),
                });
            }
            info!(workers = qty, "indexing threads have finished");
        }
        Ok(index)
    }

    /// Answers a kNN query, feeding results into the caller's sink.
    ///
    /// The beam variant and width come from `query_params`; an unset
    /// `efSearch` falls back to the index's `NN`. An empty index produces no
    /// results and no error.
    pub fn knn<K: KnnSink<O, S::Dist>>(
        &self,
        query: &O,
        query_params: &QueryParams,
        sink: &mut K,
    ) -> Result<()> {
        let ef_search = query_params.ef_search().unwrap_or(self.params.nn());
        match query_params.algo() {
            SearchAlgo::Old => self.search_old(query, ef_search, sink),
            SearchAlgo::V1Merge => self.search_v1_merge(query, ef_search, sink),
        }
    }

    /// Range queries are not supported by this index.
    ///
    /// # Errors
    /// Always returns [`SmallWorldError::Unsupported`].
    pub fn range_search(&self, _query: &O, _radius: S::Dist) -> Result<()> {
        Err(SmallWorldError::Unsupported {
            operation: "range search",
        })
    }

    /// Number of published nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.published()
    }

    /// Returns whether the index holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The build-time parameters this index was created with.
    #[must_use]
    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    /// The fixed traversal entry point, if the graph is non-empty.
    #[must_use]
    pub fn entry_point(&self) -> Option<NodeId> {
        self.graph.entry()
    }

    fn seed_first(&self) {
        self.graph.clear_friends(0);
        self.graph.publish(self.data[0].id(), 0);
        self.graph.set_entry(0);
    }

    fn insert_partition(
        &self,
        worker: usize,
        out_of: usize,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let mut pending = 0;
        for id in (1..self.data.len()).filter(|id| id % out_of == worker) {
            self.insert(id)?;
            pending += 1;
            if pending >= PROGRESS_BATCH {
                progress.add(pending);
                pending = 0;
            }
        }
        if pending > 0 {
            progress.add(pending);
        }
        Ok(())
    }

    fn index_distance(&self, object: &O, query: &O) -> S::Dist {
        if self.params.use_proxy_dist() {
            self.space.proxy_distance(object, query)
        } else {
            self.space.distance(object, query)
        }
    }

    pub(crate) fn graph(&self) -> &Graph {
        &self.graph
    }

    pub(crate) fn data(&self) -> &'a [O] {
        self.data
    }

    pub(crate) fn space(&self) -> &'a S {
        self.space
    }

    pub(crate) fn from_parts(
        space: &'a S,
        data: &'a [O],
        params: IndexParams,
        graph: Graph,
    ) -> Self {
        Self {
            space,
            data,
            params,
            graph,
        }
    }
}

pub(crate) fn corruption_at(node: NodeId, bound: usize) -> SmallWorldError {
    SmallWorldError::GraphCorruption {
        message: format!("internal id {node} is outside the legal range [0, {bound})"),
    }
}
