//! Structural invariant checks for the small-world graph.
//!
//! Surfaced via [`SmallWorld::invariants`] so tests can assert graph health
//! after builds and round trips without reimplementing traversal logic.

use std::collections::HashMap;

use thiserror::Error;

use crate::{
    graph::Graph,
    index::SmallWorld,
    space::{DataObject, Space},
    types::NodeId,
};

/// Reports an invariant violation surfaced by [`InvariantChecker`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum InvariantViolation {
    /// An edge appears a different number of times on its two endpoints.
    #[error(
        "edge {a}<->{b} is asymmetric: {a} lists it {forward} time(s), {b} lists it {backward} time(s)"
    )]
    AsymmetricEdge {
        a: NodeId,
        b: NodeId,
        forward: usize,
        backward: usize,
    },
    /// A node's friend list names the node itself.
    #[error("node {node} lists itself as a friend")]
    SelfEdge { node: NodeId },
    /// The node table does not cover the dataset exactly.
    #[error("node table holds {table} entries but {expected} were expected")]
    TableSizeMismatch { table: usize, expected: usize },
    /// Two table entries point at the same internal id.
    #[error("internal id {node} is mapped by more than one object id")]
    DuplicateInternalId { node: NodeId },
    /// A table entry points outside the internal id range.
    #[error("internal id {node} is outside the range [0, {expected})")]
    InternalIdOutOfRange { node: NodeId, expected: usize },
    /// A populated graph lacks an entry point.
    #[error("graph entry point missing despite {published} published node(s)")]
    MissingEntryPoint { published: usize },
    /// The entry point drifted away from the first inserted node.
    #[error("graph entry point is {entry}, expected internal id 0")]
    EntryPointMoved { entry: NodeId },
}

/// Helper returned by [`SmallWorld::invariants`] to run structural checks.
#[derive(Debug)]
pub struct InvariantChecker<'index> {
    graph: &'index Graph,
    expected_len: usize,
}

impl<'index> InvariantChecker<'index> {
    pub(crate) fn new(graph: &'index Graph, expected_len: usize) -> Self {
        Self {
            graph,
            expected_len,
        }
    }

    /// Runs every check, returning the first violation encountered.
    pub fn check_all(&self) -> Result<(), InvariantViolation> {
        self.check_entry_point()?;
        self.check_id_coverage()?;
        self.check_symmetry()
    }

    /// Edges are undirected: each endpoint must list the other the same
    /// number of times.
    pub fn check_symmetry(&self) -> Result<(), InvariantViolation> {
        let mut edges: HashMap<(NodeId, NodeId), (usize, usize)> = HashMap::new();
        for node in 0..self.graph.capacity() {
            for friend in self.graph.friends_of(node) {
                if friend == node {
                    return Err(InvariantViolation::SelfEdge { node });
                }
                let (key, forward) = if node < friend {
                    ((node, friend), true)
                } else {
                    ((friend, node), false)
                };
                let counts = edges.entry(key).or_default();
                if forward {
                    counts.0 += 1;
                } else {
                    counts.1 += 1;
                }
            }
        }
        for ((a, b), (forward, backward)) in edges {
            if forward != backward {
                return Err(InvariantViolation::AsymmetricEdge {
                    a,
                    b,
                    forward,
                    backward,
                });
            }
        }
        Ok(())
    }

    /// The table maps each object id to a distinct internal id and covers
    /// `0..expected_len` exactly.
    pub fn check_id_coverage(&self) -> Result<(), InvariantViolation> {
        let snapshot = self.graph.table_snapshot();
        if snapshot.len() != self.expected_len {
            return Err(InvariantViolation::TableSizeMismatch {
                table: snapshot.len(),
                expected: self.expected_len,
            });
        }
        let mut seen = vec![false; self.expected_len];
        for (_, node) in snapshot {
            if node >= self.expected_len {
                return Err(InvariantViolation::InternalIdOutOfRange {
                    node,
                    expected: self.expected_len,
                });
            }
            if seen[node] {
                return Err(InvariantViolation::DuplicateInternalId { node });
            }
            seen[node] = true;
        }
        Ok(())
    }

    /// A non-empty graph keeps internal id 0 as its entry point forever.
    pub fn check_entry_point(&self) -> Result<(), InvariantViolation> {
        let published = self.graph.published();
        if published == 0 {
            return Ok(());
        }
        match self.graph.entry() {
            None => Err(InvariantViolation::MissingEntryPoint { published }),
            Some(0) => Ok(()),
            Some(entry) => Err(InvariantViolation::EntryPointMoved { entry }),
        }
    }
}

impl<S, O> SmallWorld<'_, S, O>
where
    O: DataObject,
    S: Space<O>,
{
    /// Returns a checker over this index's graph.
    #[must_use]
    pub fn invariants(&self) -> InvariantChecker<'_> {
        InvariantChecker::new(self.graph(), self.data().len())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        graph::Graph,
        space::dense::{DenseVector, L2Space},
        IndexParams, SmallWorld,
    };

    use super::*;

    #[test]
    fn a_healthy_build_passes_every_check() {
        let data: Vec<DenseVector> = (0..40)
            .map(|i| DenseVector::new(i, vec![i as f32, (i * i) as f32]))
            .collect();
        let params = IndexParams::new(4, 16).expect("params must be valid");
        let index = SmallWorld::build(&L2Space, &data, params).expect("build must succeed");
        index.invariants().check_all().expect("graph must be valid");
    }

    #[test]
    fn one_way_edges_are_reported() {
        let graph = Graph::with_len(2);
        graph.publish(0, 0);
        graph.publish(1, 1);
        graph.set_entry(0);
        graph.push_friend(0, 1);

        let checker = InvariantChecker::new(&graph, 2);
        let violation = checker.check_symmetry().expect_err("asymmetry must be caught");
        assert_eq!(
            violation,
            InvariantViolation::AsymmetricEdge {
                a: 0,
                b: 1,
                forward: 1,
                backward: 0,
            }
        );
    }

    #[test]
    fn table_gaps_are_reported() {
        let graph = Graph::with_len(3);
        graph.publish(7, 0);
        graph.set_entry(0);

        let checker = InvariantChecker::new(&graph, 3);
        let violation = checker
            .check_id_coverage()
            .expect_err("missing nodes must be caught");
        assert_eq!(
            violation,
            InvariantViolation::TableSizeMismatch {
                table: 1,
                expected: 3,
            }
        );
    }

    #[test]
    fn a_moved_entry_point_is_reported() {
        let graph = Graph::with_len(2);
        graph.publish(0, 1);
        graph.set_entry(1);

        let checker = InvariantChecker::new(&graph, 2);
        let violation = checker
            .check_entry_point()
            .expect_err("a drifted entry point must be caught");
        assert_eq!(violation, InvariantViolation::EntryPointMoved { entry: 1 });
    }
}
