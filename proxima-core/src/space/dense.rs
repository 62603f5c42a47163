//! Dense `f32` vectors under Euclidean distance.
//!
//! Ships the concrete space used by the CLI, tests, and benches. The proxy
//! distance is the squared L2 norm, which preserves ranking exactly while
//! skipping the square root.

use crate::{
    space::{DataObject, Space},
    types::ObjectId,
};

/// A dense `f32` vector with an external identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseVector {
    id: ObjectId,
    values: Vec<f32>,
}

impl DenseVector {
    /// Creates a vector bound to an external id.
    #[must_use]
    pub fn new(id: ObjectId, values: Vec<f32>) -> Self {
        Self { id, values }
    }

    /// Returns the vector components.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns the dimensionality.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.values.len()
    }
}

impl DataObject for DenseVector {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn bytes(&self) -> &[u8] {
        let values = self.values.as_slice();
        // SAFETY: an f32 slice is always valid to view as plain bytes; the
        // length in bytes cannot overflow because the Vec already exists.
        unsafe {
            std::slice::from_raw_parts(
                values.as_ptr().cast::<u8>(),
                std::mem::size_of_val(values),
            )
        }
    }
}

/// Euclidean (L2) space over [`DenseVector`]s.
///
/// Vectors of unequal dimension are compared over their common prefix; the
/// caller is expected to supply uniformly sized data.
#[derive(Clone, Copy, Debug, Default)]
pub struct L2Space;

impl L2Space {
    fn squared(object: &DenseVector, query: &DenseVector) -> f32 {
        object
            .values
            .iter()
            .zip(&query.values)
            .map(|(a, b)| {
                let diff = a - b;
                diff * diff
            })
            .sum()
    }
}

impl Space<DenseVector> for L2Space {
    type Dist = f32;

    fn distance(&self, object: &DenseVector, query: &DenseVector) -> f32 {
        Self::squared(object, query).sqrt()
    }

    fn proxy_distance(&self, object: &DenseVector, query: &DenseVector) -> f32 {
        Self::squared(object, query)
    }
}
