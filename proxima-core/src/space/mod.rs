//! Space abstractions: opaque data objects and the distance functions that
//! compare them.
//!
//! The index never interprets object payloads; it only asks the [`Space`] for
//! distances and the [`DataObject`] for its external identifier (and raw bytes
//! when issuing prefetch hints). Distances need not be metric and need not be
//! symmetric; the stored object is always passed first and the query second.

pub mod dense;

use std::fmt;

use crate::types::ObjectId;

/// Bound alias for distance scalars: any totally-ordered-in-practice numeric
/// value works, including `f32`, `f64`, and the integer types.
pub trait DistValue: Copy + PartialOrd + Send + Sync + fmt::Debug {}

impl<T> DistValue for T where T: Copy + PartialOrd + Send + Sync + fmt::Debug {}

/// An opaque payload with a globally unique external identifier.
///
/// Objects are borrowed by the index and must outlive it. [`DataObject::bytes`]
/// exposes the raw payload solely so traversals can issue cache prefetch
/// hints; correctness never depends on its contents.
pub trait DataObject: Sync {
    /// Returns the external identifier of this object.
    fn id(&self) -> ObjectId;

    /// Returns the raw payload bytes.
    fn bytes(&self) -> &[u8];
}

/// Supplies distances over a collection of [`DataObject`]s.
///
/// `proxy_distance` is an optionally cheaper surrogate that approximately
/// preserves ranking; the default implementation falls back to the full
/// distance, so spaces without a cheaper form need not override it.
///
/// # Examples
/// ```
/// use proxima_core::{DataObject, ObjectId, Space};
///
/// struct Scalar(ObjectId, f64);
///
/// impl DataObject for Scalar {
///     fn id(&self) -> ObjectId { self.0 }
///     fn bytes(&self) -> &[u8] { &[] }
/// }
///
/// struct Line;
///
/// impl Space<Scalar> for Line {
///     type Dist = f64;
///     fn distance(&self, object: &Scalar, query: &Scalar) -> f64 {
///         (object.1 - query.1).abs()
///     }
/// }
///
/// assert_eq!(Line.distance(&Scalar(0, 1.0), &Scalar(1, 4.0)), 3.0);
/// ```
pub trait Space<O: ?Sized>: Sync {
    /// Scalar distance type produced by this space.
    type Dist: DistValue;

    /// Computes the distance from a stored `object` to the `query`.
    fn distance(&self, object: &O, query: &O) -> Self::Dist;

    /// Computes a cheaper surrogate distance, used for all index-time
    /// comparisons when the index is configured with `use_proxy_dist`.
    fn proxy_distance(&self, object: &O, query: &O) -> Self::Dist {
        self.distance(object, query)
    }
}
