//! Shared fixtures for the integration suites.

use proxima_core::{DataObject, DenseVector, L2Space, ObjectId, Space};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Uniform random vectors in `[0, 1)^dim` with ids `0..n`.
pub fn random_vectors(n: usize, dim: usize, seed: u64) -> Vec<DenseVector> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let values = (0..dim).map(|_| rng.gen_range(0.0..1.0)).collect();
            DenseVector::new(i as ObjectId, values)
        })
        .collect()
}

/// Exact k nearest neighbours by exhaustive scan, ascending by distance.
pub fn brute_force_top_k(data: &[DenseVector], query: &DenseVector, k: usize) -> Vec<ObjectId> {
    let mut scored: Vec<(f32, ObjectId)> = data
        .iter()
        .map(|object| (L2Space.distance(object, query), object.id()))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    scored.into_iter().take(k).map(|(_, id)| id).collect()
}
