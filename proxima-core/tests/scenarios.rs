//! End-to-end scenarios: empty and singleton indices, beam-variant
//! equivalence, parallel-build health, round trips, and corruption handling.

mod common;

use std::{
    collections::BTreeSet,
    fs,
    sync::atomic::{AtomicUsize, Ordering},
};

use proxima_core::{
    DenseVector, IndexParams, L2Space, ProgressSink, QueryParams, SearchAlgo, SmallWorld,
    SmallWorldErrorCode, TopKCollector,
};
use rstest::rstest;
use tempfile::tempdir;

use common::random_vectors;

fn knn_ids(
    index: &SmallWorld<'_, L2Space, DenseVector>,
    query: &DenseVector,
    k: usize,
    ef_search: usize,
    algo: SearchAlgo,
) -> Vec<(f32, i32)> {
    let params = QueryParams::new()
        .with_ef_search(ef_search)
        .expect("beam width must be valid")
        .with_algo(algo);
    let mut sink = TopKCollector::new(k);
    index.knn(query, &params, &mut sink).expect("search must succeed");
    sink.into_sorted_vec()
}

#[rstest]
#[case(SearchAlgo::Old)]
#[case(SearchAlgo::V1Merge)]
fn empty_dataset_yields_empty_results(#[case] algo: SearchAlgo) {
    let data: Vec<DenseVector> = Vec::new();
    let index = SmallWorld::build(&L2Space, &data, IndexParams::default())
        .expect("an empty build must succeed");
    assert!(index.is_empty());
    assert_eq!(index.entry_point(), None);

    let query = DenseVector::new(-1, vec![0.5, 0.5]);
    let results = knn_ids(&index, &query, 5, 8, algo);
    assert!(results.is_empty());
}

#[rstest]
#[case(SearchAlgo::Old)]
#[case(SearchAlgo::V1Merge)]
fn singleton_dataset_returns_exactly_one_result(#[case] algo: SearchAlgo) {
    let data = vec![DenseVector::new(42, vec![1.0, 2.0])];
    let index = SmallWorld::build(&L2Space, &data, IndexParams::default())
        .expect("build must succeed");
    assert_eq!(index.len(), 1);
    assert_eq!(index.entry_point(), Some(0));

    let query = DenseVector::new(-1, vec![4.0, 6.0]);
    let results = knn_ids(&index, &query, 3, 8, algo);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1, 42);
    assert!((results[0].0 - 5.0).abs() < 1e-6);
}

#[test]
fn both_beam_variants_agree_on_a_grid() {
    // 5x10 grid; query offsets keep every pairwise distance distinct so the
    // exact 10-NN set is unambiguous.
    let data: Vec<DenseVector> = (0..50)
        .map(|i| DenseVector::new(i, vec![(i % 5) as f32, (i / 5) as f32]))
        .collect();
    let params = IndexParams::new(10, 50).expect("params must be valid");
    let index = SmallWorld::build(&L2Space, &data, params).expect("build must succeed");

    for q in 0..20 {
        let query = DenseVector::new(
            -1,
            vec![(q % 5) as f32 + 0.13, (q / 5) as f32 + 0.37],
        );
        let old: BTreeSet<i32> = knn_ids(&index, &query, 10, 50, SearchAlgo::Old)
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        let merge: BTreeSet<i32> = knn_ids(&index, &query, 10, 50, SearchAlgo::V1Merge)
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        assert_eq!(old.len(), 10);
        assert_eq!(old, merge, "variants disagree for query {q}");
    }
}

#[test]
fn parallel_build_keeps_the_graph_symmetric() {
    let data = random_vectors(1000, 4, 7);
    let params = IndexParams::new(8, 24)
        .expect("params must be valid")
        .with_index_thread_qty(8);
    let index = SmallWorld::build(&L2Space, &data, params).expect("build must succeed");

    assert_eq!(index.len(), 1000);
    index.invariants().check_all().expect("graph must be valid");
}

#[test]
fn round_trip_preserves_the_graph_exactly() {
    let data = random_vectors(1000, 4, 11);
    let params = IndexParams::new(8, 24)
        .expect("params must be valid")
        .with_index_thread_qty(8);
    let index = SmallWorld::build(&L2Space, &data, params).expect("build must succeed");

    let dir = tempdir().expect("temp dir must be created");
    let saved = dir.path().join("first.sw");
    index.save(&saved).expect("save must succeed");

    let reloaded = SmallWorld::load(&L2Space, &data, &saved).expect("load must succeed");
    assert_eq!(reloaded.len(), index.len());
    reloaded
        .invariants()
        .check_all()
        .expect("the reloaded graph must be valid");

    // Saving the reloaded index must reproduce the file byte for byte: the
    // table order is deterministic and the loader preserves friend order and
    // multiplicity.
    let resaved = dir.path().join("second.sw");
    reloaded.save(&resaved).expect("second save must succeed");
    let first = fs::read(&saved).expect("first file must be readable");
    let second = fs::read(&resaved).expect("second file must be readable");
    assert_eq!(first, second);
}

#[test]
fn crafted_out_of_range_friend_id_is_rejected() {
    let data = random_vectors(3, 2, 3);
    let dir = tempdir().expect("temp dir must be created");
    let path = dir.path().join("corrupt.sw");
    // Friend id 3 equals the dataset size and is therefore out of range.
    fs::write(
        &path,
        "methodDesc=small_world_rand\nNN=2\n0:0: 1\n1:1: 0 3\n2:2:\n\nlineQty=7\n",
    )
    .expect("fixture must be written");

    let err = SmallWorld::load(&L2Space, &data, &path).expect_err("load must fail");
    assert!(matches!(
        err.code(),
        SmallWorldErrorCode::Format | SmallWorldErrorCode::DataMutation
    ));
}

#[test]
fn single_threaded_builds_are_deterministic() {
    let data = random_vectors(300, 3, 5);
    let dir = tempdir().expect("temp dir must be created");
    let mut files = Vec::new();
    for run in 0..2 {
        let params = IndexParams::new(6, 18)
            .expect("params must be valid")
            .with_index_thread_qty(1);
        let index = SmallWorld::build(&L2Space, &data, params).expect("build must succeed");
        let path = dir.path().join(format!("run{run}.sw"));
        index.save(&path).expect("save must succeed");
        files.push(fs::read(&path).expect("file must be readable"));
    }
    assert_eq!(files[0], files[1]);
}

#[test]
fn progress_counts_cover_the_whole_dataset() {
    struct Counting {
        total: AtomicUsize,
        zero_deltas: AtomicUsize,
    }
    impl ProgressSink for Counting {
        fn add(&self, completed: usize) {
            if completed == 0 {
                self.zero_deltas.fetch_add(1, Ordering::Relaxed);
            }
            self.total.fetch_add(completed, Ordering::Relaxed);
        }
    }

    let data = random_vectors(700, 3, 9);
    let params = IndexParams::new(6, 18)
        .expect("params must be valid")
        .with_index_thread_qty(4);
    let sink = Counting {
        total: AtomicUsize::new(0),
        zero_deltas: AtomicUsize::new(0),
    };
    SmallWorld::build_with_progress(&L2Space, &data, params, &sink)
        .expect("build must succeed");

    assert_eq!(sink.total.load(Ordering::Relaxed), 700);
    assert_eq!(sink.zero_deltas.load(Ordering::Relaxed), 0);
}

#[test]
fn range_queries_are_rejected() {
    let data = random_vectors(10, 2, 1);
    let index = SmallWorld::build(&L2Space, &data, IndexParams::default())
        .expect("build must succeed");
    let query = DenseVector::new(-1, vec![0.5, 0.5]);
    let err = index
        .range_search(&query, 0.25)
        .expect_err("range queries are unsupported");
    assert_eq!(err.code(), SmallWorldErrorCode::Unsupported);
}
