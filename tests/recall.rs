//! Recall of the approximate search against exhaustive scan.

use std::sync::Arc;

use skein::dataset::{brute_force_top_k, random_vectors, recall};
use skein::{
    build_index, AngularDistance, DistanceFunction, HnswConfig, Metric, SquaredEuclideanDistance,
};

fn average_recall(
    vectors: &Arc<Vec<Vec<f32>>>,
    queries: &[Vec<f32>],
    config: HnswConfig,
    metric: Metric,
    distance: &dyn DistanceFunction,
    k: usize,
    ef: usize,
) -> f64 {
    let index = build_index(Arc::clone(vectors), config, metric, 42).unwrap();
    let total: f64 = queries
        .iter()
        .map(|query| {
            let truth = brute_force_top_k(vectors, query, k, distance);
            recall(&index.find_top_k(query, k, ef), &truth)
        })
        .sum();
    total / queries.len() as f64
}

#[test]
fn test_recall_euclidean() {
    let vectors = Arc::new(random_vectors(2_000, 32, 10));
    let queries = random_vectors(50, 32, 11);
    for heuristic in [true, false] {
        let config = HnswConfig::new(32, 16, 100, heuristic).unwrap();
        let avg = average_recall(
            &vectors,
            &queries,
            config,
            Metric::Euclidean,
            &SquaredEuclideanDistance,
            10,
            64,
        );
        println!("heuristic={} recall@10: {:.2}%", heuristic, avg * 100.0);
        assert!(avg > 0.85, "Recall should be > 85%, got {:.2}%", avg * 100.0);
    }
}

#[test]
fn test_recall_angular() {
    let vectors = Arc::new(random_vectors(1_000, 24, 20));
    let queries = random_vectors(30, 24, 21);
    let avg = average_recall(
        &vectors,
        &queries,
        HnswConfig::default(),
        Metric::Angular,
        &AngularDistance,
        10,
        64,
    );
    assert!(avg > 0.85, "Recall should be > 85%, got {:.2}%", avg * 100.0);
}

#[test]
fn test_larger_explore_never_hurts_much() {
    let vectors = Arc::new(random_vectors(1_000, 16, 30));
    let queries = random_vectors(30, 16, 31);
    let config = HnswConfig::default();
    let narrow = average_recall(
        &vectors,
        &queries,
        config,
        Metric::Euclidean,
        &SquaredEuclideanDistance,
        10,
        10,
    );
    let wide = average_recall(
        &vectors,
        &queries,
        config,
        Metric::Euclidean,
        &SquaredEuclideanDistance,
        10,
        200,
    );
    assert!(wide >= narrow - 0.02, "ef=200 {:.3} vs ef=10 {:.3}", wide, narrow);
    assert!(wide > 0.95, "Recall at ef=200 should be > 95%, got {:.3}", wide);
}
