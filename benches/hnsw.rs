//! HNSW Benchmarks
//!
//! Run with: cargo bench --bench hnsw

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skein::dataset::random_vectors;
use skein::{HnswConfig, HnswIndex, InvLogLevelGenerator, SquaredEuclideanDistance};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Index over `vectors`, with the first `count` docids inserted.
fn build(vectors: Arc<Vec<Vec<f32>>>, count: usize, heuristic: bool) -> HnswIndex {
    let config = HnswConfig::new(32, 16, 100, heuristic).unwrap();
    let index = HnswIndex::new(
        config,
        vectors,
        SquaredEuclideanDistance,
        InvLogLevelGenerator::with_seed(16, 42),
    )
    .unwrap();
    for docid in 0..count as u32 {
        index.add_document(docid).unwrap();
    }
    index
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("hnsw_insert");

    // Insert is slow (O(n log n)), so use fewer samples
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    for num_vectors in [100, 500, 1000] {
        let vectors = Arc::new(random_vectors(num_vectors, 128, 1000 + num_vectors as u64));
        for (name, heuristic) in [("heuristic", true), ("simple", false)] {
            group.bench_with_input(
                BenchmarkId::new(name, num_vectors),
                &num_vectors,
                |b, _| b.iter(|| black_box(build(Arc::clone(&vectors), num_vectors, heuristic).len())),
            );
        }
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    // Build index once
    let vectors = Arc::new(random_vectors(5000, 128, 4242));
    let index = build(Arc::clone(&vectors), 5000, true);

    let mut group = c.benchmark_group("hnsw_search");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(3));

    for ef in [20, 50, 100] {
        let query = random_vectors(1, 128, ef as u64 + 5000).remove(0);
        group.bench_with_input(BenchmarkId::from_parameter(ef), &ef, |b, &ef| {
            b.iter(|| black_box(index.find_top_k(&query, 10, ef)))
        });
    }

    group.finish();
}

/// Search latency while a writer keeps inserting and removing documents.
fn bench_search_under_writes(c: &mut Criterion) {
    // Docids 5000.. stay free for the writer to churn through.
    let vectors = Arc::new(random_vectors(6000, 64, 77));
    let index = Arc::new(build(vectors, 5000, true));
    let query = random_vectors(1, 64, 9).remove(0);

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let index = Arc::clone(&index);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(3);
            let mut docid = 5000u32;
            while !stop.load(Ordering::Relaxed) {
                let _ = index.add_document(docid);
                let victim = rng.gen_range(0..docid);
                let _ = index.remove_document(victim);
                docid = if docid + 1 >= 6000 { 5000 } else { docid + 1 };
            }
        })
    };

    c.bench_function("hnsw_search_under_writes", |b| {
        b.iter(|| black_box(index.find_top_k(&query, 10, 50)))
    });

    stop.store(true, Ordering::Relaxed);
    let _ = writer.join();
}

criterion_group!(benches, bench_insert, bench_search, bench_search_under_writes);
criterion_main!(benches);
