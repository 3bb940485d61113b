//! One writer inserting and removing while reader threads search.
//!
//! Readers must never observe a torn link array, a link to a docid outside
//! the data set, or an entry point that breaks a search.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use skein::dataset::random_vectors;
use skein::{HnswConfig, HnswIndex, InvLogLevelGenerator, SquaredEuclideanDistance};

const DIM: usize = 16;
const TOTAL: u32 = 2_000;

fn new_index(vectors: Arc<Vec<Vec<f32>>>) -> Arc<HnswIndex> {
    let index = HnswIndex::new(
        HnswConfig::new(16, 8, 64, true).unwrap(),
        vectors,
        SquaredEuclideanDistance,
        InvLogLevelGenerator::with_seed(8, 5),
    )
    .unwrap();
    Arc::new(index)
}

#[test]
fn test_readers_during_inserts_and_removes() {
    let vectors = Arc::new(random_vectors(TOTAL as usize, DIM, 1));
    let index = new_index(Arc::clone(&vectors));
    for docid in 0..200 {
        index.add_document(docid).unwrap();
    }

    let done = Arc::new(AtomicBool::new(false));
    let searches = Arc::new(AtomicUsize::new(0));

    let readers: Vec<_> = (0..4)
        .map(|reader| {
            let index = Arc::clone(&index);
            let vectors = Arc::clone(&vectors);
            let done = Arc::clone(&done);
            let searches = Arc::clone(&searches);
            thread::spawn(move || {
                let mut i = reader;
                while !done.load(Ordering::Acquire) {
                    let query = &vectors[i % vectors.len()];
                    let hits = index.find_top_k(query, 10, 32);
                    // The graph never empties below the first 100 docids.
                    assert!(!hits.is_empty());
                    assert!(hits.len() <= 10);
                    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
                    for hit in &hits {
                        assert!(hit.docid < TOTAL);
                        assert!(hit.distance.is_finite());
                    }

                    // Link arrays are complete snapshots within budget.
                    let docid = hits[0].docid;
                    if let Some(levels) = index.get_level_array(docid) {
                        for (level, links) in levels.iter().enumerate() {
                            let budget = index.config().max_links_for_level(level as u32);
                            assert!(links.len() <= budget + 1);
                            assert!(links.iter().all(|&n| n < TOTAL && n != docid));
                        }
                    }
                    searches.fetch_add(1, Ordering::Relaxed);
                    i += 7;
                }
            })
        })
        .collect();

    // Writer: grow to TOTAL, removing every fifth docid above 100 as it goes.
    for docid in 200..TOTAL {
        index.add_document(docid).unwrap();
        if docid % 5 == 0 {
            index.remove_document(docid - 100).unwrap();
        }
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    assert!(searches.load(Ordering::Relaxed) > 0);
    let removed = (200..TOTAL).filter(|d| d % 5 == 0).count();
    assert_eq!(index.len(), TOTAL as usize - removed);
    assert!(index.check_link_symmetry().is_empty());

    index.commit();
    assert_eq!(index.stats().held_arrays, 0);
}

#[test]
fn test_readers_get_full_results_during_inserts() {
    let vectors = Arc::new(random_vectors(TOTAL as usize, DIM, 3));
    let index = new_index(Arc::clone(&vectors));
    for docid in 0..200 {
        index.add_document(docid).unwrap();
    }

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|reader| {
            let index = Arc::clone(&index);
            let vectors = Arc::clone(&vectors);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut i = reader * 13;
                let mut searches = 0usize;
                while !done.load(Ordering::Acquire) {
                    // Any docid, inserted yet or not, works as a query.
                    let hits = index.find_top_k(&vectors[i % vectors.len()], 10, 32);
                    assert_eq!(hits.len(), 10, "short result: {:?}", hits);
                    assert!(hits.iter().all(|hit| index.contains(hit.docid)));
                    searches += 1;
                    i += 3;
                }
                searches
            })
        })
        .collect();

    for docid in 200..TOTAL {
        index.add_document(docid).unwrap();
    }
    done.store(true, Ordering::Release);
    let searches: usize = readers.into_iter().map(|r| r.join().unwrap()).sum();
    assert!(searches > 0);
    assert_eq!(index.len(), TOTAL as usize);
}

#[test]
fn test_entry_point_always_usable() {
    let vectors = Arc::new(random_vectors(500, DIM, 2));
    let index = new_index(Arc::clone(&vectors));
    index.add_document(0).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let index = Arc::clone(&index);
        let vectors = Arc::clone(&vectors);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let hits = index.find_top_k(&vectors[0], 1, 16);
                assert!(hits.len() <= 1);
                for hit in hits {
                    assert!(hit.docid < 500);
                    assert!(hit.distance.is_finite());
                }
            }
        })
    };

    // Churn the entry point: insert, then remove whichever node is entry.
    for docid in 1..500 {
        index.add_document(docid).unwrap();
        if docid % 3 == 0 {
            let entry = index.get_entry_docid().unwrap();
            index.remove_document(entry).unwrap();
            assert_ne!(index.get_entry_docid(), Some(entry));
        }
    }
    done.store(true, Ordering::Release);
    reader.join().unwrap();

    let entry_level = index.get_entry_level().unwrap();
    let max_level = index.stats().nodes_per_level.len() as u32 - 1;
    assert_eq!(entry_level, max_level);
}
