//! Skein: approximate nearest-neighbor search over an in-memory HNSW graph
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  skein CLI (build/query/recall)             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │             dataset: JSON vectors · ground truth            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              skein-core: HNSW graph engine                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod dataset;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub use skein_core::*;

/// Distance metric selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Euclidean,
    Angular,
    InnerProduct,
}

impl Metric {
    pub fn distance_function(self) -> Arc<dyn DistanceFunction> {
        match self {
            Metric::Euclidean => Arc::new(SquaredEuclideanDistance),
            Metric::Angular => Arc::new(AngularDistance),
            Metric::InnerProduct => Arc::new(InnerProductDistance),
        }
    }

    /// Bring a vector into the form the metric expects. Inner product is
    /// only a distance for unit vectors.
    pub fn prepare(self, vector: Vec<f32>) -> Vec<f32> {
        match self {
            Metric::InnerProduct => l2_normalized(&vector),
            _ => vector,
        }
    }
}

/// Build an index over every vector in `vectors`, docid = position.
///
/// Vectors must already be [prepared](Metric::prepare) for `metric`.
pub fn build_index(
    vectors: Arc<Vec<Vec<f32>>>,
    config: HnswConfig,
    metric: Metric,
    seed: u64,
) -> Result<HnswIndex> {
    let count = vectors.len();
    let level_generator =
        InvLogLevelGenerator::with_seed(config.max_links_at_hierarchic_levels, seed);
    let index = HnswIndex::new(
        config,
        Arc::clone(&vectors),
        metric.distance_function(),
        level_generator,
    )?;

    let start = Instant::now();
    for docid in 0..count as u32 {
        index.add_document(docid)?;
        if (docid + 1) % 10_000 == 0 {
            tracing::info!("Indexed {}/{} vectors", docid + 1, count);
        }
    }
    tracing::info!(
        "Built index over {} vectors in {:.2}s",
        count,
        start.elapsed().as_secs_f64()
    );
    Ok(index)
}
