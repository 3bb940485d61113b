//! Skein Core – in-memory HNSW graph with one writer and lock-free readers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HNSW Graph Engine                        │
//! │   Insert · Remove · Greedy Descent · Beam Search · k-NN     │
//! ├─────────────────────────────────────────────────────────────┤
//! │   Node Reference Table · Node Store · Link Store · Entry    │
//! ├─────────────────────────────────────────────────────────────┤
//! │        Generation Handler (deferred reclamation)            │
//! └─────────────────────────────────────────────────────────────┘
//!        ▲                 ▲                      ▲
//!   DocVectorAccess   DistanceFunction   RandomLevelGenerator
//! ```
//!
//! Vectors, the distance metric and the level distribution are supplied by
//! the host through the traits in [`vectors`], [`distance`] and
//! [`level_generator`].

pub mod config;
pub mod distance;
pub mod error;
pub mod generation;
pub mod hnsw;
pub mod level_generator;
pub mod vectors;

pub use config::HnswConfig;
pub use distance::{
    dot_product, l2_distance_squared, l2_normalized, AngularDistance, DistanceFunction,
    InnerProductDistance, SquaredEuclideanDistance,
};
pub use error::{HnswError, Result};
pub use hnsw::{HnswIndex, HnswNode, HnswStats, Neighbor};
pub use level_generator::{FixedLevelGenerator, InvLogLevelGenerator, RandomLevelGenerator};
pub use vectors::DocVectorAccess;
