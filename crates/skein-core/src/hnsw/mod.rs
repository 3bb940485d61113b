//! HNSW (Hierarchical Navigable Small World) Index
//!
//! A multi-layer graph structure for approximate nearest neighbor search,
//! written by one thread and searched by many without locks.
//!
//! # Architecture
//!
//! ```text
//! Level 3: o-----------------------o (few nodes, long-range)
//!          |                       |
//! Level 2: o--------o--------------o (more nodes)
//!          |        |              |
//! Level 1: o---o----o---o----o-----o (even more)
//!          |   |    |   |    |     |
//! Level 0: o-o-o-o--o-o-o-o--o-o-o-o (all nodes)
//! ```
//!
//! Link arrays are immutable once published. The writer replaces them
//! wholesale and retires the old ones until no reader generation can still
//! see them.

mod candidate;
mod entry_point;
mod forest;
mod index;
mod node;
mod search;
mod select;
mod store;
mod visited;

pub use candidate::{HnswCandidate, Neighbor};
pub use index::{AsymmetricLink, HnswIndex, HnswStats};
pub use node::HnswNode;
pub use search::DocFilter;
pub use store::LinkArray;
