//! HNSW index configuration.
//!
//! [`HnswConfig`] is supplied once when an index is constructed and never
//! changes afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{HnswError, Result};

/// Default maximum number of links per node at level 0.
///
/// Level 0 holds every node, so it is usually given twice the link budget
/// of the hierarchic levels.
pub const DEFAULT_MAX_LINKS_AT_LEVEL_0: u32 = 32;

/// Default maximum number of links per node at levels 1 and above.
///
/// Also used to derive the level multiplier `1 / ln(M)` of
/// [`InvLogLevelGenerator`](crate::level_generator::InvLogLevelGenerator).
pub const DEFAULT_MAX_LINKS_AT_HIERARCHIC_LEVELS: u32 = 16;

/// Default beam width while inserting.
pub const DEFAULT_NEIGHBORS_TO_EXPLORE_AT_CONSTRUCTION: u32 = 200;

/// Default neighbor selection policy (diversity heuristic).
pub const DEFAULT_HEURISTIC_SELECT_NEIGHBORS: bool = true;

/// Immutable per-index tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Link budget for level 0.
    pub max_links_at_level_0: u32,
    /// Link budget for every level above 0.
    pub max_links_at_hierarchic_levels: u32,
    /// Beam width of `search_layer` during insertion.
    pub neighbors_to_explore_at_construction: u32,
    /// `true` selects the diversity heuristic, `false` plain top-M.
    pub heuristic_select_neighbors: bool,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            max_links_at_level_0: DEFAULT_MAX_LINKS_AT_LEVEL_0,
            max_links_at_hierarchic_levels: DEFAULT_MAX_LINKS_AT_HIERARCHIC_LEVELS,
            neighbors_to_explore_at_construction: DEFAULT_NEIGHBORS_TO_EXPLORE_AT_CONSTRUCTION,
            heuristic_select_neighbors: DEFAULT_HEURISTIC_SELECT_NEIGHBORS,
        }
    }
}

impl HnswConfig {
    /// Create a validated configuration.
    pub fn new(
        max_links_at_level_0: u32,
        max_links_at_hierarchic_levels: u32,
        neighbors_to_explore_at_construction: u32,
        heuristic_select_neighbors: bool,
    ) -> Result<Self> {
        let config = Self {
            max_links_at_level_0,
            max_links_at_hierarchic_levels,
            neighbors_to_explore_at_construction,
            heuristic_select_neighbors,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations that would make `max_links_for_level`
    /// zero or the construction beam empty.
    pub fn validate(&self) -> Result<()> {
        if self.max_links_at_level_0 == 0 {
            return Err(HnswError::InvalidConfig(
                "max_links_at_level_0 must be > 0".into(),
            ));
        }
        if self.max_links_at_hierarchic_levels == 0 {
            return Err(HnswError::InvalidConfig(
                "max_links_at_hierarchic_levels must be > 0".into(),
            ));
        }
        if self.neighbors_to_explore_at_construction == 0 {
            return Err(HnswError::InvalidConfig(
                "neighbors_to_explore_at_construction must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Maximum number of links a node may hold at `level`.
    #[inline]
    pub fn max_links_for_level(&self, level: u32) -> usize {
        if level == 0 {
            self.max_links_at_level_0 as usize
        } else {
            self.max_links_at_hierarchic_levels as usize
        }
    }
}
