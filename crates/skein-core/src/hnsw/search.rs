//! Layer search primitives and k-NN queries.
//!
//! Everything here runs on reader threads as well as on the writer and
//! takes no locks. Readers pin a generation for the whole query so the
//! link arrays they walk stay alive.

use super::candidate::{FurthestPriQ, HnswCandidate, NearestPriQ, Neighbor};
use super::index::HnswIndex;
use super::visited::VisitedGuard;

/// Attempts of a reader search whose path was removed under it.
const MAX_SEARCH_ATTEMPTS: usize = 3;

/// Predicate over docids deciding which nodes may be returned.
pub type DocFilter<'a> = &'a dyn Fn(u32) -> bool;

impl HnswIndex {
    /// Greedy single-candidate descent within `level`.
    ///
    /// Moves to a strictly closer neighbor until none improves on the
    /// current best. Returns a local optimum.
    pub(crate) fn find_nearest_in_layer(
        &self,
        query: &[f32],
        entry: HnswCandidate,
        level: u32,
    ) -> HnswCandidate {
        let mut best = entry;
        loop {
            let Some(links) = self.nodes.get_link_array(best.docid, level) else {
                return best;
            };
            let mut improved = false;
            for &neighbor in links.iter() {
                if !self.nodes.contains(neighbor) {
                    continue;
                }
                let distance = self.distance_to_doc(query, neighbor);
                if distance < best.distance {
                    best = HnswCandidate::new(neighbor, distance);
                    improved = true;
                }
            }
            if !improved {
                return best;
            }
        }
    }

    /// Beam search within `level`, starting from `seeds`.
    ///
    /// Returns up to `neighbors_to_find` of the nearest nodes discovered.
    /// Nodes rejected by `filter` still guide the traversal but are never
    /// retained in the result.
    pub(crate) fn search_layer(
        &self,
        query: &[f32],
        neighbors_to_find: usize,
        seeds: &[HnswCandidate],
        level: u32,
        filter: Option<DocFilter<'_>>,
    ) -> FurthestPriQ {
        let accept = |docid: u32| filter.map_or(true, |f| f(docid));
        let mut best_neighbors = FurthestPriQ::new();
        if neighbors_to_find == 0 {
            return best_neighbors;
        }

        let mut visited = VisitedGuard::new(self.nodes.size());
        let mut candidates = NearestPriQ::new();
        for seed in seeds {
            if !visited.insert(seed.docid) {
                continue;
            }
            candidates.push(*seed);
            if accept(seed.docid) && self.nodes.contains(seed.docid) {
                best_neighbors.push(*seed);
            }
        }
        while best_neighbors.len() > neighbors_to_find {
            best_neighbors.pop();
        }
        let mut limit_distance = if best_neighbors.len() == neighbors_to_find {
            best_neighbors.top().map_or(f64::INFINITY, |c| c.distance)
        } else {
            f64::INFINITY
        };

        while let Some(nearest) = candidates.top() {
            if nearest.distance > limit_distance {
                break;
            }
            let Some(current) = candidates.pop() else {
                break;
            };
            let Some(links) = self.nodes.get_link_array(current.docid, level) else {
                continue;
            };
            for &neighbor in links.iter() {
                if !visited.insert(neighbor) || !self.nodes.contains(neighbor) {
                    continue;
                }
                let distance = self.distance_to_doc(query, neighbor);
                if distance >= limit_distance {
                    continue;
                }
                let candidate = HnswCandidate::new(neighbor, distance);
                candidates.push(candidate);
                if !accept(neighbor) {
                    continue;
                }
                best_neighbors.push(candidate);
                if best_neighbors.len() > neighbors_to_find {
                    best_neighbors.pop();
                }
                if best_neighbors.len() == neighbors_to_find {
                    if let Some(worst) = best_neighbors.top() {
                        limit_distance = worst.distance;
                    }
                }
            }
        }
        best_neighbors
    }

    /// Descend from the entry point to level 0 and run a beam search there.
    ///
    /// A search whose path the writer removed while it ran can come back
    /// empty; it is then restarted from the current entry point. Callers on
    /// reader threads must hold a generation guard.
    pub(crate) fn top_k_candidates(
        &self,
        query: &[f32],
        explore_k: usize,
        filter: Option<DocFilter<'_>>,
    ) -> Vec<HnswCandidate> {
        let mut found = Vec::new();
        for _ in 0..MAX_SEARCH_ATTEMPTS {
            let Some(entry) = self.entry.load() else {
                return Vec::new();
            };
            found = self.search_from_entry(query, entry, explore_k, filter);
            if !found.is_empty() {
                break;
            }
            // An empty unfiltered result on a non-empty graph means the
            // descent ended on a node removed under us.
            let entry_moved = self.entry.load() != Some(entry);
            if !entry_moved && (filter.is_some() || self.is_empty()) {
                break;
            }
        }
        found
    }

    fn search_from_entry(
        &self,
        query: &[f32],
        (entry_docid, entry_level): (u32, u32),
        explore_k: usize,
        filter: Option<DocFilter<'_>>,
    ) -> Vec<HnswCandidate> {
        let mut best = HnswCandidate::new(entry_docid, self.distance_to_doc(query, entry_docid));
        for level in (1..=entry_level).rev() {
            best = self.find_nearest_in_layer(query, best, level);
        }
        self.search_layer(query, explore_k, &[best], 0, filter)
            .drain_sorted()
    }

    /// Approximate `k` nearest neighbors of `query`, nearest first.
    ///
    /// `explore_k` is the beam width at level 0; values below `k` are
    /// raised to `k`.
    ///
    /// # Example
    /// ```
    /// use skein_core::{FixedLevelGenerator, HnswConfig, HnswIndex, SquaredEuclideanDistance};
    ///
    /// let vectors = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![10.0, 10.0]];
    /// let index = HnswIndex::new(
    ///     HnswConfig::default(),
    ///     vectors,
    ///     SquaredEuclideanDistance,
    ///     FixedLevelGenerator::default(),
    /// )
    /// .unwrap();
    /// for docid in 0..3 {
    ///     index.add_document(docid).unwrap();
    /// }
    /// let hits = index.find_top_k(&[1.0, 1.0], 1, 10);
    /// assert_eq!(hits[0].docid, 1);
    /// ```
    pub fn find_top_k(&self, query: &[f32], k: usize, explore_k: usize) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }
        let _guard = self.generation.take_guard();
        self.top_k_candidates(query, explore_k.max(k), None)
            .into_iter()
            .take(k)
            .map(Neighbor::from)
            .collect()
    }

    /// Like [`find_top_k`](Self::find_top_k), returning only docids accepted
    /// by `filter`.
    ///
    /// Rejected nodes are still traversed, so a selective filter does not
    /// cut the graph apart.
    pub fn find_top_k_with_filter<F>(
        &self,
        query: &[f32],
        k: usize,
        explore_k: usize,
        filter: F,
    ) -> Vec<Neighbor>
    where
        F: Fn(u32) -> bool,
    {
        if k == 0 {
            return Vec::new();
        }
        let _guard = self.generation.take_guard();
        self.top_k_candidates(query, explore_k.max(k), Some(&filter))
            .into_iter()
            .take(k)
            .map(Neighbor::from)
            .collect()
    }
}
