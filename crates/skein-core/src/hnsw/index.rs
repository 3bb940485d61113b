//! HNSW Index Implementation
//!
//! The writer side of the graph:
//! - Random level assignment (exponential distribution)
//! - Bidirectional linking with re-pruning of overflowing neighbors
//! - Removal with mutual reconnection of the removed node's neighbors
//!
//! # Algorithm Overview
//!
//! **Insert**: Draw a level L, descend greedily from the entry point down to
//! L + 1, then beam search and choose links on every level from
//! min(L, entry level) down to 0. The node is published with all of its
//! link arrays in place; only then do its neighbors link back.
//!
//! **Remove**: From the node's top level down, reconnect its former
//! neighbors to each other, drop their links to the node and clear it.
//!
//! Writer operations serialize on one mutex. Readers never take it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

use super::candidate::HnswCandidate;
use super::entry_point::EntryPoint;
use super::forest::SpanningForest;
use super::node::HnswNode;
use super::select::{select_neighbors_heuristic, select_neighbors_simple, SelectResult};
use super::store::{LinkArray, NodeStore, RetiredList};
use crate::config::HnswConfig;
use crate::distance::DistanceFunction;
use crate::error::{HnswError, Result};
use crate::generation::{Generation, GenerationHandler};
use crate::level_generator::RandomLevelGenerator;
use crate::vectors::DocVectorAccess;

/// State only the writer touches.
struct WriterState {
    level_generator: Box<dyn RandomLevelGenerator>,
    hold: RetiredList,
    forest: SpanningForest,
}

/// HNSW Index
///
/// One writer thread may add and remove documents while any number of
/// reader threads run [`find_top_k`](Self::find_top_k) concurrently.
pub struct HnswIndex {
    vectors: Arc<dyn DocVectorAccess>,
    distance: Arc<dyn DistanceFunction>,
    config: HnswConfig,
    pub(crate) nodes: NodeStore,
    pub(crate) entry: EntryPoint,
    pub(crate) generation: GenerationHandler,
    writer: Mutex<WriterState>,
    node_count: AtomicUsize,
    held_arrays: AtomicUsize,
}

/// Statistics about the HNSW index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HnswStats {
    pub node_count: usize,
    pub max_level: u32,
    /// Number of nodes present on each level, level 0 first
    pub nodes_per_level: Vec<usize>,
    /// Directed links over all nodes and levels
    pub total_links: usize,
    /// Retired arrays waiting for readers to drain
    pub held_arrays: usize,
    pub generation: Generation,
}

/// A link `docid -> neighbor` at `level` without the reverse link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsymmetricLink {
    pub docid: u32,
    pub level: u32,
    pub neighbor: u32,
}

impl HnswIndex {
    /// Create an empty index.
    ///
    /// Fails with [`HnswError::InvalidConfig`] if `config` does not validate.
    pub fn new<V, D, G>(config: HnswConfig, vectors: V, distance: D, level_generator: G) -> Result<Self>
    where
        V: DocVectorAccess + 'static,
        D: DistanceFunction + 'static,
        G: RandomLevelGenerator + 'static,
    {
        config.validate()?;
        Ok(Self {
            vectors: Arc::new(vectors),
            distance: Arc::new(distance),
            config,
            nodes: NodeStore::new(),
            entry: EntryPoint::new(),
            generation: GenerationHandler::new(),
            writer: Mutex::new(WriterState {
                level_generator: Box::new(level_generator),
                hold: RetiredList::new(),
                forest: SpanningForest::new(),
            }),
            node_count: AtomicUsize::new(0),
            held_arrays: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Distance from `query` to the vector of `docid`; infinite when the
    /// vector is missing.
    #[inline]
    pub(crate) fn distance_to_doc(&self, query: &[f32], docid: u32) -> f64 {
        match self.vectors.get_vector(docid) {
            Some(vector) => self.distance.calc(query, vector),
            None => f64::INFINITY,
        }
    }

    #[inline]
    fn distance_between(&self, lhs: u32, rhs: u32) -> f64 {
        match self.vectors.get_vector(lhs) {
            Some(vector) => self.distance_to_doc(vector, rhs),
            None => f64::INFINITY,
        }
    }

    fn select_neighbors(&self, candidates: &[HnswCandidate], max_links: usize) -> SelectResult {
        if self.config.heuristic_select_neighbors {
            select_neighbors_heuristic(candidates, max_links, |a, b| self.distance_between(a, b))
        } else {
            select_neighbors_simple(candidates, max_links)
        }
    }

    /// Insert `docid` into the graph.
    ///
    /// The vector must be available from the vector accessor. The node is
    /// searchable as soon as this returns.
    pub fn add_document(&self, docid: u32) -> Result<()> {
        let mut writer = self.writer.lock();
        let writer = &mut *writer;
        if self.nodes.contains(docid) {
            return Err(HnswError::DocumentAlreadyPresent(docid));
        }
        let query = self
            .vectors
            .get_vector(docid)
            .ok_or(HnswError::MissingVector(docid))?;
        let level = writer.level_generator.max_level();
        let entry = self.entry.load();

        let mut levels = vec![LinkArray::new(); level as usize + 1];
        if let Some((entry_docid, entry_level)) = entry {
            let mut best =
                HnswCandidate::new(entry_docid, self.distance_to_doc(query, entry_docid));
            for search_level in (level + 1..=entry_level).rev() {
                best = self.find_nearest_in_layer(query, best, search_level);
            }

            let explore = self.config.neighbors_to_explore_at_construction as usize;
            let mut seeds = vec![best];
            for search_level in (0..=level.min(entry_level)).rev() {
                let found: Vec<HnswCandidate> = self
                    .search_layer(query, explore, &seeds, search_level, None)
                    .drain_sorted();
                levels[search_level as usize] =
                    self.choose_links(docid, &found, search_level, &mut writer.forest);
                if !found.is_empty() {
                    seeds = found;
                }
            }
        }

        self.nodes
            .make_node_for_document(docid, levels.clone(), &mut writer.hold);
        self.node_count.fetch_add(1, Ordering::Relaxed);
        for (link_level, links) in levels.iter().enumerate().rev() {
            self.connect_new_node(docid, links, link_level as u32, writer);
        }

        match entry {
            None => {
                self.entry.store(docid, level);
                debug!(docid, level, "first node becomes entry point");
            }
            Some((_, entry_level)) if level > entry_level => {
                self.entry.store(docid, level);
                debug!(docid, level, previous_level = entry_level, "entry point raised");
            }
            Some(_) => {}
        }
        trace!(docid, level, "document added");
        self.commit_locked(writer);
        Ok(())
    }

    /// Links of a new node at `level`, chosen from `found` (nearest first).
    ///
    /// One link is pinned in the spanning forest, to the nearest candidate
    /// with pinned-link room. Selection keeps that candidate anyway when it
    /// is the nearest; otherwise it goes ahead of the selected links.
    fn choose_links(
        &self,
        docid: u32,
        found: &[HnswCandidate],
        level: u32,
        forest: &mut SpanningForest,
    ) -> LinkArray {
        let max_links = self.config.max_links_for_level(level);
        let nearest: Vec<u32> = found.iter().map(|c| c.docid).collect();
        let parent = forest.choose_parent(level, &nearest, max_links);

        let links: LinkArray = match parent {
            Some(parent) if nearest.first() != Some(&parent) => {
                let rest: Vec<HnswCandidate> =
                    found.iter().copied().filter(|c| c.docid != parent).collect();
                let selected = self.select_neighbors(&rest, max_links - 1);
                let mut links = vec![parent];
                links.extend(selected.used.iter().map(|c| c.docid));
                links
            }
            _ => {
                let selected = self.select_neighbors(found, max_links);
                selected.used.iter().map(|c| c.docid).collect()
            }
        };
        match parent {
            Some(parent) => forest.attach(level, docid, parent),
            None if !found.is_empty() => {
                debug!(docid, level, "no room for a pinned link, node may be unreachable");
            }
            None => {}
        }
        links
    }

    /// Make the neighbors `links` of the published node `docid` link back
    /// at `level`, re-pruning any that overflow.
    fn connect_new_node(&self, docid: u32, links: &[u32], level: u32, writer: &mut WriterState) {
        for &neighbor in links {
            self.add_link_to(neighbor, level, docid, &mut writer.hold);
        }
        for &neighbor in links {
            self.shrink_if_needed(neighbor, level, writer);
        }
    }

    fn add_link_to(&self, docid: u32, level: u32, link: u32, hold: &mut RetiredList) {
        let Some(old_links) = self.nodes.get_link_array(docid, level) else {
            return;
        };
        if old_links.contains(&link) {
            return;
        }
        let mut new_links = LinkArray::with_capacity(old_links.len() + 1);
        new_links.extend_from_slice(&old_links);
        new_links.push(link);
        self.nodes.set_link_array(docid, level, new_links, hold);
    }

    fn remove_link_to(&self, docid: u32, level: u32, link: u32, hold: &mut RetiredList) {
        let Some(old_links) = self.nodes.get_link_array(docid, level) else {
            return;
        };
        if !old_links.contains(&link) {
            return;
        }
        let new_links: LinkArray = old_links.iter().copied().filter(|&d| d != link).collect();
        self.nodes.set_link_array(docid, level, new_links, hold);
    }

    /// Re-prune the links of `docid` at `level` if they exceed the budget.
    ///
    /// Pinned links always stay; the selection policy picks from the rest.
    /// Dropped neighbors lose their link back to `docid` as well, so links
    /// stay symmetric.
    fn shrink_if_needed(&self, docid: u32, level: u32, writer: &mut WriterState) {
        let Some(old_links) = self.nodes.get_link_array(docid, level) else {
            return;
        };
        let max_links = self.config.max_links_for_level(level);
        if old_links.len() <= max_links {
            return;
        }
        let (pinned, free): (LinkArray, LinkArray) = old_links
            .iter()
            .copied()
            .partition(|&neighbor| writer.forest.is_pinned(level, docid, neighbor));
        let candidates: Vec<HnswCandidate> = free
            .iter()
            .map(|&neighbor| HnswCandidate::new(neighbor, self.distance_between(docid, neighbor)))
            .collect();
        let selected = self.select_neighbors(&candidates, max_links.saturating_sub(pinned.len()));
        let mut new_links = pinned;
        new_links.extend(selected.used.iter().map(|c| c.docid));
        self.nodes
            .set_link_array(docid, level, new_links, &mut writer.hold);
        for &dropped in &selected.unused {
            self.remove_link_to(dropped, level, docid, &mut writer.hold);
        }
        trace!(docid, level, dropped = selected.unused.len(), "links re-pruned");
    }

    /// Remove `docid` from the graph.
    ///
    /// Its former neighbors are reconnected to each other where they have
    /// spare capacity. If `docid` was the entry point, the remaining node
    /// with the highest level takes over before any link is removed.
    pub fn remove_document(&self, docid: u32) -> Result<()> {
        let mut writer = self.writer.lock();
        let writer = &mut *writer;
        let node = self
            .nodes
            .get(docid)
            .ok_or(HnswError::DocumentNotPresent(docid))?;

        if matches!(self.entry.load(), Some((entry_docid, _)) if entry_docid == docid) {
            match self.find_highest_level_node(docid) {
                Some((new_docid, new_level)) => {
                    self.entry.store(new_docid, new_level);
                    debug!(removed = docid, docid = new_docid, level = new_level, "entry point replaced");
                }
                None => {
                    self.entry.clear();
                    debug!(removed = docid, "last node removed, entry point cleared");
                }
            }
        }

        for level in (0..node.level_count() as u32).rev() {
            let Some(links) = node.links_full(level) else {
                continue;
            };
            self.mutual_reconnect(&links, level, &mut writer.hold);
            for &neighbor in links.iter() {
                self.remove_link_to(neighbor, level, docid, &mut writer.hold);
            }
            self.nodes
                .set_link_array(docid, level, LinkArray::new(), &mut writer.hold);

            let orphans = writer.forest.detach(level, docid);
            let max_links = self.config.max_links_for_level(level);
            let unjoined = writer.forest.stitch(level, &orphans, max_links, |a, b| {
                self.nodes
                    .get_link_array(a, level)
                    .is_some_and(|links| links.contains(&b))
            });
            if !unjoined.is_empty() {
                debug!(docid, level, trees = unjoined.len() + 1, "removal split the level");
            }
        }
        self.nodes.remove_node(docid, &mut writer.hold);
        self.node_count.fetch_sub(1, Ordering::Relaxed);
        debug!(docid, levels = node.level_count(), "document removed");
        self.commit_locked(writer);
        Ok(())
    }

    /// Link pairs from `cluster` to each other, closest pairs first, while
    /// both ends have room below the link budget.
    fn mutual_reconnect(&self, cluster: &[u32], level: u32, hold: &mut RetiredList) {
        let mut pairs: Vec<(u32, u32, f64)> = Vec::new();
        for (i, &first) in cluster.iter().enumerate() {
            let Some(first_links) = self.nodes.get_link_array(first, level) else {
                continue;
            };
            for &second in &cluster[i + 1..] {
                if first_links.contains(&second) {
                    continue;
                }
                pairs.push((first, second, self.distance_between(first, second)));
            }
        }
        pairs.sort_by(|a, b| a.2.total_cmp(&b.2));

        let max_links = self.config.max_links_for_level(level);
        let has_room = |docid: u32| {
            self.nodes
                .get_link_array(docid, level)
                .is_some_and(|links| links.len() < max_links)
        };
        for (first, second, _) in pairs {
            if !has_room(first) || !has_room(second) {
                continue;
            }
            self.add_link_to(first, level, second, hold);
            self.add_link_to(second, level, first, hold);
        }
    }

    /// Present node with the most levels, lowest docid on ties.
    fn find_highest_level_node(&self, excluding: u32) -> Option<(u32, u32)> {
        let mut best: Option<(u32, u32)> = None;
        self.nodes.for_each_node(|docid, node| {
            if docid == excluding {
                return;
            }
            let level = node.level_count() as u32 - 1;
            if best.map_or(true, |(_, best_level)| level > best_level) {
                best = Some((docid, level));
            }
        });
        best
    }

    /// Start a new generation and drop retired arrays no reader can reach.
    ///
    /// Every writer operation commits on its way out; calling this again is
    /// harmless and lets memory held for long-running readers go once they
    /// finish.
    pub fn commit(&self) {
        let mut writer = self.writer.lock();
        self.commit_locked(&mut writer);
    }

    fn commit_locked(&self, writer: &mut WriterState) {
        writer.hold.transfer(self.generation.current_generation());
        self.generation.inc_generation();
        let oldest_used = self.generation.oldest_used_generation();
        let dropped = writer.hold.trim(oldest_used);
        self.held_arrays
            .store(writer.hold.held_count(), Ordering::Relaxed);
        if dropped > 0 {
            trace!(dropped, oldest_used, "retired arrays released");
        }
    }

    pub fn get_entry_docid(&self) -> Option<u32> {
        self.entry.load().map(|(docid, _)| docid)
    }

    pub fn get_entry_level(&self) -> Option<u32> {
        self.entry.load().map(|(_, level)| level)
    }

    /// Link arrays of `docid`, one per level, level 0 first.
    pub fn get_level_array(&self, docid: u32) -> Option<Vec<Arc<LinkArray>>> {
        self.nodes.get_level_array(docid)
    }

    pub fn get_link_array(&self, docid: u32, level: u32) -> Option<Arc<LinkArray>> {
        self.nodes.get_link_array(docid, level)
    }

    /// Owned copy of the node for `docid`.
    pub fn get_node(&self, docid: u32) -> Option<HnswNode> {
        let levels = self.nodes.get_level_array(docid)?;
        Some(HnswNode::new(
            docid,
            levels.iter().map(|links| links.to_vec()).collect(),
        ))
    }

    /// Every link whose target does not link back at the same level.
    ///
    /// Empty whenever no writer operation is in flight.
    pub fn check_link_symmetry(&self) -> Vec<AsymmetricLink> {
        let mut asymmetric = Vec::new();
        self.nodes.for_each_node(|docid, node| {
            for level in 0..node.level_count() as u32 {
                let Some(links) = node.links(level) else {
                    continue;
                };
                for &neighbor in links.iter() {
                    let links_back = self
                        .nodes
                        .get_link_array(neighbor, level)
                        .is_some_and(|back| back.contains(&docid));
                    if !links_back {
                        asymmetric.push(AsymmetricLink {
                            docid,
                            level,
                            neighbor,
                        });
                    }
                }
            }
        });
        asymmetric
    }

    /// Get statistics about the index
    pub fn stats(&self) -> HnswStats {
        let mut nodes_per_level: Vec<usize> = Vec::new();
        let mut total_links = 0;
        self.nodes.for_each_node(|_, node| {
            if nodes_per_level.len() < node.level_count() {
                nodes_per_level.resize(node.level_count(), 0);
            }
            for level in 0..node.level_count() {
                nodes_per_level[level] += 1;
                total_links += node.links(level as u32).map_or(0, |links| links.len());
            }
        });
        HnswStats {
            node_count: self.len(),
            max_level: self.get_entry_level().unwrap_or(0),
            nodes_per_level,
            total_links,
            held_arrays: self.held_arrays.load(Ordering::Relaxed),
            generation: self.generation.current_generation(),
        }
    }

    pub fn len(&self) -> usize {
        self.node_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, docid: u32) -> bool {
        self.nodes.contains(docid)
    }
}
