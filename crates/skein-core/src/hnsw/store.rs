//! Node store, link store and node reference table.
//!
//! ```text
//! NodeRefTable            Node (level array)          LinkArray
//! ┌──────────┐           ┌────────────────┐          ┌───────────┐
//! │ docid 0 ─┼─────────▶ │ level 0 ───────┼────────▶ │ [3, 9, 4] │
//! │ docid 1  │ (empty)   │ level 1 ───────┼──┐       └───────────┘
//! │ docid 2 ─┼──▶ ...    └────────────────┘  └─────▶ [9]
//! └──────────┘
//! ```
//!
//! Every arrow is an atomic reference. Published link arrays are never
//! mutated: the writer builds a new array, swaps it in with release
//! ordering and retires the old one into a hold list. A reader that loaded
//! the old reference keeps a complete array alive until it lets go.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption, Guard};

use crate::generation::HoldList;

/// Neighbor docids of one node at one level, in insertion order.
pub type LinkArray = Vec<u32>;

/// Storage retired by the writer, waiting for readers to drain.
///
/// Payloads are never read again; dropping the entry releases them.
pub(crate) enum Retired {
    Links { _links: Arc<LinkArray> },
    Node { _node: Arc<Node> },
    Table { _table: Arc<Vec<NodeSlot>> },
}

pub(crate) type RetiredList = HoldList<Retired>;

type NodeSlot = ArcSwapOption<Node>;

/// Level array of one document: one link array reference per level.
pub(crate) struct Node {
    levels: Box<[ArcSwap<LinkArray>]>,
}

impl Node {
    /// A node with `num_levels` empty link arrays. Level 0 always exists.
    #[cfg(test)]
    pub(crate) fn new(num_levels: usize) -> Self {
        Self::with_links(vec![LinkArray::new(); num_levels])
    }

    /// A node holding `links[level]` at each level. Level 0 always exists.
    pub(crate) fn with_links(mut links: Vec<LinkArray>) -> Self {
        if links.is_empty() {
            links.push(LinkArray::new());
        }
        let levels = links.into_iter().map(ArcSwap::from_pointee).collect();
        Self { levels }
    }

    #[inline]
    pub(crate) fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Borrow the link array at `level` without bumping its reference count.
    #[inline]
    pub(crate) fn links(&self, level: u32) -> Option<Guard<Arc<LinkArray>>> {
        self.levels.get(level as usize).map(|slot| slot.load())
    }

    #[inline]
    pub(crate) fn links_full(&self, level: u32) -> Option<Arc<LinkArray>> {
        self.levels.get(level as usize).map(|slot| slot.load_full())
    }

    /// Current link array of every level, level 0 first.
    pub(crate) fn level_arrays(&self) -> Vec<Arc<LinkArray>> {
        self.levels.iter().map(|slot| slot.load_full()).collect()
    }

    fn swap_links(&self, level: u32, links: Arc<LinkArray>) -> Option<Arc<LinkArray>> {
        self.levels.get(level as usize).map(|slot| slot.swap(links))
    }
}

/// Growable docid -> node mapping with lock-free lookups.
///
/// Growing copies the slot references into a larger table and publishes it
/// with one swap; the previous table is retired like any other array.
pub(crate) struct NodeStore {
    slots: ArcSwap<Vec<NodeSlot>>,
}

const INITIAL_TABLE_SIZE: usize = 16;

impl NodeStore {
    pub(crate) fn new() -> Self {
        Self {
            slots: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Current table size, an upper bound on present docids.
    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.slots.load().len()
    }

    #[inline]
    pub(crate) fn get(&self, docid: u32) -> Option<Arc<Node>> {
        self.slots.load().get(docid as usize)?.load_full()
    }

    #[inline]
    pub(crate) fn contains(&self, docid: u32) -> bool {
        self.slots
            .load()
            .get(docid as usize)
            .map(|slot| slot.load().is_some())
            .unwrap_or(false)
    }

    /// Link array of `docid` at `level`, if the node exists and has that level.
    #[inline]
    pub(crate) fn get_link_array(&self, docid: u32, level: u32) -> Option<Arc<LinkArray>> {
        self.get(docid)?.links_full(level)
    }

    /// Level array of `docid`: one link array per level it was inserted at.
    pub(crate) fn get_level_array(&self, docid: u32) -> Option<Vec<Arc<LinkArray>>> {
        self.get(docid).map(|node| node.level_arrays())
    }

    /// Publish a node for `docid` whose level `l` links are `links[l]`.
    ///
    /// Readers never see the node before every level array is filled in.
    pub(crate) fn make_node_for_document(
        &self,
        docid: u32,
        links: Vec<LinkArray>,
        hold: &mut RetiredList,
    ) -> Arc<Node> {
        let node = Arc::new(Node::with_links(links));
        self.set_node(docid, Some(Arc::clone(&node)), hold);
        node
    }

    /// Clear the table entry of `docid`, retiring its node.
    pub(crate) fn remove_node(&self, docid: u32, hold: &mut RetiredList) {
        self.set_node(docid, None, hold);
    }

    /// Publish `node` as the level array of `docid`, or clear it with `None`.
    fn set_node(&self, docid: u32, node: Option<Arc<Node>>, hold: &mut RetiredList) {
        if node.is_some() {
            self.ensure_size(docid as usize + 1, hold);
        }
        let slots = self.slots.load();
        if let Some(slot) = slots.get(docid as usize) {
            if let Some(previous) = slot.swap(node) {
                hold.hold(Retired::Node { _node: previous });
            }
        }
    }

    /// Replace the link array of `docid` at `level`. Returns `false` if the
    /// node is absent or lacks that level.
    pub(crate) fn set_link_array(
        &self,
        docid: u32,
        level: u32,
        links: LinkArray,
        hold: &mut RetiredList,
    ) -> bool {
        let Some(node) = self.get(docid) else {
            return false;
        };
        match node.swap_links(level, Arc::new(links)) {
            Some(previous) => {
                hold.hold(Retired::Links { _links: previous });
                true
            }
            None => false,
        }
    }

    /// Visit every present node in docid order.
    pub(crate) fn for_each_node(&self, mut f: impl FnMut(u32, &Node)) {
        let slots = self.slots.load();
        for (docid, slot) in slots.iter().enumerate() {
            let guard = slot.load();
            if let Some(node) = &*guard {
                f(docid as u32, node);
            }
        }
    }

    fn ensure_size(&self, wanted: usize, hold: &mut RetiredList) {
        let current = self.slots.load_full();
        if wanted <= current.len() {
            return;
        }
        let new_len = wanted
            .checked_next_power_of_two()
            .unwrap_or(wanted)
            .max(INITIAL_TABLE_SIZE);
        let mut grown: Vec<NodeSlot> = Vec::with_capacity(new_len);
        grown.extend(current.iter().map(|slot| ArcSwapOption::new(slot.load_full())));
        grown.resize_with(new_len, ArcSwapOption::empty);
        let previous = self.slots.swap(Arc::new(grown));
        hold.hold(Retired::Table { _table: previous });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_has_at_least_level_zero() {
        let node = Node::new(0);
        assert_eq!(node.level_count(), 1);
        assert!(node.links(0).is_some());
        assert!(node.links(1).is_none());
    }

    #[test]
    fn test_set_and_get_link_array() {
        let store = NodeStore::new();
        let mut hold = RetiredList::new();
        store.make_node_for_document(3, vec![vec![], vec![]], &mut hold);

        assert!(store.set_link_array(3, 1, vec![7, 8], &mut hold));
        assert_eq!(store.get_link_array(3, 1).as_deref(), Some(&vec![7, 8]));
        assert_eq!(store.get_link_array(3, 0).as_deref(), Some(&vec![]));
        assert!(!store.set_link_array(3, 2, vec![1], &mut hold));
        assert!(!store.set_link_array(4, 0, vec![1], &mut hold));
    }

    #[test]
    fn test_old_link_array_stays_intact_for_reader() {
        let store = NodeStore::new();
        let mut hold = RetiredList::new();
        store.set_node(0, Some(Arc::new(Node::new(1))), &mut hold);
        store.set_link_array(0, 0, vec![1, 2, 3], &mut hold);

        let reader_view = store.get_link_array(0, 0).unwrap();
        store.set_link_array(0, 0, vec![9], &mut hold);

        assert_eq!(*reader_view, vec![1, 2, 3]);
        assert_eq!(*store.get_link_array(0, 0).unwrap(), vec![9]);
    }

    #[test]
    fn test_table_grows_and_keeps_existing_nodes() {
        let store = NodeStore::new();
        let mut hold = RetiredList::new();
        store.set_node(1, Some(Arc::new(Node::new(1))), &mut hold);
        store.set_link_array(1, 0, vec![5], &mut hold);
        let before = store.size();

        store.set_node(1000, Some(Arc::new(Node::new(3))), &mut hold);
        assert!(store.size() > before);
        assert!(store.size() >= 1001);
        assert_eq!(*store.get_link_array(1, 0).unwrap(), vec![5]);
        assert_eq!(store.get(1000).unwrap().level_count(), 3);
        assert_eq!(store.get_level_array(1000).map(|levels| levels.len()), Some(3));
    }

    #[test]
    fn test_clear_node() {
        let store = NodeStore::new();
        let mut hold = RetiredList::new();
        let node = store.make_node_for_document(2, vec![vec![4, 6]], &mut hold);
        assert!(store.contains(2));
        assert_eq!(*store.get_link_array(2, 0).unwrap(), vec![4, 6]);
        assert_eq!(node.level_count(), 1);
        store.remove_node(2, &mut hold);
        assert!(!store.contains(2));
        assert!(store.get_link_array(2, 0).is_none());

        let mut seen = Vec::new();
        store.for_each_node(|docid, _| seen.push(docid));
        assert!(seen.is_empty());
    }
}
