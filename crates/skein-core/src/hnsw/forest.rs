//! Spanning forest over the links of each level.
//!
//! Every node joining a level is attached to one node already on it, and
//! the link between the two is pinned: overflow pruning only ever drops
//! links outside the forest. A level that has only seen inserts is
//! therefore one tree, and every node on it can be reached from any other.
//!
//! ```text
//!   level 0 links        forest (pinned)
//!   a ── b ── c          a ── b ── c
//!   │ ╲  │               │
//!   d ── e               d ── e
//! ```
//!
//! Removing a node splits its tree; the writer stitches the pieces back
//! together through links that survive the removal.

use std::collections::{HashMap, HashSet, VecDeque};

/// Writer-side record of the pinned links, per level.
#[derive(Debug, Default)]
pub(crate) struct SpanningForest {
    edges: HashMap<(u32, u32), Vec<u32>>,
}

impl SpanningForest {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Pinned neighbors of `docid` at `level`.
    pub(crate) fn links(&self, level: u32, docid: u32) -> &[u32] {
        self.edges
            .get(&(level, docid))
            .map_or(&[], |links| links.as_slice())
    }

    #[inline]
    pub(crate) fn is_pinned(&self, level: u32, docid: u32, neighbor: u32) -> bool {
        self.links(level, docid).contains(&neighbor)
    }

    #[inline]
    fn has_room(&self, level: u32, docid: u32, max_links: usize) -> bool {
        self.links(level, docid).len() < max_links
    }

    /// Node a newcomer at `level` should hang off.
    ///
    /// Takes the first of `nearest` (closest first) with fewer than
    /// `max_links` pinned links. If all of them are full, walks the forest
    /// outwards from the closest one. `None` only when `nearest` is empty or
    /// `max_links` leaves no room anywhere in that tree.
    pub(crate) fn choose_parent(&self, level: u32, nearest: &[u32], max_links: usize) -> Option<u32> {
        if let Some(&docid) = nearest
            .iter()
            .find(|&&docid| self.has_room(level, docid, max_links))
        {
            return Some(docid);
        }
        let &start = nearest.first()?;
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(docid) = queue.pop_front() {
            if self.has_room(level, docid, max_links) {
                return Some(docid);
            }
            for &neighbor in self.links(level, docid) {
                if seen.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        None
    }

    /// Pin the link `docid` <-> `parent` at `level`.
    pub(crate) fn attach(&mut self, level: u32, docid: u32, parent: u32) {
        self.edges.entry((level, docid)).or_default().push(parent);
        self.edges.entry((level, parent)).or_default().push(docid);
    }

    /// Unpin every link of `docid` at `level`, returning its former
    /// forest neighbors. Each of them now roots a separate tree.
    pub(crate) fn detach(&mut self, level: u32, docid: u32) -> Vec<u32> {
        let links = self.edges.remove(&(level, docid)).unwrap_or_default();
        for &neighbor in &links {
            if let Some(back) = self.edges.get_mut(&(level, neighbor)) {
                back.retain(|&d| d != docid);
            }
        }
        links
    }

    /// Join the trees rooted at `orphans` wherever `linked(a, b)` reports a
    /// graph link between two of them and both ends have room.
    ///
    /// Returns the orphans that could not be joined.
    pub(crate) fn stitch<F>(
        &mut self,
        level: u32,
        orphans: &[u32],
        max_links: usize,
        linked: F,
    ) -> Vec<u32>
    where
        F: Fn(u32, u32) -> bool,
    {
        let Some((&first, rest)) = orphans.split_first() else {
            return Vec::new();
        };
        let mut joined = vec![first];
        let mut pending = rest.to_vec();
        let mut progress = true;
        while progress && !pending.is_empty() {
            progress = false;
            let mut i = 0;
            while i < pending.len() {
                let orphan = pending[i];
                let partner = if self.has_room(level, orphan, max_links) {
                    joined.iter().copied().find(|&other| {
                        self.has_room(level, other, max_links) && linked(orphan, other)
                    })
                } else {
                    None
                };
                match partner {
                    Some(other) => {
                        self.attach(level, orphan, other);
                        joined.push(orphan);
                        pending.swap_remove(i);
                        progress = true;
                    }
                    None => i += 1,
                }
            }
        }
        pending
    }
}
