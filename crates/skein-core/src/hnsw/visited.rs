//! Thread-local visited set pool for layer search.
//!
//! Uses an epoch array to avoid O(n) clear cost per search:
//! - `insert(docid)` is a single array read/compare/write
//! - `clear()` increments the epoch instead of zeroing memory

use std::cell::RefCell;

/// Sets kept per thread; a writer and a nested search never need more.
const POOL_SIZE: usize = 4;
const MIN_CAPACITY: usize = 1024;

thread_local! {
    static VISITED_POOL: RefCell<Vec<VisitedSet>> = RefCell::new(Vec::with_capacity(POOL_SIZE));
}

/// Epoch-backed visited marks indexed by docid.
pub(crate) struct VisitedSet {
    epochs: Vec<u32>,
    current_epoch: u32,
}

impl VisitedSet {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            epochs: vec![0; capacity.max(MIN_CAPACITY)],
            current_epoch: 1,
        }
    }

    /// Mark `docid` as visited. Returns `true` if it was not visited before.
    #[inline]
    pub(crate) fn insert(&mut self, docid: u32) -> bool {
        let idx = docid as usize;
        if idx >= self.epochs.len() {
            // Docids past the capacity hint show up when the writer grows the
            // table while this search runs.
            let new_len = (idx + 1).checked_next_power_of_two().unwrap_or(idx + 1);
            self.epochs.resize(new_len, 0);
        }
        if self.epochs[idx] == self.current_epoch {
            false
        } else {
            self.epochs[idx] = self.current_epoch;
            true
        }
    }

    #[cfg(test)]
    fn contains(&self, docid: u32) -> bool {
        self.epochs
            .get(docid as usize)
            .is_some_and(|&epoch| epoch == self.current_epoch)
    }

    fn clear(&mut self) {
        self.current_epoch = self.current_epoch.wrapping_add(1);
        if self.current_epoch == 0 {
            self.epochs.fill(0);
            self.current_epoch = 1;
        }
    }
}

/// A cleared visited set borrowed from the thread-local pool, returned on drop.
pub(crate) struct VisitedGuard {
    set: Option<VisitedSet>,
}

impl VisitedGuard {
    pub(crate) fn new(capacity: usize) -> Self {
        let set = VISITED_POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            let mut set = match pool.iter().position(|s| s.epochs.len() >= capacity) {
                Some(idx) => pool.swap_remove(idx),
                None => VisitedSet::with_capacity(capacity),
            };
            set.clear();
            set
        });
        Self { set: Some(set) }
    }
}

impl Drop for VisitedGuard {
    fn drop(&mut self) {
        if let Some(set) = self.set.take() {
            VISITED_POOL.with(|pool| {
                let mut pool = pool.borrow_mut();
                if pool.len() < POOL_SIZE {
                    pool.push(set);
                }
            });
        }
    }
}

impl std::ops::Deref for VisitedGuard {
    type Target = VisitedSet;

    fn deref(&self) -> &Self::Target {
        self.set.as_ref().expect("visited set missing")
    }
}

impl std::ops::DerefMut for VisitedGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.set.as_mut().expect("visited set missing")
    }
}
