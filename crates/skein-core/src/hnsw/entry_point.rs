//! Entry point of the graph, packed into one atomic word.
//!
//! ```text
//! bit 63      bits 32..=62        bits 0..=31
//! ┌────────┬──────────────────┬───────────────┐
//! │present │ level (31 bits)  │ docid         │
//! └────────┴──────────────────┴───────────────┘
//! ```
//!
//! Only the writer stores; readers load with acquire ordering and always see
//! a matching (docid, level) pair.

use std::sync::atomic::{AtomicU64, Ordering};

const PRESENT_BIT: u64 = 1 << 63;
const LEVEL_SHIFT: u64 = 32;
const LEVEL_MASK: u64 = 0x7FFF_FFFF;
const DOCID_MASK: u64 = 0xFFFF_FFFF;

#[inline]
fn pack(docid: u32, level: u32) -> u64 {
    PRESENT_BIT | ((level as u64 & LEVEL_MASK) << LEVEL_SHIFT) | docid as u64
}

#[inline]
fn unpack(packed: u64) -> Option<(u32, u32)> {
    if packed & PRESENT_BIT == 0 {
        return None;
    }
    let level = ((packed >> LEVEL_SHIFT) & LEVEL_MASK) as u32;
    let docid = (packed & DOCID_MASK) as u32;
    Some((docid, level))
}

#[derive(Debug, Default)]
pub(crate) struct EntryPoint {
    packed: AtomicU64,
}

impl EntryPoint {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current `(docid, level)`, or `None` for an empty graph.
    #[inline]
    pub(crate) fn load(&self) -> Option<(u32, u32)> {
        unpack(self.packed.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, docid: u32, level: u32) {
        debug_assert!(level as u64 <= LEVEL_MASK);
        self.packed.store(pack(docid, level), Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        self.packed.store(0, Ordering::Release);
    }
}
