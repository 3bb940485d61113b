//! Generation tracking for deferred reclamation.
//!
//! Readers pin the current generation with a [`GenerationGuard`] for the
//! duration of a query. The writer retires superseded arrays into a
//! [`HoldList`] tagged with the generation they were retired in, bumps the
//! generation, and only drops a held array once every guard that could have
//! observed it is gone.
//!
//! ```text
//!  gen 4         gen 5          gen 6
//!  ──┬───────────┬──────────────┬──────────▶
//!    │ retire A  │ inc          │ inc
//!    │ (tag 4)   │ reader R     │ R dropped
//!    │           │ pins gen 5   │ oldest_used = 6  → A dropped
//! ```
//!
//! Taking and dropping a guard is lock-free; readers never free memory
//! themselves.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

pub type Generation = u64;

/// Reader count sentinel marking a hold the writer has already released.
const INVALIDATED: usize = usize::MAX;

struct GenerationHold {
    generation: Generation,
    readers: AtomicUsize,
}

impl GenerationHold {
    fn new(generation: Generation) -> Self {
        Self {
            generation,
            readers: AtomicUsize::new(0),
        }
    }

    fn try_acquire(&self) -> bool {
        let mut current = self.readers.load(Ordering::Acquire);
        loop {
            if current == INVALIDATED {
                return false;
            }
            match self.readers.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self) {
        self.readers.fetch_sub(1, Ordering::AcqRel);
    }

    fn try_invalidate(&self) -> bool {
        self.readers
            .compare_exchange(0, INVALIDATED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Tracks which generations are still in use by readers.
pub struct GenerationHandler {
    current: ArcSwap<GenerationHold>,
    generation: AtomicU64,
    /// Holds of earlier generations, oldest first. Writer-only.
    retired: Mutex<VecDeque<Arc<GenerationHold>>>,
}

impl Default for GenerationHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationHandler {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(GenerationHold::new(0)),
            generation: AtomicU64::new(0),
            retired: Mutex::new(VecDeque::new()),
        }
    }

    /// Pin the current generation until the returned guard is dropped.
    pub fn take_guard(&self) -> GenerationGuard {
        loop {
            let hold = self.current.load_full();
            if hold.try_acquire() {
                return GenerationGuard { hold };
            }
            // The writer released this hold between our load and acquire;
            // a newer one has been published.
            std::hint::spin_loop();
        }
    }

    #[inline]
    pub fn current_generation(&self) -> Generation {
        self.generation.load(Ordering::Acquire)
    }

    /// Start a new generation. Writer-only.
    pub fn inc_generation(&self) {
        let next = self.generation.load(Ordering::Acquire) + 1;
        self.generation.store(next, Ordering::Release);
        let previous = self.current.swap(Arc::new(GenerationHold::new(next)));
        self.retired.lock().push_back(previous);
        self.release_unused_holds();
    }

    /// Oldest generation a live guard may still be reading.
    pub fn oldest_used_generation(&self) -> Generation {
        self.release_unused_holds();
        self.retired
            .lock()
            .front()
            .map(|hold| hold.generation)
            .unwrap_or_else(|| self.current_generation())
    }

    /// Number of guards pinning any generation.
    #[cfg(test)]
    fn guard_count(&self) -> usize {
        let current = self.current.load().readers.load(Ordering::Acquire);
        let retired: usize = self
            .retired
            .lock()
            .iter()
            .map(|hold| hold.readers.load(Ordering::Acquire))
            .filter(|&readers| readers != INVALIDATED)
            .sum();
        current + retired
    }

    fn release_unused_holds(&self) {
        let mut retired = self.retired.lock();
        while let Some(front) = retired.front() {
            if !front.try_invalidate() {
                break;
            }
            retired.pop_front();
        }
    }
}

/// Keeps a generation pinned while alive.
pub struct GenerationGuard {
    hold: Arc<GenerationHold>,
}

impl GenerationGuard {
    #[inline]
    pub fn generation(&self) -> Generation {
        self.hold.generation
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.hold.release();
    }
}

/// Values retired by the writer, dropped once no reader can observe them.
pub struct HoldList<T> {
    pending: Vec<T>,
    held: VecDeque<(Generation, Vec<T>)>,
}

impl<T> Default for HoldList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HoldList<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            held: VecDeque::new(),
        }
    }

    /// Retire a value during the current generation.
    #[inline]
    pub fn hold(&mut self, value: T) {
        self.pending.push(value);
    }

    /// Tag everything retired since the last transfer with `generation`.
    pub fn transfer(&mut self, generation: Generation) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        self.held.push_back((generation, batch));
    }

    /// Drop every batch retired before `oldest_used`. Returns how many values
    /// were dropped.
    pub fn trim(&mut self, oldest_used: Generation) -> usize {
        let mut dropped = 0;
        while let Some((generation, _)) = self.held.front() {
            if *generation >= oldest_used {
                break;
            }
            if let Some((_, batch)) = self.held.pop_front() {
                dropped += batch.len();
            }
        }
        dropped
    }

    /// Values retired but not yet dropped.
    pub fn held_count(&self) -> usize {
        self.pending.len() + self.held.iter().map(|(_, batch)| batch.len()).sum::<usize>()
    }
}
