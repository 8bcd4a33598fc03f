//! # IdSpace: One Shared Identifier Space
//!
//! Every entity draws its id from an [`IdSpace`] passed to its constructor and
//! keeps a clone of that handle so it can give the id back on drop. The space
//! therefore lives exactly as long as the last entity (or caller) that holds
//! it.
//!
//! ## Shared Slot
//!
//! Most programs want a single space for everything. [`IdSpace::shared`]
//! returns the process-wide one, creating a generational space the first time
//! it is asked for. [`IdSpace::install_shared`] swaps the slot for a custom
//! strategy (a deterministic counter in tests, for example).
//!
//! ```text
//! SHARED: Mutex<Option<IdSpace>>
//!            │
//!            ├─ shared()         → clone of the slot (created on demand)
//!            └─ install_shared() → replace the slot, return the old one
//! ```
//!
//! Replacing the slot never touches entities that already exist: they hold
//! their own clone of the old space and return their ids there.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::id::{EntityId, GenerationalAllocator, IdAllocator, IdError, SequentialAllocator};

static SHARED: Mutex<Option<IdSpace>> = Mutex::new(None);

/// Which built-in allocator backs a new [`IdSpace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocatorStrategy {
    /// Slot reuse with generation counters.
    #[default]
    Generational,
    /// Monotonic counter beginning at `first`.
    Sequential { first: u32 },
}

/// Cloneable handle to one identifier space.
#[derive(Clone)]
pub struct IdSpace {
    inner: Arc<Mutex<Box<dyn IdAllocator>>>,
}

impl IdSpace {
    /// Wrap a custom allocator.
    pub fn new(allocator: impl IdAllocator + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(allocator))),
        }
    }

    /// A space backed by [`GenerationalAllocator`].
    pub fn generational() -> Self {
        Self::new(GenerationalAllocator::new())
    }

    /// A space backed by [`SequentialAllocator`], first id `first`.
    pub fn sequential(first: u32) -> Self {
        Self::new(SequentialAllocator::starting_at(first))
    }

    pub fn from_strategy(strategy: AllocatorStrategy) -> Self {
        match strategy {
            AllocatorStrategy::Generational => Self::generational(),
            AllocatorStrategy::Sequential { first } => Self::sequential(first),
        }
    }

    /// The process-wide space, created on first use.
    pub fn shared() -> IdSpace {
        let mut slot = SHARED.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| {
            log::debug!("creating shared entity id space");
            IdSpace::default()
        })
        .clone()
    }

    /// Replace the process-wide space. Returns the previous one, if any.
    ///
    /// Entities built from the previous space keep using it.
    pub fn install_shared(space: IdSpace) -> Option<IdSpace> {
        let mut slot = SHARED.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = slot.replace(space);
        if let Some(prev) = &previous {
            let live = prev.live_count();
            if live > 0 {
                log::warn!("replacing shared entity id space with {live} ids still live");
            }
        }
        previous
    }

    /// Hand out a fresh id.
    ///
    /// # Panics
    ///
    /// Panics if the id space is exhausted.
    pub fn allocate(&self) -> EntityId {
        match self.try_allocate() {
            Ok(id) => id,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_allocate(&self) -> Result<EntityId, IdError> {
        self.lock().try_allocate()
    }

    /// Give `id` back to the space.
    pub fn release(&self, id: EntityId) -> Result<(), IdError> {
        self.lock().deallocate(id)
    }

    pub fn is_allocated(&self, id: EntityId) -> bool {
        self.lock().is_allocated(id)
    }

    /// Number of ids currently outstanding.
    pub fn live_count(&self) -> usize {
        self.lock().live_count()
    }

    /// Returns `true` if both handles refer to the same space.
    pub fn ptr_eq(&self, other: &IdSpace) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // A panic elsewhere while holding the lock can't leave the allocator
    // half-updated: every mutation is a single push/pop/insert.
    fn lock(&self) -> MutexGuard<'_, Box<dyn IdAllocator>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for IdSpace {
    fn default() -> Self {
        Self::generational()
    }
}

impl fmt::Debug for IdSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdSpace")
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;

    #[test]
    fn allocate_and_release() {
        let space = IdSpace::generational();
        let a = space.allocate();
        assert!(space.is_allocated(a));
        assert_eq!(space.live_count(), 1);
        space.release(a).unwrap();
        assert!(!space.is_allocated(a));
        assert_eq!(space.release(a), Err(IdError::NotAllocated(a)));
    }

    #[test]
    fn clones_share_one_space() {
        let space = IdSpace::sequential(1);
        let other = space.clone();
        let a = space.allocate();
        let b = other.allocate();
        assert_ne!(a, b);
        assert!(space.ptr_eq(&other));
        assert!(!space.ptr_eq(&IdSpace::sequential(1)));
    }

    #[test]
    fn from_strategy_picks_allocator() {
        let space = IdSpace::from_strategy(AllocatorStrategy::Sequential { first: 10 });
        assert_eq!(space.allocate().index(), 10);
        let space = IdSpace::from_strategy(AllocatorStrategy::Generational);
        assert_eq!(space.allocate().index(), 0);
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn exhaustion_is_fatal() {
        let space = IdSpace::sequential(u32::MAX);
        space.allocate();
        space.allocate();
    }

    #[test]
    fn concurrent_allocation_stays_unique() {
        let space = IdSpace::generational();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let space = space.clone();
                thread::spawn(move || (0..250).map(|_| space.allocate()).collect::<Vec<_>>())
            })
            .collect();
        let mut all = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 1000);
        assert_eq!(space.live_count(), 1000);
    }

    // The only test that touches the process-wide slot.
    #[test]
    fn shared_slot_is_lazy_and_replaceable() {
        let first = IdSpace::shared();
        assert!(first.ptr_eq(&IdSpace::shared()));
        let early = first.allocate();

        let custom = IdSpace::sequential(100);
        let previous = IdSpace::install_shared(custom.clone());
        assert!(previous.is_some_and(|p| p.ptr_eq(&first)));
        assert!(IdSpace::shared().ptr_eq(&custom));
        assert_eq!(IdSpace::shared().allocate().index(), 100);

        // Ids issued before the swap still belong to the old space.
        assert!(first.is_allocated(early));
        first.release(early).unwrap();
    }
}
