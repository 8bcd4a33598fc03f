//! # Entity Identifiers and Allocators
//!
//! An [`EntityId`] is just a number pair. It says nothing about what the entity
//! *is*; it only guarantees that no two live entities in the same
//! [`IdSpace`](super::space::IdSpace) share it.
//!
//! ## Design: Generational Indices
//!
//! A plain counter never reuses a value, which is simple but burns through the
//! id space in long sessions that spawn and drop many short-lived entities.
//! Reusing freed values naively has the opposite problem:
//!
//! ```text
//! 1. Construct entity #5
//! 2. Somebody remembers saved = 5
//! 3. Entity #5 is dropped, 5 goes back to the pool
//! 4. A new entity receives 5
//! 5. `saved` now silently names the wrong entity
//! ```
//!
//! [`GenerationalAllocator`] pairs each slot index with a **generation**
//! counter that is bumped on every release, so a recycled slot never produces
//! an id equal to one handed out before.
//!
//! ```text
//! EntityId { index: 5, generation: 0 }  ← original
//! EntityId { index: 5, generation: 1 }  ← after recycle
//! ```
//!
//! [`SequentialAllocator`] is the plain counter, kept for deterministic tests
//! and replays where "the third entity is id 3" is a useful property.
//!
//! Both implement [`IdAllocator`], the seam for custom strategies.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of one entity for its lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    /// Slot index. Recycled by allocators that reuse slots.
    pub(crate) index: u32,
    /// Bumped each time the slot is reused.
    pub(crate) generation: u32,
}

impl EntityId {
    /// Build an id from raw parts. Intended for custom [`IdAllocator`]s.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the raw index. Useful for diagnostics, not for general use.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation. Useful for diagnostics.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Errors reported by an [`IdAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdError {
    /// Every identifier the allocator can represent is outstanding or retired.
    Exhausted,
    /// The id was never handed out, or was already released.
    NotAllocated(EntityId),
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdError::Exhausted => write!(f, "entity id space exhausted"),
            IdError::NotAllocated(id) => write!(f, "entity id {id} is not allocated"),
        }
    }
}

impl std::error::Error for IdError {}

// ── Trait ───────────────────────────────────────────────────────────────

/// An identifier allocation strategy.
///
/// Implementations must never return an id that is currently outstanding,
/// and must reject releasing an id they did not hand out (or already took
/// back).
pub trait IdAllocator: Send {
    /// Hand out an id distinct from every outstanding one.
    fn try_allocate(&mut self) -> Result<EntityId, IdError>;

    /// Take `id` back, making it eligible for reuse.
    fn deallocate(&mut self, id: EntityId) -> Result<(), IdError>;

    /// Returns `true` if `id` is currently outstanding.
    fn is_allocated(&self, id: EntityId) -> bool;

    /// Number of outstanding ids.
    fn live_count(&self) -> usize;
}

// ── GenerationalAllocator ───────────────────────────────────────────────

/// Slot allocator with free-list reuse and generation counters.
///
/// ## Memory Layout
///
/// ```text
/// generations: [0, 1, 0, 2, 0]   ← one generation per slot ever allocated
/// free_list:   [1, 3]             ← slots available for reuse
/// len:         5                   ← next fresh index (if free_list is empty)
/// retired:     0                   ← slots whose generation ran out
/// ```
///
/// Allocating pops from `free_list` if possible, otherwise uses `len` and grows.
/// Releasing bumps the generation and pushes the index onto `free_list`,
/// unless the generation is already at `u32::MAX`: that slot is retired so a
/// wrapped generation can never alias an old id.
#[derive(Debug, Default)]
pub struct GenerationalAllocator {
    generations: Vec<u32>,
    /// `true` while the slot is handed out.
    live: Vec<bool>,
    free_list: Vec<u32>,
    len: u32,
    retired: u32,
}

impl GenerationalAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of free (recyclable) slots.
    #[cfg(any(feature = "diagnostics", test))]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns the total number of slots ever allocated.
    #[cfg(any(feature = "diagnostics", test))]
    pub fn total_slots(&self) -> u32 {
        self.len
    }
}

impl IdAllocator for GenerationalAllocator {
    fn try_allocate(&mut self) -> Result<EntityId, IdError> {
        if let Some(index) = self.free_list.pop() {
            // Generation was already bumped on release.
            let slot = index as usize;
            self.live[slot] = true;
            return Ok(EntityId::new(index, self.generations[slot]));
        }
        if self.len == u32::MAX {
            return Err(IdError::Exhausted);
        }
        let index = self.len;
        self.len += 1;
        self.generations.push(0);
        self.live.push(true);
        Ok(EntityId::new(index, 0))
    }

    fn deallocate(&mut self, id: EntityId) -> Result<(), IdError> {
        if !self.is_allocated(id) {
            return Err(IdError::NotAllocated(id));
        }
        let slot = id.index as usize;
        self.live[slot] = false;
        match self.generations[slot].checked_add(1) {
            Some(next) => {
                self.generations[slot] = next;
                self.free_list.push(id.index);
            }
            None => {
                self.retired += 1;
                log::debug!("retiring entity slot {} (generation exhausted)", id.index);
            }
        }
        Ok(())
    }

    fn is_allocated(&self, id: EntityId) -> bool {
        let slot = id.index as usize;
        slot < self.generations.len()
            && self.live[slot]
            && self.generations[slot] == id.generation
    }

    fn live_count(&self) -> usize {
        self.len as usize - self.free_list.len() - self.retired as usize
    }
}

// ── SequentialAllocator ─────────────────────────────────────────────────

/// Monotonic counter. Never reuses a value; generation is always 0.
#[derive(Debug)]
pub struct SequentialAllocator {
    /// Next value to hand out. `None` once `u32::MAX` has been issued.
    next: Option<u32>,
    live: BTreeSet<u32>,
}

impl SequentialAllocator {
    /// Counter whose first id has index `first`.
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: Some(first),
            live: BTreeSet::new(),
        }
    }
}

impl Default for SequentialAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdAllocator for SequentialAllocator {
    fn try_allocate(&mut self) -> Result<EntityId, IdError> {
        let index = self.next.ok_or(IdError::Exhausted)?;
        self.next = index.checked_add(1);
        self.live.insert(index);
        Ok(EntityId::new(index, 0))
    }

    fn deallocate(&mut self, id: EntityId) -> Result<(), IdError> {
        if id.generation != 0 || !self.live.remove(&id.index) {
            return Err(IdError::NotAllocated(id));
        }
        Ok(())
    }

    fn is_allocated(&self, id: EntityId) -> bool {
        id.generation == 0 && self.live.contains(&id.index)
    }

    fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn allocate_sequential_slots() {
        let mut alloc = GenerationalAllocator::new();
        let e0 = alloc.try_allocate().unwrap();
        let e1 = alloc.try_allocate().unwrap();
        assert_eq!(e0, EntityId::new(0, 0));
        assert_eq!(e1, EntityId::new(1, 0));
    }

    #[test]
    fn recycle_bumps_generation() {
        let mut alloc = GenerationalAllocator::new();
        let e0 = alloc.try_allocate().unwrap();
        alloc.deallocate(e0).unwrap();
        let reused = alloc.try_allocate().unwrap();
        assert_eq!(reused.index(), 0); // same slot
        assert_eq!(reused.generation(), 1); // bumped
        assert_ne!(reused, e0);
    }

    #[test]
    fn stale_id_is_not_allocated() {
        let mut alloc = GenerationalAllocator::new();
        let e0 = alloc.try_allocate().unwrap();
        assert!(alloc.is_allocated(e0));
        alloc.deallocate(e0).unwrap();
        assert!(!alloc.is_allocated(e0));
    }

    #[test]
    fn double_release_is_rejected() {
        let mut alloc = GenerationalAllocator::new();
        let e0 = alloc.try_allocate().unwrap();
        assert_eq!(alloc.deallocate(e0), Ok(()));
        assert_eq!(alloc.deallocate(e0), Err(IdError::NotAllocated(e0)));
    }

    #[test]
    fn foreign_id_is_rejected() {
        let mut alloc = GenerationalAllocator::new();
        let bogus = EntityId::new(42, 0);
        assert_eq!(alloc.deallocate(bogus), Err(IdError::NotAllocated(bogus)));
    }

    #[test]
    fn live_ids_stay_distinct_across_churn() {
        let mut alloc = GenerationalAllocator::new();
        let mut live: Vec<EntityId> = (0..64).map(|_| alloc.try_allocate().unwrap()).collect();
        for id in live.drain(..32) {
            alloc.deallocate(id).unwrap();
        }
        for _ in 0..48 {
            live.push(alloc.try_allocate().unwrap());
        }
        let unique: HashSet<_> = live.iter().copied().collect();
        assert_eq!(unique.len(), live.len());
        assert_eq!(alloc.live_count(), live.len());
    }

    #[test]
    fn free_count_and_total_slots() {
        let mut alloc = GenerationalAllocator::new();
        assert_eq!(alloc.free_count(), 0);
        assert_eq!(alloc.total_slots(), 0);

        let e0 = alloc.try_allocate().unwrap();
        let _e1 = alloc.try_allocate().unwrap();
        assert_eq!(alloc.total_slots(), 2);

        alloc.deallocate(e0).unwrap();
        assert_eq!(alloc.total_slots(), 2);
        assert_eq!(alloc.free_count(), 1);
        assert_eq!(alloc.live_count(), 1);
    }

    #[test]
    fn exhausted_generation_retires_slot() {
        let mut alloc = GenerationalAllocator::new();
        let e0 = alloc.try_allocate().unwrap();
        alloc.generations[0] = u32::MAX;
        let old = EntityId::new(e0.index(), u32::MAX);
        alloc.deallocate(old).unwrap();
        assert_eq!(alloc.free_count(), 0);
        assert_eq!(alloc.live_count(), 0);
        // Next allocation must use a fresh slot, not wrap slot 0 back to gen 0.
        assert_eq!(alloc.try_allocate().unwrap(), EntityId::new(1, 0));
    }

    #[test]
    fn sequential_never_reuses() {
        let mut alloc = SequentialAllocator::default();
        let a = alloc.try_allocate().unwrap();
        let b = alloc.try_allocate().unwrap();
        assert_eq!((a.index(), b.index()), (1, 2));
        alloc.deallocate(a).unwrap();
        let c = alloc.try_allocate().unwrap();
        assert_eq!(c.index(), 3);
        assert_eq!(alloc.live_count(), 2);
    }

    #[test]
    fn sequential_exhaustion_is_reported() {
        let mut alloc = SequentialAllocator::starting_at(u32::MAX);
        assert_eq!(alloc.try_allocate().unwrap().index(), u32::MAX);
        assert_eq!(alloc.try_allocate(), Err(IdError::Exhausted));
    }

    #[test]
    fn display_and_debug() {
        let id = EntityId::new(3, 1);
        assert_eq!(id.to_string(), "3v1");
        assert_eq!(format!("{id:?}"), "Entity(3v1)");
    }
}
