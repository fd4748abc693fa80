//! Generational entity handles.
//!
//! An [`EntityId`] packs a slot *index* in its low 32 bits and the slot's
//! *generation* in the high 32 bits. Destroying an entity bumps the slot's
//! generation, so handles captured before the destroy stop resolving. This is
//! what lets a mutation group recorded during a scan detect that its target
//! vanished before the flush.

use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity handle.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    /// Build a handle from a slot index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// Slot index (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// Slot generation (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    alive: bool,
}

/// Hands out [`EntityId`]s and recycles destroyed slots.
///
/// Recycled slots come back in FIFO order so a single hot slot does not burn
/// through its generations.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    slots: Vec<Slot>,
    free: VecDeque<u32>,
    live: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle, reusing a freed slot when one is available.
    pub fn allocate(&mut self) -> EntityId {
        self.live += 1;
        match self.free.pop_front() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.alive = true;
                EntityId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    alive: true,
                });
                EntityId::new(index, 0)
            }
        }
    }

    /// Free the slot behind `id`. Returns `false` when `id` is already stale.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let slot = &mut self.slots[id.index() as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push_back(id.index());
        self.live -= 1;
        true
    }

    /// Whether `id` still names a live entity.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.slots
            .get(id.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == id.generation())
    }

    pub fn alive_count(&self) -> usize {
        self.live
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
