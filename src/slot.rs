//! The probe-slot array (component C2).
//!
//! Each slot holds a cached hash, an index into the item pool, and an aging
//! counter. `age <= 1` covers both `EMPTY` (0) and `TOMBSTONE` (1) for
//! probe-stop purposes; `age >= 2` is `ALIVE`, with 2 the coldest and 7 the
//! hottest.

use crate::error::CacheError;

pub(crate) const EMPTY: u8 = 0;
pub(crate) const TOMBSTONE: u8 = 1;
pub(crate) const INITIAL_AGE: u8 = 2;
pub(crate) const MAX_AGE: u8 = 7;

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Slot {
    pub(crate) hash: u32,
    pub(crate) item_index: u32,
    pub(crate) age: u8,
}

impl Slot {
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.age <= TOMBSTONE
    }

    #[inline]
    pub(crate) fn is_alive(&self) -> bool {
        self.age >= INITIAL_AGE
    }
}

/// Owns the `M`-entry probe array. `M` is always a power of two.
pub(crate) struct SlotTable {
    slots: Vec<Slot>,
    mask: u32,
}

impl SlotTable {
    pub(crate) fn new(m: u32) -> Result<Self, CacheError> {
        debug_assert!(m.is_power_of_two());
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(m as usize)
            .map_err(|_| CacheError::AllocationFailed {
                requested_bytes: m as usize * std::mem::size_of::<Slot>(),
            })?;
        slots.resize(m as usize, Slot::default());
        Ok(Self { slots, mask: m - 1 })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn home(&self, hash: u32) -> usize {
        (hash & self.mask) as usize
    }

    #[inline]
    pub(crate) fn next(&self, i: usize) -> usize {
        ((i as u32 + 1) & self.mask) as usize
    }

    #[inline]
    pub(crate) fn get(&self, i: usize) -> Slot {
        self.slots[i]
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, slot: Slot) {
        self.slots[i] = slot;
    }

    /// Bumps a slot's age by one, capped at [`MAX_AGE`].
    #[inline]
    pub(crate) fn bump_age(&mut self, i: usize) {
        let slot = &mut self.slots[i];
        if slot.age < MAX_AGE {
            slot.age += 1;
        }
    }

    /// Decays a slot's age by one, clamped so it never drops below
    /// [`INITIAL_AGE`] into the tombstone range.
    #[inline]
    pub(crate) fn decay(&mut self, i: usize) {
        let slot = &mut self.slots[i];
        if slot.age > INITIAL_AGE {
            slot.age -= 1;
        }
    }

    pub(crate) fn clear_all(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::default();
        }
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, Slot)> + '_ {
        self.slots.iter().enumerate().map(|(i, s)| (i, *s))
    }
}
