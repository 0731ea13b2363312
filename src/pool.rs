//! The item pool (component C3).
//!
//! A fixed array of `K` `(key, value)` byte records, addressed by integer
//! index and independent of the probe array. Keys and values are stored in
//! separate byte arenas so each is independently addressable regardless of
//! `key_size`/`value_size`, giving the same addressing guarantee as a
//! manually unioned record layout without the offset arithmetic.

use crate::error::CacheError;

pub(crate) struct ItemPool {
    keys: Vec<u8>,
    values: Vec<u8>,
    key_size: usize,
    value_size: usize,
    capacity: usize,
}

impl ItemPool {
    pub(crate) fn new(capacity: usize, key_size: usize, value_size: usize) -> Result<Self, CacheError> {
        let mut keys = Vec::new();
        let key_bytes = capacity * key_size;
        keys.try_reserve_exact(key_bytes)
            .map_err(|_| CacheError::AllocationFailed { requested_bytes: key_bytes })?;
        keys.resize(key_bytes, 0u8);

        let mut values = Vec::new();
        let value_bytes = capacity * value_size;
        values.try_reserve_exact(value_bytes).map_err(|_| {
            CacheError::AllocationFailed { requested_bytes: value_bytes }
        })?;
        values.resize(value_bytes, 0u8);

        Ok(Self { keys, values, key_size, value_size, capacity })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn key(&self, index: u32) -> &[u8] {
        let start = index as usize * self.key_size;
        &self.keys[start..start + self.key_size]
    }

    #[inline]
    pub(crate) fn value(&self, index: u32) -> &[u8] {
        let start = index as usize * self.value_size;
        &self.values[start..start + self.value_size]
    }

    #[inline]
    pub(crate) fn value_mut(&mut self, index: u32) -> &mut [u8] {
        let start = index as usize * self.value_size;
        &mut self.values[start..start + self.value_size]
    }

    /// Copies `key` and `value` into the record at `index`.
    pub(crate) fn write(&mut self, index: u32, key: &[u8], value: &[u8]) {
        debug_assert_eq!(key.len(), self.key_size);
        debug_assert_eq!(value.len(), self.value_size);
        let kstart = index as usize * self.key_size;
        self.keys[kstart..kstart + self.key_size].copy_from_slice(key);
        let vstart = index as usize * self.value_size;
        self.values[vstart..vstart + self.value_size].copy_from_slice(value);
    }

    pub(crate) fn clear_all(&mut self) {
        self.keys.iter_mut().for_each(|b| *b = 0);
        self.values.iter_mut().for_each(|b| *b = 0);
    }
}
