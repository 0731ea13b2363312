//! The cache engine: lookup (C4), eviction (C5), insertion (C6), filler
//! integration (C7), and configuration/lifecycle (C8).

use std::fmt;

use crate::builder::CacheBuilder;
use crate::error::CacheError;
use crate::hash::hash_key;
use crate::iter::Iter;
use crate::pool::ItemPool;
use crate::policy::Policy;
use crate::slot::{Slot, SlotTable, INITIAL_AGE, TOMBSTONE};
use crate::stats::Stats;

const MIN_CAPACITY: usize = 16;
const MAX_EVICTION_SEARCH: u32 = 16;

fn validate_config(
    key_size: usize,
    value_size: usize,
    max_load_factor: f32,
    min_capacity: usize,
) -> Result<(), CacheError> {
    if key_size == 0 {
        return Err(CacheError::InvalidKeySize);
    }
    if value_size == 0 {
        return Err(CacheError::InvalidValueSize);
    }
    // Excludes 1.0: at that boundary `compute_sizes` yields `K == M`, so a
    // full table has no slot with `age <= 1` left for `probe` to stop the
    // walk at, turning a miss lookup into a loop that never terminates.
    if !(max_load_factor > 0.0 && max_load_factor < 1.0) {
        return Err(CacheError::InvalidLoadFactor(max_load_factor));
    }
    if min_capacity == 0 {
        return Err(CacheError::InvalidMinCapacity);
    }
    Ok(())
}

/// Computes `(M, K)` from a requested minimum capacity and load factor:
/// `M` is the smallest power of two `>= ceil(max(c, 16) / α)`, and
/// `K = floor(M * α)`.
fn compute_sizes(min_capacity: usize, max_load_factor: f32) -> (u32, usize) {
    let c = min_capacity.max(MIN_CAPACITY);
    let target = (c as f64 / max_load_factor as f64).ceil() as u64;
    let m = target.max(1).next_power_of_two() as u32;
    let k = ((m as f64) * (max_load_factor as f64)).floor() as usize;
    (m, k)
}

#[derive(Default)]
struct PendingConfig<C> {
    min_capacity: Option<usize>,
    max_load_factor: Option<f32>,
    value_destroyer: Option<Box<dyn FnMut(&mut C, &[u8])>>,
    context_destroyer: Option<Box<dyn FnOnce(C)>>,
    na_value: Option<Vec<u8>>,
}

impl<C> Default for Cache<C>
where
    C: Default,
{
    fn default() -> Self {
        CacheBuilder::with_context(8, 8, C::default())
            .build()
            .expect("default 8/8 configuration is always valid")
    }
}

/// A fixed-capacity, single-threaded, byte-blob cache with aging-counter
/// eviction.
///
/// `Cache` uses an open-addressing probe table with linear probing for the
/// index, and a separate, fixed-size item pool addressed by integer index
/// for the key/value bytes themselves. Capacity is fixed at creation (or
/// at [`reconfigure`][Cache::reconfigure], which is destructive); the
/// table never grows.
///
/// # Examples
///
/// ```rust
/// use iht_cache::CacheBuilder;
///
/// let mut cache = CacheBuilder::new(8, 8).min_capacity(4).build().unwrap();
///
/// let key = 1u64.to_le_bytes();
/// let value = 10u64.to_le_bytes();
/// cache.put(&key, &value);
///
/// let mut out = [0u8; 8];
/// assert!(cache.lookup(&key, &mut out));
/// assert_eq!(u64::from_le_bytes(out), 10);
/// ```
pub struct Cache<C = ()> {
    slots: SlotTable,
    pool: ItemPool,
    key_size: usize,
    value_size: usize,
    max_load_factor: f32,
    min_capacity: usize,
    item_count: usize,
    evict_cursor: usize,
    stats: Stats,
    context: C,
    filler: Option<Box<dyn FnMut(&mut C, &[u8], &mut [u8]) -> bool>>,
    value_destroyer: Option<Box<dyn FnMut(&mut C, &[u8])>>,
    context_destroyer: Option<Box<dyn FnOnce(C)>>,
    na_value: Vec<u8>,
    pending: PendingConfig<C>,
}

impl<C> fmt::Debug for Cache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d_map = f.debug_map();
        for (k, v) in self.iter() {
            d_map.entry(&hex(k), &hex(v));
        }
        d_map.finish()
    }
}

impl<C> fmt::Display for Cache<C> {
    /// Renders the operation counters as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stats)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

//
// construction
//
impl<C> Cache<C> {
    pub(crate) fn with_everything(builder: CacheBuilder<C>) -> Result<Self, CacheError> {
        validate_config(
            builder.key_size,
            builder.value_size,
            builder.max_load_factor,
            builder.min_capacity,
        )?;

        let (m, k) = compute_sizes(builder.min_capacity, builder.max_load_factor);

        tracing::debug!(
            m,
            k,
            key_size = builder.key_size,
            value_size = builder.value_size,
            "creating cache"
        );

        Ok(Self {
            slots: SlotTable::new(m)?,
            pool: ItemPool::new(k, builder.key_size, builder.value_size)?,
            key_size: builder.key_size,
            value_size: builder.value_size,
            max_load_factor: builder.max_load_factor,
            min_capacity: builder.min_capacity,
            item_count: 0,
            evict_cursor: 0,
            stats: Stats::default(),
            context: builder.context,
            filler: builder.filler,
            value_destroyer: builder.value_destroyer,
            context_destroyer: builder.context_destroyer,
            na_value: builder.na_value.unwrap_or_else(|| vec![0u8; builder.value_size]),
            pending: PendingConfig::default(),
        })
    }

    /// Returns a [`CacheBuilder`] for a cache with no context value.
    pub fn builder(key_size: usize, value_size: usize) -> CacheBuilder<()> {
        CacheBuilder::new(key_size, value_size)
    }
}

impl Cache<()> {
    /// Creates a cache with the given minimum capacity and byte sizes,
    /// using default load factor and no filler/destroyers/context.
    pub fn create(min_capacity: usize, key_size: usize, value_size: usize) -> Result<Self, CacheError> {
        CacheBuilder::new(key_size, value_size)
            .min_capacity(min_capacity)
            .build()
    }
}

//
// accessors
//
impl<C> Cache<C> {
    /// Returns a read-only snapshot of this cache's configuration.
    pub fn policy(&self) -> Policy {
        Policy::new(
            self.pool.capacity(),
            self.key_size,
            self.value_size,
            self.max_load_factor,
            self.min_capacity,
            self.filler.is_some(),
        )
    }

    /// Returns `true` if this cache was configured with a filler.
    pub fn has_filler(&self) -> bool {
        self.filler.is_some()
    }

    /// Returns the number of currently-live items.
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Returns `K`, the maximum number of simultaneously-live items.
    pub fn max_items(&self) -> usize {
        self.pool.capacity()
    }

    /// Returns the fixed key size, in bytes.
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Returns the fixed value size, in bytes.
    pub fn value_size(&self) -> usize {
        self.value_size
    }

    /// Returns the configured load factor `α`.
    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Returns a snapshot of the operation counters.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Zeroes every operation counter.
    pub fn clear_stats(&mut self) {
        self.stats.clear();
    }

    /// Iterates over every currently-live `(key, value)` pair. Does not
    /// bump ages or invoke the filler.
    pub fn iter(&self) -> Iter<'_, C> {
        Iter::new(self)
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn alive_item_index(&self, slot_index: usize) -> Option<u32> {
        let slot = self.slots.get(slot_index);
        if slot.is_alive() {
            Some(slot.item_index)
        } else {
            None
        }
    }

    pub(crate) fn key_at(&self, item_index: u32) -> &[u8] {
        self.pool.key(item_index)
    }

    pub(crate) fn value_at(&self, item_index: u32) -> &[u8] {
        self.pool.value(item_index)
    }
}

//
// staged configuration (committed by `reconfigure`)
//
impl<C> Cache<C> {
    /// Stages a new minimum capacity, applied by the next
    /// [`reconfigure`][Cache::reconfigure].
    pub fn set_min_capacity(&mut self, min_capacity: usize) {
        self.pending.min_capacity = Some(min_capacity);
    }

    /// Stages a new load factor, applied by the next
    /// [`reconfigure`][Cache::reconfigure].
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) {
        self.pending.max_load_factor = Some(max_load_factor);
    }

    /// Stages a new value destroyer, applied by the next
    /// [`reconfigure`][Cache::reconfigure].
    pub fn set_value_destroyer(&mut self, destroyer: impl FnMut(&mut C, &[u8]) + 'static) {
        self.pending.value_destroyer = Some(Box::new(destroyer));
    }

    /// Stages a new context destroyer, applied by the next
    /// [`reconfigure`][Cache::reconfigure].
    pub fn set_context_destroyer(&mut self, destroyer: impl FnOnce(C) + 'static) {
        self.pending.context_destroyer = Some(Box::new(destroyer));
    }

    /// Stages a new `na_value`, applied by the next
    /// [`reconfigure`][Cache::reconfigure].
    pub fn set_na_value(&mut self, na_value: Vec<u8>) {
        self.pending.na_value = Some(na_value);
    }

    /// Commits any staged configuration. Destroys all live values (via the
    /// destroyer, if any, **after** staged destroyers are committed),
    /// frees both arrays, recomputes `M`/`K`, and reallocates. All prior
    /// entries are lost.
    pub fn reconfigure(&mut self) -> Result<(), CacheError> {
        let min_capacity = self.pending.min_capacity.take().unwrap_or(self.min_capacity);
        let max_load_factor = self.pending.max_load_factor.take().unwrap_or(self.max_load_factor);
        validate_config(self.key_size, self.value_size, max_load_factor, min_capacity)?;

        if let Some(vd) = self.pending.value_destroyer.take() {
            self.value_destroyer = Some(vd);
        }
        if let Some(cd) = self.pending.context_destroyer.take() {
            self.context_destroyer = Some(cd);
        }
        if let Some(na) = self.pending.na_value.take() {
            self.na_value = na;
        }

        self.remove_all();

        let (m, k) = compute_sizes(min_capacity, max_load_factor);
        self.slots = SlotTable::new(m)?;
        self.pool = ItemPool::new(k, self.key_size, self.value_size)?;
        self.min_capacity = min_capacity;
        self.max_load_factor = max_load_factor;
        self.evict_cursor = 0;

        tracing::debug!(m, k, key_size = self.key_size, value_size = self.value_size, "cache reconfigured");
        Ok(())
    }

    /// Destroys every live value (via the value destroyer, if any) and
    /// zeroes both arrays. `item_count` becomes 0.
    pub fn remove_all(&mut self) {
        if let Some(mut destroyer) = self.value_destroyer.take() {
            for i in 0..self.slots.len() {
                let slot = self.slots.get(i);
                if slot.is_alive() {
                    destroyer(&mut self.context, self.pool.value(slot.item_index));
                }
            }
            self.value_destroyer = Some(destroyer);
        }
        self.slots.clear_all();
        self.pool.clear_all();
        self.item_count = 0;
    }

    /// Runs [`remove_all`][Cache::remove_all], then the context destroyer
    /// (if any), consuming the cache.
    ///
    /// Dropping a `Cache` without calling `destroy` still frees its
    /// internal arrays (ordinary `Vec` drop glue), but skips the value and
    /// context destroyer callbacks — call `destroy` explicitly whenever
    /// those side effects matter.
    pub fn destroy(mut self) {
        self.remove_all();
        if let Some(destroyer) = self.context_destroyer.take() {
            destroyer(self.context);
        }
    }
}

//
// lookup / eviction / insertion engine
//
impl<C> Cache<C> {
    /// Walks the probe sequence from `home(hash)`. Returns the slot index
    /// at which the walk stopped, whether that slot already holds `key`
    /// (a hit for lookup, an update for insertion), and the number of
    /// probe steps taken beyond the home slot.
    ///
    /// Lookup and insertion share this walk because both stop at the first
    /// slot with `age <= 1`: a miss, for lookup; the slot to populate, for
    /// insertion.
    fn probe(&self, hash: u32, key: &[u8]) -> (usize, bool, u64) {
        let mut i = self.slots.home(hash);
        let mut scans = 0u64;
        loop {
            let slot = self.slots.get(i);
            if slot.is_empty() {
                return (i, false, scans);
            }
            if slot.is_alive() && slot.hash == hash && self.pool.key(slot.item_index) == key {
                return (i, true, scans);
            }
            i = self.slots.next(i);
            scans += 1;
        }
    }

    /// Read-only lookup. Bumps the slot's age on a hit. Never invokes the
    /// filler.
    pub fn lookup(&mut self, key: &[u8], out_value: &mut [u8]) -> bool {
        assert_eq!(key.len(), self.key_size, "key length must equal key_size");
        assert_eq!(out_value.len(), self.value_size, "out_value length must equal value_size");

        self.stats.lookups += 1;
        let hash = hash_key(key);
        let (i, found, scans) = self.probe(hash, key);

        if found {
            self.stats.hits.record(scans);
            self.slots.bump_age(i);
            let item_index = self.slots.get(i).item_index;
            out_value.copy_from_slice(self.pool.value(item_index));
            true
        } else {
            self.stats.misses.record(scans);
            false
        }
    }

    /// Like [`lookup`][Cache::lookup], but returns a pointer-style
    /// reference into the item pool instead of copying into a caller
    /// buffer. The returned reference is valid only until the next
    /// mutating call (`put`, a missed `fetch`/`get`, `remove_all`,
    /// `destroy`, or `reconfigure`).
    pub fn get(&mut self, key: &[u8]) -> Option<&[u8]> {
        assert_eq!(key.len(), self.key_size, "key length must equal key_size");

        self.stats.lookups += 1;
        let hash = hash_key(key);
        let (i, found, scans) = self.probe(hash, key);

        if found {
            self.stats.hits.record(scans);
            self.slots.bump_age(i);
            let item_index = self.slots.get(i).item_index;
            Some(self.pool.value(item_index))
        } else {
            self.stats.misses.record(scans);
            None
        }
    }

    /// Like [`lookup`][Cache::lookup], but on a miss consults the filler
    /// (if configured) and installs its result. If the filler returns
    /// `false`, the lookup reports failure and the cache is left
    /// unchanged.
    pub fn fetch(&mut self, key: &[u8], out_value: &mut [u8]) -> bool {
        if self.lookup(key, out_value) {
            return true;
        }

        let mut filler = self.filler.take();
        let mut scratch = vec![0u8; self.value_size];
        let produced = match filler.as_mut() {
            Some(f) => f(&mut self.context, key, &mut scratch),
            None => false,
        };
        self.filler = filler;

        if produced {
            self.insert(key, &scratch);
            out_value.copy_from_slice(&scratch);
            true
        } else {
            tracing::trace!("filler returned false, leaving cache unchanged");
            false
        }
    }

    /// Like [`fetch`][Cache::fetch], for caches whose `key_size` and
    /// `value_size` both fit in 16 bytes. Returns the configured
    /// `na_value` (zero-filled by default) on a miss; never invokes the
    /// filler.
    pub fn get_fast(&mut self, key16: &[u8; 16]) -> [u8; 16] {
        debug_assert!(
            self.key_size <= 16 && self.value_size <= 16,
            "get_fast requires key_size and value_size <= 16"
        );

        let key = &key16[..self.key_size];
        let mut out = [0u8; 16];

        match self.get(key) {
            Some(value) => out[..value.len()].copy_from_slice(value),
            None => out[..self.na_value.len()].copy_from_slice(&self.na_value),
        }

        out
    }

    /// Inserts or updates `key` with `value`. Always succeeds, evicting a
    /// slot if the pool is full, and always returns `true`.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> bool {
        assert_eq!(key.len(), self.key_size, "key length must equal key_size");
        assert_eq!(value.len(), self.value_size, "value length must equal value_size");
        self.insert(key, value);
        true
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) {
        let hash = hash_key(key);

        if self.item_count < self.pool.capacity() {
            let item_index = self.item_count as u32;
            self.insert_at(hash, key, value, item_index, None);
        } else {
            let (victim_slot, recovered_item_index, saved) = self.evict();
            self.item_count -= 1;
            self.insert_at(hash, key, value, recovered_item_index, Some((victim_slot, saved)));
        }
    }

    /// Shared tail of the insertion engine: walks the probe sequence and
    /// either updates an existing key or writes a new slot + item at
    /// `item_index`, rolling back an eviction that turned out to be
    /// unnecessary.
    fn insert_at(
        &mut self,
        hash: u32,
        key: &[u8],
        value: &[u8],
        item_index: u32,
        victim_rollback: Option<(usize, Slot)>,
    ) {
        let (i, found, scans) = self.probe(hash, key);

        if found {
            if let Some((victim_slot, saved)) = victim_rollback {
                self.slots.set(victim_slot, saved);
                self.item_count += 1;
            }
            let existing_index = self.slots.get(i).item_index;
            self.pool.value_mut(existing_index).copy_from_slice(value);
            self.stats.updates.record(scans);
            return;
        }

        self.slots.set(i, Slot { hash, item_index, age: INITIAL_AGE });
        self.pool.write(item_index, key, value);
        self.item_count += 1;
        self.stats.adds.record(scans);
    }

    /// The eviction engine (C5): sweeps from the persistent cursor for at
    /// most `MAX_EVICTION_SEARCH` alive-slot visits, decaying slots it
    /// passes over and tracking the coldest one seen. Marks the chosen
    /// victim `TOMBSTONE` and returns its former slot index,
    /// recovered item-pool index, and pre-eviction slot state (for the
    /// insertion engine's duplicate-key rollback).
    fn evict(&mut self) -> (usize, u32, Slot) {
        let mut cursor = self.evict_cursor;
        let mut victim_index = cursor;
        let mut victim_age = u8::MAX;
        let mut search = MAX_EVICTION_SEARCH;
        let mut scan_count = 0u64;

        loop {
            if search == 0 {
                break;
            }

            let slot = self.slots.get(cursor);

            if slot.is_empty() {
                cursor = self.slots.next(cursor);
                scan_count += 1;
                continue;
            }

            if slot.age < victim_age {
                victim_index = cursor;
                victim_age = slot.age;
                if victim_age == INITIAL_AGE {
                    cursor = self.slots.next(cursor);
                    scan_count += 1;
                    search -= 1;
                    break;
                }
            } else if slot.age > INITIAL_AGE {
                self.slots.decay(cursor);
            }

            cursor = self.slots.next(cursor);
            scan_count += 1;
            search -= 1;
        }

        self.evict_cursor = cursor;
        self.stats.evictions.record(scan_count);

        let original = self.slots.get(victim_index);
        let recovered_item_index = original.item_index;

        if let Some(destroyer) = self.value_destroyer.as_mut() {
            destroyer(&mut self.context, self.pool.value(recovered_item_index));
        }

        tracing::trace!(victim_index, recovered_item_index, scan_count, "evicted slot");

        self.slots.set(
            victim_index,
            Slot { hash: 0, item_index: 0, age: TOMBSTONE },
        );

        (victim_index, recovered_item_index, original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `MIN_CAPACITY` (16) floors every cache's `c`, so `max_items` never
    // drops below ~16 regardless of the requested `min_capacity`; use
    // `max_items()` rather than a literal to size test loops.
    fn small_cache() -> Cache<()> {
        CacheBuilder::new(8, 8)
            .min_capacity(32)
            .max_load_factor(0.5)
            .build()
            .unwrap()
    }

    fn key(n: u64) -> [u8; 8] {
        n.to_le_bytes()
    }

    #[test]
    fn fill_without_eviction() {
        let mut cache = small_cache();
        let capacity = cache.max_items() as u64;

        for i in 1..=capacity {
            assert!(cache.put(&key(i), &key(i * 10)));
        }

        for i in 1..=capacity {
            let mut out = [0u8; 8];
            assert!(cache.lookup(&key(i), &mut out));
            assert_eq!(u64::from_le_bytes(out), i * 10);
        }

        assert_eq!(cache.item_count(), cache.max_items());
        assert_eq!(cache.stats().evictions.count, 0);
    }

    #[test]
    fn forced_eviction_keeps_the_new_key_and_evicts_exactly_one() {
        let mut cache = small_cache();
        let capacity = cache.max_items() as u64;
        for i in 1..=capacity {
            cache.put(&key(i), &key(i * 10));
        }

        let new_key = capacity + 1;
        cache.put(&key(new_key), &key(new_key * 10));

        let mut out = [0u8; 8];
        assert!(cache.lookup(&key(new_key), &mut out));
        assert_eq!(u64::from_le_bytes(out), new_key * 10);
        assert_eq!(cache.stats().evictions.count, 1);

        let mut still_present = 0;
        for i in 1..=capacity {
            if cache.lookup(&key(i), &mut [0u8; 8]) {
                still_present += 1;
            }
        }
        assert_eq!(still_present, capacity - 1);
    }

    #[test]
    fn update_does_not_evict() {
        let mut cache = small_cache();
        let capacity = cache.max_items() as u64;
        for i in 1..=capacity {
            cache.put(&key(i), &key(i * 10));
        }

        cache.put(&key(1), &key(999));

        assert_eq!(cache.stats().evictions.count, 0);
        assert!(cache.stats().updates.count >= 1);

        let mut out = [0u8; 8];
        assert!(cache.lookup(&key(1), &mut out));
        assert_eq!(u64::from_le_bytes(out), 999);

        for i in 2..=capacity {
            assert!(cache.lookup(&key(i), &mut [0u8; 8]));
        }
    }

    #[test]
    fn filler_installs_value_on_miss() {
        let mut cache = CacheBuilder::new(8, 8)
            .min_capacity(4)
            .filler(|_ctx: &mut (), k, v| {
                let n = u64::from_le_bytes(k.try_into().unwrap());
                v.copy_from_slice(&(n * 2).to_le_bytes());
                true
            })
            .build()
            .unwrap();

        let mut out = [0u8; 8];
        assert!(cache.fetch(&key(7), &mut out));
        assert_eq!(u64::from_le_bytes(out), 14);
        assert_eq!(cache.stats().adds.count, 1);

        let mut out2 = [0u8; 8];
        assert!(cache.fetch(&key(7), &mut out2));
        assert_eq!(u64::from_le_bytes(out2), 14);
        assert_eq!(cache.stats().hits.count, 1);
        assert_eq!(cache.stats().adds.count, 1);
    }

    #[test]
    fn filler_failure_leaves_state_untouched() {
        let mut cache = CacheBuilder::new(8, 8)
            .min_capacity(4)
            .filler(|_ctx: &mut (), _k, _v| false)
            .build()
            .unwrap();

        let mut out = [0u8; 8];
        assert!(!cache.fetch(&key(9), &mut out));
        assert_eq!(cache.item_count(), 0);
        assert_eq!(cache.stats().misses.count, 1);
        assert_eq!(cache.stats().adds.count, 0);
    }

    #[test]
    fn age_approximates_lru_under_repeated_touch() {
        let mut cache = small_cache();
        let capacity = cache.max_items() as u64;

        for i in 1..=capacity {
            cache.put(&key(i), &key(i));
        }

        // Keep keys 1 and 2 hot.
        for _ in 0..10 {
            cache.lookup(&key(1), &mut [0u8; 8]);
            cache.lookup(&key(2), &mut [0u8; 8]);
        }

        // Insert enough new distinct keys to force eviction repeatedly.
        for i in 0..capacity {
            let new_key = 1_000 + i;
            cache.put(&key(new_key), &key(new_key));
        }

        assert!(cache.lookup(&key(1), &mut [0u8; 8]));
        assert!(cache.lookup(&key(2), &mut [0u8; 8]));
    }

    #[test]
    fn remove_all_is_idempotent_and_zeroes_item_count() {
        let mut cache = small_cache();
        for i in 1..=3u64 {
            cache.put(&key(i), &key(i));
        }
        cache.remove_all();
        cache.remove_all();
        assert_eq!(cache.item_count(), 0);
        assert!(!cache.lookup(&key(1), &mut [0u8; 8]));
    }

    #[test]
    fn reconfigure_resizes_and_drops_all_entries() {
        let mut cache = small_cache();
        cache.put(&key(1), &key(1));
        cache.set_min_capacity(64);
        cache.reconfigure().unwrap();

        assert_eq!(cache.item_count(), 0);
        assert!(!cache.lookup(&key(1), &mut [0u8; 8]));
        // min_capacity=64, max_load_factor=0.5 -> M=128, K=64.
        assert_eq!(cache.max_items(), 64);
    }

    #[test]
    fn reconfigure_rejects_invalid_staged_load_factor() {
        let mut cache = small_cache();
        cache.set_max_load_factor(0.0);
        assert!(matches!(cache.reconfigure(), Err(CacheError::InvalidLoadFactor(_))));
    }

    #[test]
    fn reconfigure_rejects_load_factor_of_exactly_one() {
        let mut cache = small_cache();
        cache.set_max_load_factor(1.0);
        assert!(matches!(cache.reconfigure(), Err(CacheError::InvalidLoadFactor(_))));
    }

    #[test]
    fn lookup_miss_terminates_on_a_nearly_full_table() {
        // A load factor just under 1.0 leaves exactly one non-alive slot in
        // the table once full, which is enough for a miss to terminate.
        let mut cache = CacheBuilder::new(8, 8).min_capacity(16).max_load_factor(0.999).build().unwrap();
        let capacity = cache.max_items() as u64;
        for i in 1..=capacity {
            cache.put(&key(i), &key(i));
        }
        assert!(!cache.lookup(&key(capacity + 1), &mut [0u8; 8]));
    }

    #[test]
    fn value_destroyer_runs_on_eviction_and_remove_all() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let destroyed: Rc<RefCell<Vec<u64>>> = Rc::new(RefCell::new(Vec::new()));
        let destroyed_for_closure = Rc::clone(&destroyed);

        let mut cache = CacheBuilder::with_context(8, 8, ())
            .min_capacity(32)
            .max_load_factor(0.5)
            .value_destroyer(move |_ctx, value| {
                destroyed_for_closure
                    .borrow_mut()
                    .push(u64::from_le_bytes(value.try_into().unwrap()));
            })
            .build()
            .unwrap();

        let capacity = cache.max_items() as u64;
        for i in 1..=capacity {
            cache.put(&key(i), &key(i));
        }
        let overflow_key = capacity + 1;
        cache.put(&key(overflow_key), &key(overflow_key));
        assert_eq!(destroyed.borrow().len(), 1);

        cache.remove_all();
        assert_eq!(destroyed.borrow().len() as u64, 1 + capacity);
    }

    #[test]
    fn get_fast_returns_na_value_on_miss() {
        let mut cache = CacheBuilder::new(8, 8).min_capacity(32).build().unwrap();
        let out = cache.get_fast(&[1u8; 16]);
        assert_eq!(out, [0u8; 16]);
    }

    #[test]
    fn get_pointer_is_readable_until_next_mutation() {
        let mut cache = small_cache();
        cache.put(&key(1), &key(11));
        assert_eq!(cache.get(&key(1)), Some(&key(11)[..]));
    }

    #[test]
    fn iter_visits_every_live_entry() {
        let mut cache = small_cache();
        for i in 1..=3u64 {
            cache.put(&key(i), &key(i * 10));
        }
        let mut seen: Vec<u64> = cache
            .iter()
            .map(|(k, _v)| u64::from_le_bytes(k.try_into().unwrap()))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn destroy_runs_context_destroyer_once() {
        use std::cell::Cell;
        use std::rc::Rc;

        let ran = Rc::new(Cell::new(false));
        let ran_for_closure = Rc::clone(&ran);

        let cache = CacheBuilder::with_context(8, 8, 0u32)
            .min_capacity(4)
            .context_destroyer(move |_ctx| ran_for_closure.set(true))
            .build()
            .unwrap();

        cache.destroy();
        assert!(ran.get());
    }

    /// A tiny deterministic PRNG so the randomized checks below don't need
    /// an external crate just to generate a sequence of keys.
    struct XorShift64(u64);

    impl XorShift64 {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }
    }

    fn assert_invariants<C>(cache: &Cache<C>) {
        let mut seen_indices = std::collections::HashSet::new();
        let mut alive_count = 0usize;

        for (i, slot) in cache.slots.iter() {
            // age is always in range.
            assert!(slot.age <= crate::slot::MAX_AGE);

            if !slot.is_alive() {
                continue;
            }
            alive_count += 1;

            // no two alive slots share an item-pool index.
            assert!(seen_indices.insert(slot.item_index), "duplicate item_index {}", slot.item_index);

            // walking forward from home(hash) reaches this slot without
            // crossing an EMPTY slot.
            let key = cache.pool.key(slot.item_index).to_vec();
            let hash = hash_key(&key);
            let mut j = cache.slots.home(hash);
            loop {
                let s = cache.slots.get(j);
                assert!(!s.is_empty(), "crossed an EMPTY slot before reaching the home key's slot");
                if j == i {
                    break;
                }
                j = cache.slots.next(j);
            }
        }

        // the multiset of alive item_index values has size item_count.
        assert_eq!(alive_count, cache.item_count);
    }

    #[test]
    fn random_operation_sequence_preserves_core_invariants() {
        let mut cache = CacheBuilder::new(8, 8).min_capacity(32).max_load_factor(0.5).build().unwrap();
        let capacity = cache.max_items() as u64;
        let mut rng = XorShift64(0x2545_F491_4F6C_DD1D);

        for _ in 0..2_000 {
            let k = rng.next() % (capacity * 4);
            let v = rng.next();
            match rng.next() % 3 {
                0 => {
                    cache.put(&key(k), &key(v));
                }
                1 => {
                    let mut out = [0u8; 8];
                    cache.lookup(&key(k), &mut out);
                }
                _ => {
                    let _ = cache.get(&key(k));
                }
            }
            assert_invariants(&cache);
        }

        // once `max_items` distinct keys have been observed, item_count
        // stays pinned at max_items.
        assert_eq!(cache.item_count(), cache.max_items());

        // remove_all is idempotent.
        cache.remove_all();
        cache.remove_all();
        assert_eq!(cache.item_count(), 0);
        assert_invariants(&cache);
    }

    #[test]
    fn single_eviction_never_exceeds_search_budget() {
        let mut cache = CacheBuilder::new(8, 8).min_capacity(32).max_load_factor(0.5).build().unwrap();
        let capacity = cache.max_items() as u64;
        for i in 1..=capacity {
            cache.put(&key(i), &key(i));
        }

        let before = cache.stats().evictions.scans;
        cache.put(&key(capacity + 1), &key(capacity + 1));
        let after = cache.stats().evictions.scans;

        // a single eviction-triggering put performs at most
        // MAX_EVICTION_SEARCH alive-slot visits.
        assert!(after - before <= MAX_EVICTION_SEARCH as u64);
    }
}
