//! Staged configuration for building a [`Cache`][cache-struct] (component C8).
//!
//! [cache-struct]: crate::cache::Cache

use crate::cache::Cache;
use crate::error::CacheError;

pub(crate) const DEFAULT_MIN_CAPACITY: usize = 16;
pub(crate) const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.40;

/// Builds a [`Cache`][cache-struct] with various configuration knobs.
///
/// [cache-struct]: crate::cache::Cache
///
/// # Examples
///
/// ```rust
/// use iht_cache::CacheBuilder;
///
/// let cache = CacheBuilder::new(8, 8)
///     .min_capacity(1_000)
///     .build()
///     .unwrap();
///
/// assert_eq!(cache.policy().key_size(), 8);
/// ```
#[must_use]
pub struct CacheBuilder<C = ()> {
    pub(crate) min_capacity: usize,
    pub(crate) key_size: usize,
    pub(crate) value_size: usize,
    pub(crate) max_load_factor: f32,
    pub(crate) context: C,
    pub(crate) filler: Option<Box<dyn FnMut(&mut C, &[u8], &mut [u8]) -> bool>>,
    pub(crate) value_destroyer: Option<Box<dyn FnMut(&mut C, &[u8])>>,
    pub(crate) context_destroyer: Option<Box<dyn FnOnce(C)>>,
    pub(crate) na_value: Option<Vec<u8>>,
}

impl CacheBuilder<()> {
    /// Constructs a builder for a cache with no context value, fixed key
    /// and value sizes of `key_size`/`value_size` bytes.
    pub fn new(key_size: usize, value_size: usize) -> Self {
        Self::with_context(key_size, value_size, ())
    }
}

impl<C> CacheBuilder<C> {
    /// Constructs a builder for a cache whose filler and destroyer
    /// callbacks are threaded through the given `context` value.
    pub fn with_context(key_size: usize, value_size: usize, context: C) -> Self {
        Self {
            min_capacity: DEFAULT_MIN_CAPACITY,
            key_size,
            value_size,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            context,
            filler: None,
            value_destroyer: None,
            context_destroyer: None,
            na_value: None,
        }
    }

    /// Sets the minimum capacity `c` used to derive `M` (the slot table
    /// size) and `K` (the item pool capacity).
    pub fn min_capacity(mut self, min_capacity: usize) -> Self {
        self.min_capacity = min_capacity;
        self
    }

    /// Sets the load factor used to derive `K` from `M`. Must be in `(0, 1)`.
    pub fn max_load_factor(mut self, max_load_factor: f32) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    /// Sets the filler invoked by [`Cache::fetch`][fetch]/[`Cache::get`][get]
    /// on a miss.
    ///
    /// [fetch]: crate::cache::Cache::fetch
    /// [get]: crate::cache::Cache::get
    pub fn filler(mut self, filler: impl FnMut(&mut C, &[u8], &mut [u8]) -> bool + 'static) -> Self {
        self.filler = Some(Box::new(filler));
        self
    }

    /// Sets the callback invoked once per live value on
    /// [`Cache::remove_all`][remove_all]/[`Cache::destroy`][destroy], and on
    /// an evicted value before its item-pool slot is recycled.
    ///
    /// [remove_all]: crate::cache::Cache::remove_all
    /// [destroy]: crate::cache::Cache::destroy
    pub fn value_destroyer(mut self, destroyer: impl FnMut(&mut C, &[u8]) + 'static) -> Self {
        self.value_destroyer = Some(Box::new(destroyer));
        self
    }

    /// Sets the callback invoked once, on [`Cache::destroy`][destroy].
    ///
    /// [destroy]: crate::cache::Cache::destroy
    pub fn context_destroyer(mut self, destroyer: impl FnOnce(C) + 'static) -> Self {
        self.context_destroyer = Some(Box::new(destroyer));
        self
    }

    /// Sets the value returned by [`Cache::get_fast`][get_fast] on a miss.
    /// Must be exactly `value_size` bytes.
    ///
    /// [get_fast]: crate::cache::Cache::get_fast
    pub fn na_value(mut self, na_value: Vec<u8>) -> Self {
        self.na_value = Some(na_value);
        self
    }

    /// Builds the `Cache`, computing `M` and `K` from `min_capacity` and
    /// `max_load_factor`.
    pub fn build(self) -> Result<Cache<C>, CacheError> {
        Cache::with_everything(self)
    }
}
