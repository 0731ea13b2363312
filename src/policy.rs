/// A read-only snapshot of a cache's configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Policy {
    max_items: usize,
    key_size: usize,
    value_size: usize,
    max_load_factor_permille: u32,
    min_capacity: usize,
    has_filler: bool,
}

impl Policy {
    pub(crate) fn new(
        max_items: usize,
        key_size: usize,
        value_size: usize,
        max_load_factor: f32,
        min_capacity: usize,
        has_filler: bool,
    ) -> Self {
        Self {
            max_items,
            key_size,
            value_size,
            // Stored as an integer so `Policy` can derive `Eq`.
            max_load_factor_permille: (max_load_factor * 1000.0).round() as u32,
            min_capacity,
            has_filler,
        }
    }

    /// Returns `K`, the maximum number of simultaneously-live items.
    pub fn max_items(&self) -> usize {
        self.max_items
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
        self.max_load_factor_permille as f32 / 1000.0
    }

    /// Returns the minimum capacity the cache was created or reconfigured
    /// with.
    pub fn min_capacity(&self) -> usize {
        self.min_capacity
    }

    /// Returns `true` if the cache was configured with a filler callback.
    pub fn has_filler(&self) -> bool {
        self.has_filler
    }
}
