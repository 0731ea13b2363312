use thiserror::Error;

/// Errors returned by [`Cache::create`][create] and
/// [`Cache::reconfigure`][reconfigure].
///
/// [create]: crate::cache::Cache::create
/// [reconfigure]: crate::cache::Cache::reconfigure
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CacheError {
    /// `key_size` was zero.
    #[error("key_size must be non-zero")]
    InvalidKeySize,

    /// `value_size` was zero.
    #[error("value_size must be non-zero")]
    InvalidValueSize,

    /// `max_load_factor` was outside `(0.0, 1.0)`.
    #[error("max_load_factor must be in (0.0, 1.0), got {0}")]
    InvalidLoadFactor(f32),

    /// `min_capacity` was zero.
    #[error("min_capacity must be non-zero")]
    InvalidMinCapacity,

    /// The slot array or item pool could not be allocated.
    #[error("failed to allocate cache storage for {requested_bytes} bytes")]
    AllocationFailed {
        /// The number of bytes the failed allocation was for.
        requested_bytes: usize,
    },
}
