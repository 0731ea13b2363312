#![warn(clippy::all)]
#![warn(rust_2018_idioms)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! `iht-cache` is a fixed-capacity, single-threaded, in-process key/value
//! cache core built around an open-addressing hash table with linear
//! probing and an aging-counter eviction policy.
//!
//! Keys and values are plain byte blobs of sizes fixed at cache creation,
//! rather than compile-time generic types: this crate models the data
//! plane of a C-style cache library, not a generic Rust collection. A probe
//! slot holds only a hash, an age, and an index into a separate item pool,
//! so evicting an entry never needs to move any other entry's bytes.
//!
//! # Features
//!
//! - Bounded by a maximum item count `K`, derived from a requested minimum
//!   capacity and load factor.
//! - Approximates LRU with a small per-slot aging counter instead of an
//!   exact recency list: cheap to maintain, no allocation on hit.
//! - An optional filler callback lazily populates a value on miss
//!   ([`Cache::fetch`]/[`Cache::get`]).
//! - Hashing uses hardware CRC32 (SSE4.2) when available, falling back to a
//!   multiplicative mix otherwise; the choice is made once per process.
//!
//! # Examples
//!
//! ```rust
//! use iht_cache::CacheBuilder;
//!
//! let mut cache = CacheBuilder::new(8, 8).min_capacity(64).build().unwrap();
//! cache.put(&1u64.to_le_bytes(), &42u64.to_le_bytes());
//!
//! let mut out = [0u8; 8];
//! assert!(cache.lookup(&1u64.to_le_bytes(), &mut out));
//! assert_eq!(u64::from_le_bytes(out), 42);
//! ```

pub(crate) mod builder;
pub(crate) mod cache;
pub(crate) mod error;
pub(crate) mod hash;
pub(crate) mod iter;
pub(crate) mod policy;
pub(crate) mod pool;
pub(crate) mod slot;
pub(crate) mod stats;

pub use builder::CacheBuilder;
pub use cache::Cache;
pub use error::CacheError;
pub use iter::Iter;
pub use policy::Policy;
pub use stats::{Counter, Stats};
