//! File-backed cache of function results, keyed by argument footprints.
//!
//! This crate provides:
//! - [`PersistentCache`]: a directory with one append-only store per function
//! - [`FunctionCache`]: lookups and cached calls under a [`CacheMode`]
//! - [`StoreReader`] / [`StoreWriter`]: the framed store file format
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use footprint_cache::{Arguments, CacheConfig, CacheMode, PersistentCache};
//!
//! let cache = PersistentCache::open(CacheConfig::at(".cache"))?;
//! let mut fib = cache.function("demo", "fib")?;
//!
//! let args = Arguments::new().with("n", &30u32)?;
//! let first = fib.call(&args, CacheMode::Default, || 832_040u64)?;
//! let again = fib.call(&args, CacheMode::Default, || 832_040u64)?;
//! assert!(!first.is_cached());
//! assert!(again.is_cached());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

/// Cached calls, cache modes and call arguments.
pub mod cache;
/// Cache settings.
pub mod config;
/// Error types for cache operations.
pub mod errors;
/// Store file layout: header, frame headers and kinds.
pub mod frame;
/// Store reader implementation.
pub mod reader;
/// Store writer implementation.
pub mod writer;

pub use cache::{Arguments, CacheMode, FunctionCache, Outcome, PersistentCache, UnknownCacheMode};
pub use config::CacheConfig;
pub use errors::CacheError;
pub use frame::{FrameHeader, FrameKind};
pub use reader::{ReadMode, Record, StoreReader};
pub use writer::{StoreWriter, WriteOptions};
