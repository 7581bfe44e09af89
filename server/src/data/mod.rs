//! Data storage layer
//!
//! - `cache` - TTL key-value store (in-memory or Redis) with versioned writes

pub mod cache;

pub use cache::{CacheError, CacheKey, CacheService, Versioned};
