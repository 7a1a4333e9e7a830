//! Persistent response cache
//!
//! This module provides a file-based response cache that survives process
//! restarts:
//! - Entry snapshots and their binary encoding
//! - Deterministic URL-to-filename derivation
//! - The store itself, with TTL expiry and size eviction under a single
//!   store-wide lock

pub mod entry;
pub mod key;
pub mod store;

pub use entry::{CacheEntry, ProtocolVersion};
pub use store::{CacheConfig, CacheStore};
