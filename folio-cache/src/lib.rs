//! Persistent TTL cache for Folio resources.
//!
//! A best-effort key/value cache with per-entry timestamps over injectable
//! storage (in-memory or a JSON file on disk).

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod storage;

pub use cache::{CacheEntry, CacheStore};
pub use storage::{FileStorage, MemoryStorage};
