//! # Rollcall Store
//!
//! The store adapter consumed by the cache index: point reads and writes
//! with optional expiry, list primitives, batched execution, cursor-based
//! keyspace scans and memory statistics.
//!
//! Two implementations are provided:
//! - [`RedisStore`]: pooled Redis connections via `deadpool-redis`
//! - [`MemoryStore`]: an in-process store with the same semantics, used in
//!   tests and local development

mod command;
mod memory;
pub mod redis;
mod traits;

pub use command::{CommandReply, StoreCommand};
pub use memory::MemoryStore;
pub use crate::redis::{create_pool, RedisStore, RedisStoreParameters};
pub use traits::{KeyValueStore, SCAN_START};
