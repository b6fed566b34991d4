//! Store adapter trait.

use crate::{CommandReply, StoreCommand};
use async_trait::async_trait;
use rollcall_core::{Interface, RollcallResult};
use std::time::Duration;

/// Cursor value that starts a keyspace scan and signals its end.
pub const SCAN_START: u64 = 0;

/// Key-value store consumed by the cache index and the keyspace monitor.
///
/// Every method is a single round trip. Implementations are shared between
/// concurrent callers and provide per-command atomicity only; `batch` saves
/// round trips but gives no isolation between its commands.
#[async_trait]
pub trait KeyValueStore: Interface + Send + Sync {
    /// Reads a string value. `None` if the key is absent or expired.
    async fn get(&self, key: &str) -> RollcallResult<Option<String>>;

    /// Writes a string value, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> RollcallResult<()>;

    /// Deletes a key. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> RollcallResult<bool>;

    /// Sets a key's time-to-live. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> RollcallResult<bool>;

    /// Removes every occurrence of `value` from a list. Returns the count removed.
    async fn list_remove(&self, key: &str, value: &str) -> RollcallResult<u64>;

    /// Pushes `value` onto the head of a list. Returns the new length.
    async fn list_push_head(&self, key: &str, value: &str) -> RollcallResult<u64>;

    /// Trims a list to the inclusive range `start..=stop` (negative indexes count from the tail).
    async fn list_trim(&self, key: &str, start: isize, stop: isize) -> RollcallResult<()>;

    /// Reads the inclusive range `start..=stop` of a list.
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> RollcallResult<Vec<String>>;

    /// Executes commands in one round trip, returning one reply per command
    /// in issue order. A failing command yields [`CommandReply::Failed`]
    /// without aborting the others; `Err` means the batch never ran.
    async fn batch(&self, commands: Vec<StoreCommand>) -> RollcallResult<Vec<CommandReply>>;

    /// Returns the next cursor and one batch of keys matching `pattern`.
    ///
    /// A scan starts and ends at [`SCAN_START`]. Keys may repeat across batches.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> RollcallResult<(u64, Vec<String>)>;

    /// Returns the raw `INFO memory` report.
    async fn info_memory(&self) -> RollcallResult<String>;
}
