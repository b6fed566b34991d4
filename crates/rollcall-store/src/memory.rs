//! In-process implementation of [`KeyValueStore`].
//!
//! Mirrors the Redis semantics the cache index relies on: lazy expiry, list
//! commands with negative indexes, WRONGTYPE errors, cursor scans over a
//! sorted key snapshot and an `INFO memory`-shaped report. Expiry uses
//! `tokio::time`, so tests can drive it with a paused clock.

use crate::{CommandReply, KeyValueStore, StoreCommand, SCAN_START};
use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use rollcall_core::{RollcallError, RollcallResult};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Clone)]
enum Data {
    Text(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    data: Data,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn size(&self, key: &str) -> usize {
        let data = match &self.data {
            Data::Text(text) => text.len(),
            Data::List(items) => items.iter().map(String::len).sum(),
        };
        key.len() + data
    }
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    peak_bytes: usize,
}

impl State {
    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        let now = Instant::now();
        if self.entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn purge_expired(&mut self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(key, entry)| entry.size(key)).sum()
    }

    fn track_peak(&mut self) {
        self.peak_bytes = self.peak_bytes.max(self.used_bytes());
    }

    fn get(&mut self, key: &str) -> Result<Option<String>, String> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry { data: Data::Text(text), .. }) => Ok(Some(text.clone())),
            Some(_) => Err(WRONGTYPE.to_string()),
        }
    }

    fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) {
        let entry = Entry {
            data: Data::Text(value.to_string()),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.insert(key.to_string(), entry);
        self.track_peak();
    }

    fn delete(&mut self, key: &str) -> bool {
        self.live(key).is_some() && self.entries.remove(key).is_some()
    }

    fn expire(&mut self, key: &str, ttl: Duration) -> bool {
        match self.live(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                true
            }
            None => false,
        }
    }

    fn list_mut(&mut self, key: &str) -> Result<Option<&mut VecDeque<String>>, String> {
        match self.live(key) {
            None => Ok(None),
            Some(Entry { data: Data::List(items), .. }) => Ok(Some(items)),
            Some(_) => Err(WRONGTYPE.to_string()),
        }
    }

    fn drop_if_empty(&mut self, key: &str) {
        if matches!(self.entries.get(key), Some(Entry { data: Data::List(items), .. }) if items.is_empty()) {
            self.entries.remove(key);
        }
    }

    fn list_remove(&mut self, key: &str, value: &str) -> Result<u64, String> {
        let removed = match self.list_mut(key)? {
            None => return Ok(0),
            Some(items) => {
                let before = items.len();
                items.retain(|item| item != value);
                before - items.len()
            }
        };
        self.drop_if_empty(key);
        Ok(removed as u64)
    }

    fn list_push_head(&mut self, key: &str, value: &str) -> Result<u64, String> {
        let len = match self.list_mut(key)? {
            Some(items) => {
                items.push_front(value.to_string());
                items.len()
            }
            None => {
                let entry = Entry {
                    data: Data::List(VecDeque::from([value.to_string()])),
                    expires_at: None,
                };
                self.entries.insert(key.to_string(), entry);
                1
            }
        };
        self.track_peak();
        Ok(len as u64)
    }

    fn list_trim(&mut self, key: &str, start: isize, stop: isize) -> Result<(), String> {
        if let Some(items) = self.list_mut(key)? {
            match resolve_range(items.len(), start, stop) {
                Some((from, to)) => {
                    items.truncate(to + 1);
                    items.drain(..from);
                }
                None => items.clear(),
            }
        }
        self.drop_if_empty(key);
        Ok(())
    }

    fn list_range(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, String> {
        let Some(items) = self.list_mut(key)? else {
            return Ok(Vec::new());
        };
        Ok(match resolve_range(items.len(), start, stop) {
            Some((from, to)) => items.range(from..=to).cloned().collect(),
            None => Vec::new(),
        })
    }

    fn execute(&mut self, command: StoreCommand) -> CommandReply {
        let reply = match command {
            StoreCommand::Get { key } => self.get(&key).map(|value| match value {
                Some(value) => CommandReply::Value(value),
                None => CommandReply::Absent,
            }),
            StoreCommand::Set { key, value, ttl } => {
                self.set(&key, &value, ttl);
                Ok(CommandReply::Ok)
            }
            StoreCommand::Delete { key } => Ok(CommandReply::Integer(i64::from(self.delete(&key)))),
            StoreCommand::Expire { key, ttl } => Ok(CommandReply::Integer(i64::from(self.expire(&key, ttl)))),
            StoreCommand::ListRemove { key, value } => self
                .list_remove(&key, &value)
                .map(|n| CommandReply::Integer(n as i64)),
            StoreCommand::ListPushHead { key, value } => self
                .list_push_head(&key, &value)
                .map(|n| CommandReply::Integer(n as i64)),
            StoreCommand::ListTrim { key, start, stop } => {
                self.list_trim(&key, start, stop).map(|()| CommandReply::Ok)
            }
        };
        reply.unwrap_or_else(CommandReply::Failed)
    }
}

/// Resolves a Redis-style inclusive index range against a list length.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Matches `key` against a Redis glob pattern supporting `*`, `?` and `\` escapes.
fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    let (mut p, mut k) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, k));
                p += 1;
            }
            Some('?') => {
                p += 1;
                k += 1;
            }
            Some('\\') if pattern.get(p + 1) == Some(&key[k]) => {
                p += 2;
                k += 1;
            }
            Some(&c) if c != '\\' && c == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    k = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// In-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        let mut state = self.lock();
        state.purge_expired();
        state.entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }
}

fn command_error(message: String) -> RollcallError {
    RollcallError::StoreUnavailable(message)
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> RollcallResult<Option<String>> {
        self.lock().get(key).map_err(command_error)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> RollcallResult<()> {
        self.lock().set(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> RollcallResult<bool> {
        Ok(self.lock().delete(key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> RollcallResult<bool> {
        Ok(self.lock().expire(key, ttl))
    }

    async fn list_remove(&self, key: &str, value: &str) -> RollcallResult<u64> {
        self.lock().list_remove(key, value).map_err(command_error)
    }

    async fn list_push_head(&self, key: &str, value: &str) -> RollcallResult<u64> {
        self.lock().list_push_head(key, value).map_err(command_error)
    }

    async fn list_trim(&self, key: &str, start: isize, stop: isize) -> RollcallResult<()> {
        self.lock().list_trim(key, start, stop).map_err(command_error)
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> RollcallResult<Vec<String>> {
        self.lock().list_range(key, start, stop).map_err(command_error)
    }

    async fn batch(&self, commands: Vec<StoreCommand>) -> RollcallResult<Vec<CommandReply>> {
        let mut state = self.lock();
        Ok(commands.into_iter().map(|command| state.execute(command)).collect())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> RollcallResult<(u64, Vec<String>)> {
        let mut state = self.lock();
        state.purge_expired();

        let mut keys: Vec<&String> = state.entries.keys().collect();
        keys.sort();

        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(keys.len());
        let end = start.saturating_add(count.max(1)).min(keys.len());
        let matched = keys[start..end]
            .iter()
            .filter(|key| glob_match(pattern, key))
            .map(|key| (*key).clone())
            .collect();

        let next = if end >= keys.len() { SCAN_START } else { end as u64 };
        Ok((next, matched))
    }

    async fn info_memory(&self) -> RollcallResult<String> {
        let mut state = self.lock();
        state.purge_expired();
        let used = state.used_bytes();
        state.peak_bytes = state.peak_bytes.max(used);

        Ok(format!(
            "# Memory\r\nused_memory:{used}\r\nused_memory_human:{used}B\r\nused_memory_peak:{peak}\r\nused_memory_lua:0\r\nmaxmemory_policy:noeviction\r\n",
            used = used,
            peak = state.peak_bytes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store.set("User:1", "{}", None).await.unwrap();
        assert_eq!(store.get("User:1").await.unwrap(), Some("{}".to_string()));

        assert!(store.delete("User:1").await.unwrap());
        assert!(!store.delete("User:1").await.unwrap());
        assert_eq!(store.get("User:1").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_and_refresh() {
        let store = MemoryStore::new();
        store.set("User:1", "a", Some(Duration::from_secs(2))).await.unwrap();

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.expire("User:1", Duration::from_secs(2)).await.unwrap());

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(store.get("User:1").await.unwrap(), Some("a".to_string()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("User:1").await.unwrap(), None);
        assert!(!store.expire("User:1", Duration::from_secs(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_operations() {
        let store = MemoryStore::new();
        for id in ["a", "b", "a", "c"] {
            store.list_push_head("L", id).await.unwrap();
        }
        assert_eq!(store.list_range("L", 0, -1).await.unwrap(), ["c", "a", "b", "a"]);

        assert_eq!(store.list_remove("L", "a").await.unwrap(), 2);
        assert_eq!(store.list_range("L", 0, -1).await.unwrap(), ["c", "b"]);

        store.list_trim("L", 0, 0).await.unwrap();
        assert_eq!(store.list_range("L", 0, 10).await.unwrap(), ["c"]);

        store.list_remove("L", "c").await.unwrap();
        assert_eq!(store.key_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = MemoryStore::new();
        store.list_push_head("L", "a").await.unwrap();
        assert!(store.get("L").await.is_err());

        let replies = store
            .batch(vec![StoreCommand::get("L"), StoreCommand::list_push_head("L", "b")])
            .await
            .unwrap();
        assert!(replies[0].is_failure());
        assert_eq!(replies[1], CommandReply::Integer(2));
    }

    #[tokio::test]
    async fn test_batch_replies_in_order() {
        let store = MemoryStore::new();
        let replies = store
            .batch(vec![
                StoreCommand::set("K", "v", None),
                StoreCommand::get("K"),
                StoreCommand::get("missing"),
                StoreCommand::delete("K"),
            ])
            .await
            .unwrap();

        assert_eq!(
            replies,
            [
                CommandReply::Ok,
                CommandReply::Value("v".to_string()),
                CommandReply::Absent,
                CommandReply::Integer(1),
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_visits_every_matching_key() {
        let store = MemoryStore::new();
        for i in 0..25 {
            store.set(&format!("User:{i}"), "{}", None).await.unwrap();
        }
        store.list_push_head("UserList:latest", "1").await.unwrap();
        store.set("Board:1", "{}", None).await.unwrap();

        let mut cursor = SCAN_START;
        let mut total = 0;
        let mut rounds = 0;
        loop {
            let (next, keys) = store.scan(cursor, "User:*", 10).await.unwrap();
            total += keys.len();
            rounds += 1;
            cursor = next;
            if cursor == SCAN_START {
                break;
            }
        }
        assert_eq!(total, 25);
        assert_eq!(rounds, 3);
    }

    #[tokio::test]
    async fn test_info_memory_report() {
        let store = MemoryStore::new();
        store.set("User:1", "12345", None).await.unwrap();
        store.delete("User:1").await.unwrap();

        let report = store.info_memory().await.unwrap();
        assert!(report.starts_with("# Memory"));
        assert!(report.contains("used_memory:0\r\n"));
        assert!(report.contains("used_memory_peak:11\r\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_across_threads() {
        let store = std::sync::Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let id = i.to_string();
                    store
                        .batch(vec![
                            StoreCommand::set(format!("User:{id}"), "{}", None),
                            StoreCommand::list_push_head("UserList:latest", id),
                        ])
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.key_count(), 17);
        assert_eq!(store.list_range("UserList:latest", 0, -1).await.unwrap().len(), 16);
    }

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(5, 0, -1), Some((0, 4)));
        assert_eq!(resolve_range(5, 0, 2), Some((0, 2)));
        assert_eq!(resolve_range(5, -2, -1), Some((3, 4)));
        assert_eq!(resolve_range(5, 0, 99), Some((0, 4)));
        assert_eq!(resolve_range(5, 6, 9), None);
        assert_eq!(resolve_range(0, 0, -1), None);
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("User:*", "User:42"));
        assert!(glob_match("User:*", "User:"));
        assert!(!glob_match("User:*", "UserList:latest"));
        assert!(glob_match("*List:latest", "UserList:latest"));
        assert!(glob_match("User:?", "User:7"));
        assert!(!glob_match("User:?", "User:77"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(glob_match("\\*", "*"));
    }
}
