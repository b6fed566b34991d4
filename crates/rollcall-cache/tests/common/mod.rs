//! Common test infrastructure for cache integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rollcall_core::{RollcallError, RollcallResult};
use rollcall_store::{CommandReply, KeyValueStore, MemoryStore, StoreCommand};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Store wrapper that injects failures and counts round trips.
///
/// Delegates to a [`MemoryStore`] unless told to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    offline: AtomicBool,
    failing_reads: Mutex<HashSet<String>>,
    round_trips: AtomicUsize,
    batches: Mutex<Vec<Vec<StoreCommand>>>,
    scan_pages: Mutex<Option<HashMap<u64, (u64, Vec<String>)>>>,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every call fail as if the connection were lost.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes batched GETs of `key` reply with a command failure.
    pub fn fail_reads_of(&self, key: &str) {
        self.failing_reads.lock().unwrap().insert(key.to_string());
    }

    /// Replaces SCAN with fixed pages keyed by cursor, ignoring the pattern.
    ///
    /// Each entry maps a cursor to the next cursor and the keys of that page,
    /// the way a server may return a key again while it rehashes.
    pub fn script_scan(&self, pages: &[(u64, u64, &[&str])]) {
        let pages = pages
            .iter()
            .map(|(cursor, next, keys)| (*cursor, (*next, keys.iter().map(ToString::to_string).collect())))
            .collect();
        *self.scan_pages.lock().unwrap() = Some(pages);
    }

    /// Number of store calls made so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Every batch issued so far, in order.
    pub fn batches(&self) -> Vec<Vec<StoreCommand>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn enter(&self) -> RollcallResult<()> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(RollcallError::store("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> RollcallResult<Option<String>> {
        self.enter()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> RollcallResult<()> {
        self.enter()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> RollcallResult<bool> {
        self.enter()?;
        self.inner.delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> RollcallResult<bool> {
        self.enter()?;
        self.inner.expire(key, ttl).await
    }

    async fn list_remove(&self, key: &str, value: &str) -> RollcallResult<u64> {
        self.enter()?;
        self.inner.list_remove(key, value).await
    }

    async fn list_push_head(&self, key: &str, value: &str) -> RollcallResult<u64> {
        self.enter()?;
        self.inner.list_push_head(key, value).await
    }

    async fn list_trim(&self, key: &str, start: isize, stop: isize) -> RollcallResult<()> {
        self.enter()?;
        self.inner.list_trim(key, start, stop).await
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> RollcallResult<Vec<String>> {
        self.enter()?;
        self.inner.list_range(key, start, stop).await
    }

    async fn batch(&self, commands: Vec<StoreCommand>) -> RollcallResult<Vec<CommandReply>> {
        self.enter()?;
        self.batches.lock().unwrap().push(commands.clone());

        let failing = self.failing_reads.lock().unwrap().clone();
        let mut replies = self.inner.batch(commands.clone()).await?;
        for (command, reply) in commands.iter().zip(replies.iter_mut()) {
            if let StoreCommand::Get { key } = command {
                if failing.contains(key) {
                    *reply = CommandReply::Failed("READONLY simulated failure".to_string());
                }
            }
        }
        Ok(replies)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> RollcallResult<(u64, Vec<String>)> {
        self.enter()?;
        let scripted = self.scan_pages.lock().unwrap().as_ref().map(|pages| pages.get(&cursor).cloned());
        if let Some(page) = scripted {
            return page.ok_or_else(|| RollcallError::store(format!("invalid cursor {}", cursor)));
        }
        self.inner.scan(cursor, pattern, count).await
    }

    async fn info_memory(&self) -> RollcallResult<String> {
        self.enter()?;
        self.inner.info_memory().await
    }
}
