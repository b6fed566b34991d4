//! Cache index manager.
//!
//! Keeps per-id item records alongside a bounded, deduplicated recency list
//! of ids for one domain. The list is reconciled against the item records
//! lazily: ids whose record is gone ("ghosts") are pruned by [`IndexedCache::get_list`].

use crate::keys::{DomainKeys, KeySpace};
use crate::metrics::CacheMetrics;
use rollcall_config::{DomainConfig, GhostPolicy};
use rollcall_core::{RollcallError, RollcallResult};
use rollcall_store::{CommandReply, KeyValueStore, StoreCommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Generic add/get/list/delete engine for one cached domain.
pub struct IndexedCache<T> {
    store: Arc<dyn KeyValueStore>,
    keys: Arc<dyn KeySpace>,
    ttl: Option<Duration>,
    limit: usize,
    ghost_policy: GhostPolicy,
    _record: PhantomData<fn() -> T>,
}

impl<T> IndexedCache<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a cache over `store` using the given key layout.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `limit` is zero.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        keys: impl KeySpace + 'static,
        ttl: Option<Duration>,
        limit: usize,
    ) -> RollcallResult<Self> {
        if limit == 0 {
            return Err(RollcallError::configuration(format!(
                "Index limit for domain '{}' must be positive",
                keys.domain()
            )));
        }

        Ok(Self {
            store,
            keys: Arc::new(keys),
            ttl,
            limit,
            ghost_policy: GhostPolicy::default(),
            _record: PhantomData,
        })
    }

    /// Creates a cache for a configured domain with the standard key layout.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configured limit is zero.
    pub fn from_config(
        store: Arc<dyn KeyValueStore>,
        domain: &DomainConfig,
        ghost_policy: GhostPolicy,
    ) -> RollcallResult<Self> {
        Ok(Self::new(store, DomainKeys::new(domain.domain.clone()), domain.ttl(), domain.limit)?
            .with_ghost_policy(ghost_policy))
    }

    /// Sets how failed point reads are treated during list reconciliation.
    #[must_use]
    pub fn with_ghost_policy(mut self, ghost_policy: GhostPolicy) -> Self {
        self.ghost_policy = ghost_policy;
        self
    }

    /// Key layout of this cache.
    pub fn keys(&self) -> &dyn KeySpace {
        self.keys.as_ref()
    }

    /// Item TTL, if any.
    pub const fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Maximum length of the index list.
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Store handle shared with the rest of the process.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn last_index(&self) -> isize {
        isize::try_from(self.limit).map_or(isize::MAX, |limit| limit - 1)
    }

    /// Writes the record for `id` and moves `id` to the head of the index list.
    ///
    /// The record write, the list dedup, the push and the trim go out as one
    /// batch. They are not isolated from concurrent writers.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if `value` cannot be encoded, or
    /// `StoreUnavailable` if the batch or any command in it failed.
    pub async fn add(&self, id: &str, value: &T) -> RollcallResult<()> {
        let payload = serde_json::to_string(value)?;
        let list_key = self.keys.list_key();

        let commands = vec![
            StoreCommand::set(self.keys.item_key(id), payload, self.ttl),
            StoreCommand::list_remove(list_key.clone(), id),
            StoreCommand::list_push_head(list_key.clone(), id),
            StoreCommand::list_trim(list_key, 0, self.last_index()),
        ];
        let names: Vec<&'static str> = commands.iter().map(StoreCommand::name).collect();
        let replies = self.store.batch(commands).await?;

        let failures: Vec<String> = names
            .iter()
            .zip(&replies)
            .filter_map(|(name, reply)| match reply {
                CommandReply::Failed(reason) => Some(format!("{}: {}", name, reason)),
                _ => None,
            })
            .collect();
        if !failures.is_empty() {
            warn!(domain = self.keys.domain(), id, ?failures, "Cache add partially failed");
            return Err(RollcallError::store(format!(
                "Failed to add '{}': {}",
                self.keys.item_key(id),
                failures.join("; ")
            )));
        }

        CacheMetrics::added(self.keys.domain());
        debug!(domain = self.keys.domain(), id, "Added to cache index");
        Ok(())
    }

    /// Reads the record for `id`. Does not touch the index list.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the read failed, or `Serialization` if
    /// the stored record cannot be decoded.
    pub async fn get(&self, id: &str) -> RollcallResult<Option<T>> {
        let raw = self.store.get(&self.keys.item_key(id)).await?;
        CacheMetrics::lookup(self.keys.domain(), raw.is_some());

        raw.map(|raw| serde_json::from_str(&raw).map_err(RollcallError::from))
            .transpose()
    }

    /// Returns the cached records in recency order, pruning ghosts from the
    /// index list on the way.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the list read, the point reads or the
    /// pruning batch could not be executed.
    pub async fn get_list(&self) -> RollcallResult<Vec<T>> {
        let list_key = self.keys.list_key();
        let ids = self.store.list_range(&list_key, 0, self.last_index()).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let reads = ids
            .iter()
            .map(|id| StoreCommand::get(self.keys.item_key(id)))
            .collect();
        let replies = self.store.batch(reads).await?;

        let mut records = Vec::with_capacity(ids.len());
        let mut ghosts = Vec::new();
        for (id, reply) in ids.iter().zip(replies) {
            match reply {
                CommandReply::Value(raw) => match serde_json::from_str(&raw) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!(domain = self.keys.domain(), id = %id, error = %e, "Undecodable cache record");
                        ghosts.push(id.as_str());
                    }
                },
                CommandReply::Absent => ghosts.push(id.as_str()),
                other => match self.ghost_policy {
                    GhostPolicy::PruneOnFailure => ghosts.push(id.as_str()),
                    GhostPolicy::PruneOnAbsence => {
                        warn!(domain = self.keys.domain(), id = %id, reply = ?other, "Point read failed, keeping id in index");
                    }
                },
            }
        }

        if !ghosts.is_empty() {
            self.prune(&list_key, &ghosts).await?;
        }

        Ok(records)
    }

    async fn prune(&self, list_key: &str, ghosts: &[&str]) -> RollcallResult<()> {
        let removals = ghosts
            .iter()
            .map(|id| StoreCommand::list_remove(list_key, *id))
            .collect();
        let replies = self.store.batch(removals).await?;

        for (id, reply) in ghosts.iter().zip(&replies) {
            if let CommandReply::Failed(reason) = reply {
                warn!(domain = self.keys.domain(), id, reason = %reason, "Failed to prune ghost");
            }
        }

        CacheMetrics::ghosts_pruned(self.keys.domain(), ghosts.len());
        debug!(domain = self.keys.domain(), count = ghosts.len(), "Pruned ghosts from index");
        Ok(())
    }

    /// Deletes the record for `id` and removes `id` from the index list.
    ///
    /// Both commands go out in one batch; a concurrent `add` may interleave.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the batch or either command failed.
    pub async fn delete(&self, id: &str) -> RollcallResult<()> {
        let item_key = self.keys.item_key(id);
        let replies = self
            .store
            .batch(vec![
                StoreCommand::delete(item_key.clone()),
                StoreCommand::list_remove(self.keys.list_key(), id),
            ])
            .await?;

        if let Some(CommandReply::Failed(reason)) = replies.iter().find(|reply| reply.is_failure()) {
            return Err(RollcallError::store(format!(
                "Failed to delete '{}': {}",
                item_key, reason
            )));
        }

        CacheMetrics::deleted(self.keys.domain());
        debug!(domain = self.keys.domain(), id, "Deleted from cache index");
        Ok(())
    }
}

impl<T> fmt::Debug for IndexedCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedCache")
            .field("domain", &self.keys.domain())
            .field("ttl", &self.ttl)
            .field("limit", &self.limit)
            .field("ghost_policy", &self.ghost_policy)
            .finish_non_exhaustive()
    }
}
