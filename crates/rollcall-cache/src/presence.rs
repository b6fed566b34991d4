//! Online presence cache.

use crate::indexed_cache::IndexedCache;
use crate::metrics::CacheMetrics;
use chrono::{DateTime, Utc};
use rollcall_config::{DomainConfig, GhostPolicy};
use rollcall_core::RollcallResult;
use rollcall_store::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A connected user as recorded by the presence cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub user_id: String,
    #[serde(default)]
    pub socket_id: Option<String>,
    pub last_seen: DateTime<Utc>,
}

impl OnlineUser {
    /// Creates a record seen now.
    pub fn new(user_id: impl Into<String>, socket_id: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            socket_id,
            last_seen: Utc::now(),
        }
    }
}

/// Presence cache for the `User` domain.
///
/// Records expire after the domain TTL unless read: every hit on
/// [`get_online_user`](Self::get_online_user) pushes the expiry out again.
/// Reads never reorder the index list, so it stays ordered by last write.
#[derive(Debug)]
pub struct OnlineUserCache {
    inner: IndexedCache<OnlineUser>,
}

impl OnlineUserCache {
    /// Creates the presence cache from its domain settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the limit is zero.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        domain: &DomainConfig,
        ghost_policy: GhostPolicy,
    ) -> RollcallResult<Self> {
        Ok(Self {
            inner: IndexedCache::from_config(store, domain, ghost_policy)?,
        })
    }

    /// Creates the presence cache with the default `User` settings.
    ///
    /// # Errors
    ///
    /// Never fails with the default settings; the signature matches [`Self::new`].
    pub fn with_defaults(store: Arc<dyn KeyValueStore>) -> RollcallResult<Self> {
        Self::new(store, &DomainConfig::online_users(), GhostPolicy::default())
    }

    /// Records `user` as online and moves them to the head of the list.
    pub async fn set_online_user(&self, user: &OnlineUser) -> RollcallResult<()> {
        self.inner.add(&user.user_id, user).await
    }

    /// Looks up an online user, refreshing their TTL on a hit.
    pub async fn get_online_user(&self, user_id: &str) -> RollcallResult<Option<OnlineUser>> {
        let user = self.inner.get(user_id).await?;

        if user.is_some() {
            if let Some(ttl) = self.inner.ttl() {
                let key = self.inner.keys().item_key(user_id);
                if self.inner.store().expire(&key, ttl).await? {
                    CacheMetrics::ttl_refreshed(self.inner.keys().domain());
                    debug!(user_id, ttl_secs = ttl.as_secs(), "Refreshed presence TTL");
                }
            }
        }

        Ok(user)
    }

    /// Removes a user from the presence cache.
    pub async fn delete_online_user(&self, user_id: &str) -> RollcallResult<()> {
        self.inner.delete(user_id).await
    }

    /// Returns the most recently active online users.
    pub async fn online_users(&self) -> RollcallResult<Vec<OnlineUser>> {
        self.inner.get_list().await
    }

    /// The underlying index manager.
    pub const fn index(&self) -> &IndexedCache<OnlineUser> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_online_user_wire_format() {
        let user = OnlineUser {
            user_id: "42".to_string(),
            socket_id: Some("abc".to_string()),
            last_seen: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };

        let json: serde_json::Value = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userId"], "42");
        assert_eq!(json["socketId"], "abc");
        assert_eq!(json["lastSeen"], "2024-01-02T03:04:05Z");
    }

    #[test]
    fn test_online_user_without_socket() {
        let user: OnlineUser =
            serde_json::from_str(r#"{"userId":"7","lastSeen":"2024-01-02T03:04:05Z"}"#).unwrap();
        assert_eq!(user.user_id, "7");
        assert_eq!(user.socket_id, None);
    }

    #[test]
    fn test_defaults() {
        let store = Arc::new(rollcall_store::MemoryStore::new());
        let cache = OnlineUserCache::with_defaults(store).unwrap();
        assert_eq!(cache.index().limit(), 20);
        assert_eq!(cache.index().ttl(), Some(std::time::Duration::from_secs(1800)));
        assert_eq!(cache.index().keys().list_key(), "UserList:latest");
    }
}
