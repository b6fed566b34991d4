//! Redis implementation of [`KeyValueStore`].

use crate::{CommandReply, KeyValueStore, StoreCommand};
use async_trait::async_trait;
use deadpool_redis::redis::aio::ConnectionLike;
use deadpool_redis::redis::{self, AsyncCommands, RedisResult, Value};
use deadpool_redis::Pool;
use rollcall_core::{RollcallError, RollcallResult};
use shaku::Component;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Redis store backed by a connection pool.
///
/// Built without a pool (the DI default, or when Redis is disabled) every
/// call fails with [`RollcallError::StoreUnavailable`].
#[derive(Component)]
#[shaku(interface = KeyValueStore)]
pub struct RedisStore {
    /// Redis connection pool.
    pool: Option<Arc<Pool>>,
}

impl RedisStore {
    /// Create a new Redis store.
    #[must_use]
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool: Some(pool) }
    }

    /// Create a store with no connection (for when Redis is disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    /// Returns true if a pool is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    async fn get_conn(&self) -> RollcallResult<deadpool_redis::Connection> {
        match &self.pool {
            Some(pool) => pool.get().await.map_err(|e| {
                RollcallError::store(format!("Failed to get Redis connection: {}", e))
            }),
            None => Err(RollcallError::store("Redis is disabled")),
        }
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn push_command(pipe: &mut redis::Pipeline, command: &StoreCommand) {
    match command {
        StoreCommand::Get { key } => {
            pipe.cmd("GET").arg(key);
        }
        StoreCommand::Set { key, value, ttl } => {
            pipe.cmd("SET").arg(key).arg(value);
            if let Some(ttl) = ttl {
                pipe.arg("EX").arg(ttl_secs(*ttl));
            }
        }
        StoreCommand::Delete { key } => {
            pipe.cmd("DEL").arg(key);
        }
        StoreCommand::Expire { key, ttl } => {
            pipe.cmd("EXPIRE").arg(key).arg(ttl_secs(*ttl));
        }
        StoreCommand::ListRemove { key, value } => {
            pipe.cmd("LREM").arg(key).arg(0).arg(value);
        }
        StoreCommand::ListPushHead { key, value } => {
            pipe.cmd("LPUSH").arg(key).arg(value);
        }
        StoreCommand::ListTrim { key, start, stop } => {
            pipe.cmd("LTRIM").arg(key).arg(*start).arg(*stop);
        }
    }
}

fn to_reply(value: Value) -> CommandReply {
    match value {
        Value::ServerError(err) => CommandReply::Failed(redis::RedisError::from(err).to_string()),
        Value::Nil => CommandReply::Absent,
        Value::Okay => CommandReply::Ok,
        Value::Int(n) => CommandReply::Integer(n),
        other => match redis::from_redis_value::<String>(&other) {
            Ok(text) => CommandReply::Value(text),
            Err(e) => CommandReply::Failed(e.to_string()),
        },
    }
}

/// Sends `commands` as one pipeline and keeps every reply, server errors included.
///
/// `Pipeline::query_async` fails the whole pipeline on the first error reply,
/// so the packed commands go straight to the connection instead.
async fn execute_pipeline<C>(conn: &mut C, commands: &[StoreCommand]) -> RedisResult<Vec<CommandReply>>
where
    C: ConnectionLike + Send,
{
    let mut pipe = redis::pipe();
    for command in commands {
        push_command(&mut pipe, command);
    }

    let values = conn.req_packed_commands(&pipe, 0, commands.len()).await?;
    Ok(values.into_iter().map(to_reply).collect())
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> RollcallResult<Option<String>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await.map_err(|e| {
            RollcallError::store(format!("Failed to get key '{}': {}", key, e))
        })?;

        match &value {
            Some(_) => debug!(target: "rollcall::redis", "Hit for key '{}'", key),
            None => debug!(target: "rollcall::redis", "Miss for key '{}'", key),
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> RollcallResult<()> {
        let mut conn = self.get_conn().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ttl_secs(ttl));
        }

        cmd.query_async::<()>(&mut conn).await.map_err(|e| {
            RollcallError::store(format!("Failed to set key '{}': {}", key, e))
        })?;

        debug!(target: "rollcall::redis", "Set key '{}' with TTL {:?}", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> RollcallResult<bool> {
        let mut conn = self.get_conn().await?;
        let deleted: i64 = conn.del(key).await.map_err(|e| {
            RollcallError::store(format!("Failed to delete key '{}': {}", key, e))
        })?;

        Ok(deleted > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> RollcallResult<bool> {
        let mut conn = self.get_conn().await?;
        let updated: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| RollcallError::store(format!("Failed to expire key '{}': {}", key, e)))?;

        Ok(updated == 1)
    }

    async fn list_remove(&self, key: &str, value: &str) -> RollcallResult<u64> {
        let mut conn = self.get_conn().await?;
        let removed: u64 = redis::cmd("LREM")
            .arg(key)
            .arg(0)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(|e| RollcallError::store(format!("Failed LREM on '{}': {}", key, e)))?;

        Ok(removed)
    }

    async fn list_push_head(&self, key: &str, value: &str) -> RollcallResult<u64> {
        let mut conn = self.get_conn().await?;
        let len: u64 = conn.lpush(key, value).await.map_err(|e| {
            RollcallError::store(format!("Failed LPUSH on '{}': {}", key, e))
        })?;

        Ok(len)
    }

    async fn list_trim(&self, key: &str, start: isize, stop: isize) -> RollcallResult<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("LTRIM")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| RollcallError::store(format!("Failed LTRIM on '{}': {}", key, e)))?;

        Ok(())
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> RollcallResult<Vec<String>> {
        let mut conn = self.get_conn().await?;
        let values: Vec<String> = conn.lrange(key, start, stop).await.map_err(|e| {
            RollcallError::store(format!("Failed LRANGE on '{}': {}", key, e))
        })?;

        Ok(values)
    }

    async fn batch(&self, commands: Vec<StoreCommand>) -> RollcallResult<Vec<CommandReply>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.get_conn().await?;
        let replies = execute_pipeline(&mut conn, &commands)
            .await
            .map_err(|e| RollcallError::store(format!("Pipeline of {} commands failed: {}", commands.len(), e)))?;

        for (command, reply) in commands.iter().zip(&replies) {
            if let CommandReply::Failed(reason) = reply {
                warn!(target: "rollcall::redis", command = command.name(), key = command.key(), reason = %reason, "Pipelined command failed");
            }
        }

        debug!(target: "rollcall::redis", commands = commands.len(), "Executed pipeline");
        Ok(replies)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> RollcallResult<(u64, Vec<String>)> {
        let mut conn = self.get_conn().await?;
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(|e| RollcallError::store(format!("Failed to scan '{}': {}", pattern, e)))?;

        Ok((next, keys))
    }

    async fn info_memory(&self) -> RollcallResult<String> {
        let mut conn = self.get_conn().await?;
        let report: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut conn)
            .await
            .map_err(|e| RollcallError::store(format!("Failed to read INFO memory: {}", e)))?;

        Ok(report)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadpool_redis::redis::RedisFuture;

    /// Connection that answers every pipeline with canned replies.
    struct CannedConnection {
        replies: Vec<Value>,
        sent: usize,
    }

    impl ConnectionLike for CannedConnection {
        fn req_packed_command<'a>(&'a mut self, _cmd: &'a redis::Cmd) -> RedisFuture<'a, Value> {
            Box::pin(async { Ok(Value::Nil) })
        }

        fn req_packed_commands<'a>(
            &'a mut self,
            _cmd: &'a redis::Pipeline,
            _offset: usize,
            count: usize,
        ) -> RedisFuture<'a, Vec<Value>> {
            self.sent += count;
            let replies = self.replies.clone();
            Box::pin(async move { Ok(replies) })
        }

        fn get_db(&self) -> i64 {
            0
        }
    }

    fn server_error(line: &str) -> Value {
        redis::parse_redis_value(format!("-{}\r\n", line).as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_keeps_replies_after_server_error() {
        let mut conn = CannedConnection {
            replies: vec![
                Value::BulkString(b"{}".to_vec()),
                server_error("WRONGTYPE Operation against a key holding the wrong kind of value"),
                Value::Nil,
            ],
            sent: 0,
        };
        let commands = [
            StoreCommand::get("User:1"),
            StoreCommand::get("UserList:latest"),
            StoreCommand::get("User:2"),
        ];

        let replies = execute_pipeline(&mut conn, &commands).await.unwrap();

        assert_eq!(conn.sent, 3);
        assert_eq!(replies[0], CommandReply::Value("{}".to_string()));
        assert!(matches!(&replies[1], CommandReply::Failed(reason) if reason.contains("WRONGTYPE")));
        assert_eq!(replies[2], CommandReply::Absent);
    }

    #[tokio::test]
    async fn test_disabled_store_fails_fast() {
        let store = RedisStore::disabled();
        assert!(!store.is_enabled());

        let err = store.get("User:1").await.unwrap_err();
        assert!(err.is_retriable());
        assert!(store.info_memory().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_needs_no_connection() {
        let store = RedisStore::disabled();
        let replies = store.batch(Vec::new()).await.unwrap();
        assert!(replies.is_empty());
    }

    #[test]
    fn test_reply_mapping() {
        assert_eq!(to_reply(Value::Nil), CommandReply::Absent);
        assert_eq!(to_reply(Value::Okay), CommandReply::Ok);
        assert_eq!(to_reply(Value::Int(3)), CommandReply::Integer(3));
        assert_eq!(
            to_reply(Value::BulkString(b"{\"a\":1}".to_vec())),
            CommandReply::Value("{\"a\":1}".to_string())
        );
        assert!(to_reply(Value::Array(vec![Value::Int(1)])).is_failure());
        assert!(to_reply(server_error("READONLY You can't write against a read only replica.")).is_failure());
    }

    #[test]
    fn test_ttl_is_at_least_one_second() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(1800)), 1800);
    }
}
