//! Commands and replies for batched execution.

use std::time::Duration;

/// A single store command issued as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// GET key
    Get { key: String },
    /// SET key value [EX ttl]
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    /// DEL key
    Delete { key: String },
    /// EXPIRE key ttl
    Expire { key: String, ttl: Duration },
    /// LREM key 0 value
    ListRemove { key: String, value: String },
    /// LPUSH key value
    ListPushHead { key: String, value: String },
    /// LTRIM key start stop
    ListTrim { key: String, start: isize, stop: isize },
}

impl StoreCommand {
    /// Creates a GET command.
    pub fn get(key: impl Into<String>) -> Self {
        Self::Get { key: key.into() }
    }

    /// Creates a SET command with an optional expiry.
    pub fn set(key: impl Into<String>, value: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
            ttl,
        }
    }

    /// Creates a DEL command.
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// Creates an EXPIRE command.
    pub fn expire(key: impl Into<String>, ttl: Duration) -> Self {
        Self::Expire {
            key: key.into(),
            ttl,
        }
    }

    /// Creates an LREM command removing every occurrence of `value`.
    pub fn list_remove(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ListRemove {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates an LPUSH command.
    pub fn list_push_head(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ListPushHead {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates an LTRIM command.
    pub fn list_trim(key: impl Into<String>, start: isize, stop: isize) -> Self {
        Self::ListTrim {
            key: key.into(),
            start,
            stop,
        }
    }

    /// The Redis command name, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "GET",
            Self::Set { .. } => "SET",
            Self::Delete { .. } => "DEL",
            Self::Expire { .. } => "EXPIRE",
            Self::ListRemove { .. } => "LREM",
            Self::ListPushHead { .. } => "LPUSH",
            Self::ListTrim { .. } => "LTRIM",
        }
    }

    /// The key this command operates on.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Get { key }
            | Self::Set { key, .. }
            | Self::Delete { key }
            | Self::Expire { key, .. }
            | Self::ListRemove { key, .. }
            | Self::ListPushHead { key, .. }
            | Self::ListTrim { key, .. } => key,
        }
    }
}

/// Outcome of one command in a batch, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// Status reply (`OK`).
    Ok,
    /// Bulk string reply.
    Value(String),
    /// Integer reply (counts, booleans).
    Integer(i64),
    /// Nil reply: the key does not exist.
    Absent,
    /// The command itself failed; the rest of the batch still ran.
    Failed(String),
}

impl CommandReply {
    /// Returns true if the command failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Consumes the reply, returning the bulk string if there was one.
    #[must_use]
    pub fn into_value(self) -> Option<String> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}
