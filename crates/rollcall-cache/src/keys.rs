//! Key derivation for cached domains.

/// Derives the store keys used by one cached domain.
pub trait KeySpace: Send + Sync {
    /// Key of the item record for `id`.
    fn item_key(&self, id: &str) -> String;

    /// Key of the domain's index list.
    fn list_key(&self) -> String;

    /// Glob pattern matching every item record of the domain.
    fn pattern(&self) -> String;

    /// Label used in logs and metrics.
    fn domain(&self) -> &str;
}

/// The standard layout: `<Domain>:<id>` items and a `<Domain>List:latest` index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainKeys {
    domain: String,
}

impl DomainKeys {
    /// Creates the key layout for `domain`.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

impl KeySpace for DomainKeys {
    fn item_key(&self, id: &str) -> String {
        format!("{}:{}", self.domain, id)
    }

    fn list_key(&self) -> String {
        format!("{}List:latest", self.domain)
    }

    fn pattern(&self) -> String {
        format!("{}:*", self.domain)
    }

    fn domain(&self) -> &str {
        &self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_keys() {
        let keys = DomainKeys::new("User");
        assert_eq!(keys.item_key("42"), "User:42");
        assert_eq!(keys.list_key(), "UserList:latest");
        assert_eq!(keys.pattern(), "User:*");
        assert_eq!(keys.domain(), "User");
    }

    #[test]
    fn test_list_key_is_outside_item_pattern() {
        let keys = DomainKeys::new("Board");
        assert_eq!(keys.list_key(), "BoardList:latest");
        assert!(!keys.list_key().starts_with("Board:"));
    }
}
