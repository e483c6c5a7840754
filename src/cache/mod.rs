//! Response cache
//!
//! Process-local cache of serialized lookups (theme list, show details).
//! Entries are stored as JSON so any serializable value can be cached, and
//! are invalidated by the services that write the underlying rows.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// The methods are generic, so the trait is not object safe; hold the
/// concrete cache behind an `Arc` instead.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values whose key matches a glob pattern (`*`, `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Cache keys used by the services
pub mod keys {
    pub const SHOW_THEMES: &str = "show_themes:all";

    pub const ASTRONOMY_SHOW_PATTERN: &str = "astronomy_show:*";

    pub fn astronomy_show(id: i64) -> String {
        format!("astronomy_show:{}", id)
    }
}

/// Create the cache described by `config`
pub fn create_cache(config: &CacheConfig) -> Arc<MemoryCache> {
    let ttl = Duration::from_secs(config.ttl_seconds);
    Arc::new(MemoryCache::with_capacity_and_ttl(config.max_capacity, ttl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_cache_from_config() {
        let config = CacheConfig {
            ttl_seconds: 60,
            max_capacity: 100,
        };
        let cache = create_cache(&config);
        assert_eq!(cache.default_ttl(), Duration::from_secs(60));

        cache
            .set(keys::SHOW_THEMES, &vec!["Stars".to_string()], cache.default_ttl())
            .await
            .unwrap();
        let themes: Option<Vec<String>> = cache.get(keys::SHOW_THEMES).await.unwrap();
        assert_eq!(themes, Some(vec!["Stars".to_string()]));
    }

    #[test]
    fn test_astronomy_show_key_matches_pattern() {
        assert_eq!(keys::astronomy_show(42), "astronomy_show:42");
        assert!(keys::ASTRONOMY_SHOW_PATTERN.ends_with('*'));
    }
}
