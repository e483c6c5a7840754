//! In-memory cache implementation using moka
//!
//! Entries hold serialized JSON and expire individually: each `set` carries
//! its own TTL, enforced through a moka expiry policy.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
struct CacheEntry {
    /// JSON-serialized value
    data: Arc<String>,
    ttl: Duration,
}

impl CacheEntry {
    fn new<T: Serialize>(value: &T, ttl: Duration) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self {
            data: Arc::new(json),
            ttl,
        })
    }

    fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).context("Failed to deserialize cache value")
    }
}

/// Expire each entry after the TTL it was stored with
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &CacheEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory cache using moka
pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
    /// TTL the services use when storing entries
    default_ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
    }

    pub fn with_capacity_and_ttl(max_capacity: u64, default_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self { cache, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Number of live entries, after pending maintenance has run
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    /// Glob match where `*` is any run of characters and `?` is one character
    fn pattern_matches(pattern: &str, key: &str) -> bool {
        let pattern: Vec<char> = pattern.chars().collect();
        let key: Vec<char> = key.chars().collect();

        let (mut p, mut k) = (0, 0);
        // Position of the last `*` seen and the key index it was tried at
        let mut backtrack: Option<(usize, usize)> = None;

        while k < key.len() {
            match pattern.get(p) {
                Some('*') => {
                    backtrack = Some((p, k));
                    p += 1;
                }
                Some(&c) if c == '?' || c == key[k] => {
                    p += 1;
                    k += 1;
                }
                _ => match backtrack {
                    Some((star, star_k)) => {
                        p = star + 1;
                        k = star_k + 1;
                        backtrack = Some((star, star_k + 1));
                    }
                    None => return false,
                },
            }
        }

        pattern[p..].iter().all(|&c| c == '*')
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, ttl)?;
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        // Full scan; the cache only holds a handful of key families
        let keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| Self::pattern_matches(pattern, key.as_str()))
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        for key in keys {
            self.cache.invalidate(&key).await;
        }

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();

        cache.set("theme", &"Nebulae".to_string(), Duration::from_secs(60)).await.unwrap();

        let result: Option<String> = cache.get("theme").await.unwrap();
        assert_eq!(result, Some("Nebulae".to_string()));
        let missing: Option<String> = cache.get("other").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_own_ttl() {
        let cache = MemoryCache::with_capacity_and_ttl(100, Duration::from_secs(3600));

        cache.set("short", &1_i64, Duration::from_millis(20)).await.unwrap();
        cache.set("long", &2_i64, Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.get::<i64>("short").await.unwrap(), None);
        assert_eq!(cache.get::<i64>("long").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_get_with_wrong_type_is_error() {
        let cache = MemoryCache::new();
        cache.set("k", &"text".to_string(), Duration::from_secs(60)).await.unwrap();

        assert!(cache.get::<Vec<i64>>("k").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_delete_pattern() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("astronomy_show:1", &1, ttl).await.unwrap();
        cache.set("astronomy_show:2", &2, ttl).await.unwrap();
        cache.set("show_themes:all", &3, ttl).await.unwrap();

        cache.delete("astronomy_show:1").await.unwrap();
        assert_eq!(cache.get::<i32>("astronomy_show:1").await.unwrap(), None);

        cache.delete_pattern("astronomy_show:*").await.unwrap();
        assert_eq!(cache.get::<i32>("astronomy_show:2").await.unwrap(), None);
        assert_eq!(cache.get::<i32>("show_themes:all").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new();
        cache.set("a", &1, Duration::from_secs(60)).await.unwrap();
        cache.set("b", &2, Duration::from_secs(60)).await.unwrap();

        cache.clear().await.unwrap();

        assert_eq!(cache.entry_count().await, 0);
        assert_eq!(cache.get::<i32>("a").await.unwrap(), None);
    }

    #[test]
    fn test_pattern_matches() {
        assert!(MemoryCache::pattern_matches("astronomy_show:*", "astronomy_show:12"));
        assert!(MemoryCache::pattern_matches("*", ""));
        assert!(MemoryCache::pattern_matches("a?c", "abc"));
        assert!(MemoryCache::pattern_matches("a*b*c", "a-b-b-c"));
        assert!(!MemoryCache::pattern_matches("a?c", "ac"));
        assert!(!MemoryCache::pattern_matches("show_themes:*", "astronomy_show:1"));
        assert!(!MemoryCache::pattern_matches("abc", "abcd"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(50))]

            /// A prefix pattern matches every key that starts with the prefix
            #[test]
            fn prefix_pattern_matches_extensions(prefix in "[a-z:]{0,10}", rest in "[a-z0-9]{0,10}") {
                let pattern = format!("{}*", prefix);
                let key = format!("{}{}", prefix, rest);
                prop_assert!(MemoryCache::pattern_matches(&pattern, &key));
            }

            /// A pattern without wildcards matches only itself
            #[test]
            fn literal_pattern_is_equality(a in "[a-z]{0,8}", b in "[a-z]{0,8}") {
                prop_assert_eq!(MemoryCache::pattern_matches(&a, &b), a == b);
            }
        }
    }
}
