//! Cache adapter over a string key-value store with TTL expiry.
//!
//! Stores implement [`CacheStore`] and report failures as [`CacheError`].
//! [`Cache`] wraps a store and turns every read into a [`CacheLookup`], so
//! each call site decides whether an unavailable store is tolerable (reads on
//! the request path) or must surface (explicit cache clearing).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use crate::data_models::CrawlRequest;
use crate::error::ToolError;

/// Upper bound on a single round-trip to an external store.
const STORE_OP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    #[error("cache store unreachable: {0}")]
    Unreachable(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_timeout() {
            CacheError::Unreachable(err.to_string())
        } else {
            CacheError::Operation(err.to_string())
        }
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name, reported by the health surface.
    fn name(&self) -> &'static str;
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    /// Returns whether a value was removed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
    async fn ping(&self) -> Result<(), CacheError>;
}

/// In-process store. Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            let (value, expires_at) = entry.value();
            if *expires_at > now {
                return Ok(Some(value.clone()));
            }
        }
        self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, (_, expires_at))| expires_at > now))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Redis-backed store. The connection is opened on first use and reconnects
/// on its own afterwards.
pub struct RedisStore {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisStore {
    pub fn open(url: &str) -> Result<RedisStore, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Operation(e.to_string()))?;
        Ok(RedisStore {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                match tokio::time::timeout(
                    STORE_OP_TIMEOUT,
                    ConnectionManager::new(self.client.clone()),
                )
                .await
                {
                    Ok(Ok(manager)) => Ok(manager),
                    Ok(Err(e)) => Err(CacheError::from(e)),
                    Err(_) => Err(CacheError::Unreachable("connect timed out".into())),
                }
            })
            .await?;
        Ok(manager.clone())
    }
}

async fn bounded<T, F>(op: F) -> Result<T, CacheError>
where
    F: std::future::Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(STORE_OP_TIMEOUT, op).await {
        Ok(result) => result.map_err(CacheError::from),
        Err(_) => Err(CacheError::Unreachable("operation timed out".into())),
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        bounded(conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        bounded(conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection().await?;
        let removed: i64 = bounded(conn.del(key)).await?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _pong: String = bounded(redis::cmd("PING").query_async(&mut conn)).await?;
        Ok(())
    }
}

/// Result of a cache read, leaving the policy to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(String),
    Miss,
    Unavailable(String),
}

impl CacheLookup {
    /// Collapses an unavailable store into a miss.
    pub fn hit(self) -> Option<String> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss | CacheLookup::Unavailable(_) => None,
        }
    }
}

/// Entry lifetimes per artifact kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub search: Duration,
    pub crawl: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(3600),
            crawl: Duration::from_secs(86_400),
        }
    }
}

/// Best-effort cache in front of an optional store.
///
/// Without a store every read misses, every write is dropped, and explicit
/// deletes report [`ToolError::CacheUnavailable`].
#[derive(Clone)]
pub struct Cache {
    store: Option<Arc<dyn CacheStore>>,
    ttl: TtlPolicy,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: TtlPolicy) -> Cache {
        Cache {
            store: Some(store),
            ttl,
        }
    }

    pub fn disabled() -> Cache {
        Cache {
            store: None,
            ttl: TtlPolicy::default(),
        }
    }

    pub fn in_memory(ttl: TtlPolicy) -> Cache {
        Cache::new(Arc::new(MemoryStore::new()), ttl)
    }

    pub fn ttl(&self) -> TtlPolicy {
        self.ttl
    }

    pub fn backend(&self) -> &'static str {
        self.store.as_ref().map_or("none", |s| s.name())
    }

    pub async fn lookup(&self, key: &str) -> CacheLookup {
        let Some(store) = &self.store else {
            return CacheLookup::Miss;
        };
        match store.get(key).await {
            Ok(Some(value)) => {
                tracing::info!(key, "cache hit");
                CacheLookup::Hit(value)
            }
            Ok(None) => {
                tracing::debug!(key, "cache miss");
                CacheLookup::Miss
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                CacheLookup::Unavailable(e.to_string())
            }
        }
    }

    /// Stores `value`; failures are logged and dropped.
    pub async fn store(&self, key: &str, value: String, ttl: Duration) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.set(key, value, ttl).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }

    pub async fn delete(&self, key: &str) -> Result<bool, ToolError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| ToolError::CacheUnavailable("cache is disabled".into()))?;
        store
            .delete(key)
            .await
            .map_err(|e| ToolError::CacheUnavailable(e.to_string()))
    }

    /// `None` when no store is configured.
    pub async fn ping(&self) -> Option<Result<(), CacheError>> {
        match &self.store {
            Some(store) => Some(store.ping().await),
            None => None,
        }
    }
}

/// Hash part of a crawl cache key; doubles as the batch job id.
///
/// Hashes `{url}:{params}` where params is the sorted-key JSON of the
/// strategies and screenshot flag, so keys line up with the crawl service's
/// own cache.
pub fn crawl_job_id(request: &CrawlRequest) -> String {
    let key_data = format!(
        r#"{}:{{"chunking": "{}", "extraction": "{}", "screenshot": {}}}"#,
        request.url,
        request.options.chunking_strategy.as_str(),
        request.options.extraction_strategy.as_str(),
        request.options.screenshot
    );
    format!("{:x}", md5::compute(key_data.as_bytes()))
}

pub fn crawl_key_for_job(job_id: &str) -> String {
    format!("crawl:{job_id}")
}

pub fn crawl_key(request: &CrawlRequest) -> String {
    crawl_key_for_job(&crawl_job_id(request))
}

/// Search parameters that select a distinct cache entry.
#[derive(Debug, Clone, Copy)]
pub struct SearchKeyParts<'a> {
    pub query: &'a str,
    pub engines: Option<&'a str>,
    pub categories: Option<&'a str>,
    pub language: Option<&'a str>,
    pub page: u32,
    pub max_results: usize,
}

pub fn search_key(parts: SearchKeyParts<'_>) -> String {
    format!(
        "search:{}:{}:{}:{}:{}:{}",
        parts.query,
        parts.engines.unwrap_or("all"),
        parts.categories.unwrap_or("general"),
        parts.language.unwrap_or("en"),
        parts.page,
        parts.max_results
    )
}
