use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::TtlPolicy;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_lookup(|key| env::var(key).ok())
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
    Disabled,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            "none" | "off" | "disabled" => Ok(Self::Disabled),
            other => Err(format!("unknown cache backend {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub searxng_url: String,
    pub searxng_timeout: Duration,
    pub crawl4ai_url: String,
    pub crawl4ai_timeout: Duration,
    pub cache_backend: CacheBackend,
    pub redis_url: String,
    pub cache_ttl: TtlPolicy,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Builds a config from any key lookup; the process environment in production.
    pub fn from_lookup<F>(get: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = TtlPolicy::default();
        Config {
            searxng_url: get_or_default(&get, "SEARXNG_URL", "http://localhost:8080"),
            searxng_timeout: Duration::from_secs(parse_or_default(
                &get,
                "SEARXNG_TIMEOUT_SECS",
                30,
            )),
            crawl4ai_url: get_or_default(&get, "CRAWL4AI_URL", "http://localhost:8000"),
            crawl4ai_timeout: Duration::from_secs(parse_or_default(
                &get,
                "CRAWL4AI_TIMEOUT_SECS",
                60,
            )),
            cache_backend: parse_or_default(&get, "CACHE_BACKEND", CacheBackend::Memory),
            redis_url: redis_url(&get),
            cache_ttl: TtlPolicy {
                search: Duration::from_secs(parse_or_default(
                    &get,
                    "CACHE_TTL_SEARCH",
                    defaults.search.as_secs(),
                )),
                crawl: Duration::from_secs(parse_or_default(
                    &get,
                    "CACHE_TTL_CRAWL",
                    defaults.crawl.as_secs(),
                )),
            },
            host: get_or_default(&get, "HOST", "0.0.0.0"),
            port: parse_or_default(&get, "PORT", 3000),
        }
    }
}

fn get_or_default<F>(get: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or_default<F, T>(get: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!("invalid value {raw:?} for {key} ({e}), using default");
            default
        }),
        _ => default,
    }
}

/// `REDIS_URL`, or a URL assembled from `REDIS_HOST`/`REDIS_PORT`/`REDIS_PASSWORD`.
fn redis_url<F>(get: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = get("REDIS_URL").filter(|v| !v.trim().is_empty()) {
        return url;
    }
    let host = get_or_default(get, "REDIS_HOST", "localhost");
    let port = get_or_default(get, "REDIS_PORT", "6379");
    match get("REDIS_PASSWORD").filter(|v| !v.is_empty()) {
        Some(password) => format!("redis://:{password}@{host}:{port}"),
        None => format!("redis://{host}:{port}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.searxng_url, "http://localhost:8080");
        assert_eq!(config.crawl4ai_url, "http://localhost:8000");
        assert_eq!(config.searxng_timeout, Duration::from_secs(30));
        assert_eq!(config.crawl4ai_timeout, Duration::from_secs(60));
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.cache_ttl, TtlPolicy::default());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("SEARXNG_URL", "http://searx:8080"),
            ("CACHE_BACKEND", "Redis"),
            ("CACHE_TTL_SEARCH", "60"),
            ("PORT", "8081"),
        ]);
        assert_eq!(config.searxng_url, "http://searx:8080");
        assert_eq!(config.cache_backend, CacheBackend::Redis);
        assert_eq!(config.cache_ttl.search, Duration::from_secs(60));
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = config_from(&[("PORT", "eighty"), ("CACHE_TTL_CRAWL", "-1")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.cache_ttl.crawl, Duration::from_secs(86_400));
    }

    #[test]
    fn redis_url_from_parts() {
        let config = config_from(&[
            ("REDIS_HOST", "redis-cluster"),
            ("REDIS_PORT", "7000"),
            ("REDIS_PASSWORD", "s3cret"),
        ]);
        assert_eq!(config.redis_url, "redis://:s3cret@redis-cluster:7000");

        let config = config_from(&[("REDIS_URL", "redis://cache:6380"), ("REDIS_HOST", "x")]);
        assert_eq!(config.redis_url, "redis://cache:6380");
    }

    #[test]
    fn cache_backend_parsing() {
        assert_eq!("none".parse::<CacheBackend>(), Ok(CacheBackend::Disabled));
        assert!("mongo".parse::<CacheBackend>().is_err());
    }
}
