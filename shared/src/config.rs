use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub data_dir: String,
    pub cache_ttl: Duration,
    pub cache_max_entries: Option<u64>,
    pub allowed_origins: Vec<String>,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8080;
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_CACHE_TTL_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_ttl_secs = parse_or(
            &lookup,
            "COMMENTS_CACHE_TTL_SECS",
            Self::DEFAULT_CACHE_TTL_SECS,
        );

        Self {
            host: lookup("COMMENTS_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port: parse_or(&lookup, "COMMENTS_HTTP_PORT", Self::DEFAULT_HTTP_PORT),
            data_dir: lookup("COMMENTS_DATA_DIR")
                .unwrap_or_else(|| Self::DEFAULT_DATA_DIR.to_string()),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_max_entries: lookup("COMMENTS_CACHE_MAX_ENTRIES").and_then(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| {
                        warn!(
                            "COMMENTS_CACHE_MAX_ENTRIES='{}' is not a number, cache stays unbounded",
                            raw
                        )
                    })
                    .ok()
            }),
            allowed_origins: lookup("COMMENTS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("comments.sled")
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{}='{}' is invalid, using default {}", name, raw, default);
            default
        }),
        None => default,
    }
}
