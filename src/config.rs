use std::env;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/original";
const DEFAULT_REGION: &str = "US";
const DEFAULT_PROVIDER_TYPES: &[&str] = &["flatrate", "free"];
const DEFAULT_LOOKUP_CONCURRENCY: usize = 8;
const MAX_LOOKUP_CONCURRENCY: usize = 64;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Which slice of a watch-provider payload counts as "streaming".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPolicy {
    pub region: String,
    /// Distribution buckets, read and concatenated in this order.
    pub provider_types: Vec<String>,
    pub image_base: String,
}

impl Default for WatchPolicy {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            provider_types: DEFAULT_PROVIDER_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            image_base: DEFAULT_IMAGE_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub watch: WatchPolicy,
    pub lookup_concurrency: usize,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let tmdb_api_key = get("TMDB_API_KEY").ok_or(ConfigError::Missing("TMDB_API_KEY"))?;
        let tmdb_base_url = get("TMDB_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TMDB_BASE.to_string());

        let mut watch = WatchPolicy::default();
        if let Some(base) = get("TMDB_IMAGE_BASE_URL") {
            watch.image_base = base.trim_end_matches('/').to_string();
        }
        if let Some(region) = get("WATCH_REGION") {
            watch.region = region.to_uppercase();
        }
        if let Some(raw) = lookup("WATCH_PROVIDER_TYPES") {
            watch.provider_types = parse_provider_types(&raw)?;
        }

        let lookup_concurrency = match get("LOOKUP_CONCURRENCY") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| ConfigError::Invalid {
                    key: "LOOKUP_CONCURRENCY",
                    reason: e.to_string(),
                })?
                .clamp(1, MAX_LOOKUP_CONCURRENCY),
            None => DEFAULT_LOOKUP_CONCURRENCY,
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url,
            watch,
            lookup_concurrency,
            bind_addr,
        })
    }
}

fn parse_provider_types(raw: &str) -> Result<Vec<String>, ConfigError> {
    let types: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if types.is_empty() {
        return Err(ConfigError::Invalid {
            key: "WATCH_PROVIDER_TYPES",
            reason: "expected at least one provider type".to_string(),
        });
    }
    Ok(types)
}
