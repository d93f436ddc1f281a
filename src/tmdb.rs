use crate::config::AppConfig;
use crate::models::Movie;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("TMDB API error: {body}")]
    Status { status: StatusCode, body: String },

    #[error("TMDB request failed: {0}")]
    Request(reqwest::Error),

    #[error("TMDB response could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// This week's trending movies. Fails as a whole if any record is malformed.
    async fn fetch_trending(&self) -> Result<Vec<Movie>>;

    /// Watch-provider data for one movie. Failures come back as
    /// [`ProviderLookup::Unavailable`] instead of an error.
    async fn fetch_providers_for_movie(&self, movie_id: &str) -> ProviderLookup;
}

#[derive(Debug, Clone)]
pub enum ProviderLookup {
    Found(WatchProviders),
    Unavailable(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchProviders {
    #[serde(default)]
    pub results: HashMap<String, RegionProviders>,
}

/// One region's providers. Buckets (`flatrate`, `free`, `rent`, `buy`, ...)
/// stay as raw JSON until a caller asks for one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionProviders {
    /// Declared so the TMDB watch-page URL stays out of `buckets`.
    #[serde(default)]
    pub link: Option<String>,
    #[serde(flatten)]
    pub buckets: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawProvider {
    pub provider_id: i64,
    pub provider_name: String,
    #[serde(default)]
    pub display_priority: Option<i64>,
    pub logo_path: String,
}

impl RegionProviders {
    /// Records in `bucket`, or an empty list when the bucket is absent or null.
    pub fn bucket(&self, bucket: &str) -> Result<Vec<RawProvider>, serde_json::Error> {
        match self.buckets.get(bucket) {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(value) => Vec::<RawProvider>::deserialize(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let user_agent = format!("moviebridge/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key: config.tmdb_api_key.clone(),
            base_url: config.tmdb_base_url.clone(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, TmdbError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(request_error)?;
        let status = res.status();
        let body = res.text().await.map_err(request_error)?;
        if !status.is_success() {
            debug!("GET {} -> {}", path, status);
            return Err(TmdbError::Status { status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

// The request URL carries the api key.
fn request_error(e: reqwest::Error) -> TmdbError {
    TmdbError::Request(e.without_url())
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn fetch_trending(&self) -> Result<Vec<Movie>> {
        #[derive(Deserialize)]
        struct TrendingResponse {
            #[serde(default)]
            results: Vec<Movie>,
        }

        let data: TrendingResponse = self.get_json("/trending/movie/week").await?;
        debug!("Fetched {} trending movies", data.results.len());
        Ok(data.results)
    }

    async fn fetch_providers_for_movie(&self, movie_id: &str) -> ProviderLookup {
        let path = format!("/movie/{}/watch/providers", urlencoding::encode(movie_id));
        match self.get_json::<WatchProviders>(&path).await {
            Ok(data) => ProviderLookup::Found(data),
            Err(e) => {
                warn!("Watch providers unavailable for movie {}: {}", movie_id, e);
                ProviderLookup::Unavailable(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn region_block_keeps_every_bucket() {
        let payload: WatchProviders = serde_json::from_value(json!({
            "id": 550,
            "results": {
                "US": {
                    "link": "https://www.themoviedb.org/movie/550/watch?locale=US",
                    "flatrate": [{"provider_id": 8, "provider_name": "Netflix", "display_priority": 1, "logo_path": "/n.jpg"}],
                    "rent": [{"provider_id": 2, "provider_name": "Apple TV", "display_priority": 4, "logo_path": "/a.jpg"}]
                }
            }
        }))
        .unwrap();

        let us = &payload.results["US"];
        assert!(us.link.is_some());
        assert!(!us.buckets.contains_key("link"));
        assert_eq!(us.bucket("flatrate").unwrap().len(), 1);
        assert_eq!(us.bucket("rent").unwrap()[0].provider_id, 2);
        assert!(us.bucket("free").unwrap().is_empty());
    }

    #[test]
    fn missing_priority_is_none() {
        let region: RegionProviders = serde_json::from_value(json!({
            "free": [{"provider_id": 73, "provider_name": "Tubi", "logo_path": "/t.jpg"}]
        }))
        .unwrap();
        assert_eq!(region.bucket("free").unwrap()[0].display_priority, None);
    }

    #[test]
    fn malformed_bucket_is_an_error() {
        let region: RegionProviders = serde_json::from_value(json!({
            "flatrate": [{"provider_name": "No id"}]
        }))
        .unwrap();
        assert!(region.bucket("flatrate").is_err());
    }

    #[test]
    fn status_error_carries_body() {
        let err = TmdbError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: "{\"status_message\":\"Invalid API key\"}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "TMDB API error: {\"status_message\":\"Invalid API key\"}"
        );
    }
}
