use crate::config::WatchPolicy;
use crate::models::{StreamingAvailability, StreamingProvider};
use crate::tmdb::{ProviderLookup, RegionProviders, TmdbApi, WatchProviders};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a single movie id resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Providers(Vec<StreamingProvider>),
    /// Upstream answered but listed nothing for the region and buckets we read.
    Empty,
    /// Upstream failed or answered with something unusable.
    Omitted(String),
}

impl LookupOutcome {
    pub fn into_availability(self, movie_id: String) -> Option<StreamingAvailability> {
        match self {
            LookupOutcome::Providers(providers) => Some(StreamingAvailability {
                movie_id,
                providers,
            }),
            LookupOutcome::Empty => Some(StreamingAvailability {
                movie_id,
                providers: Vec::new(),
            }),
            LookupOutcome::Omitted(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct StreamingAggregator {
    tmdb: Arc<dyn TmdbApi>,
    policy: WatchPolicy,
    concurrency: usize,
}

impl StreamingAggregator {
    pub fn new(tmdb: Arc<dyn TmdbApi>, policy: WatchPolicy, concurrency: usize) -> Self {
        Self {
            tmdb,
            policy,
            concurrency: concurrency.max(1),
        }
    }

    /// Availability for each id that upstream answered for, in input order.
    pub async fn availability(&self, movie_ids: &[String]) -> Vec<StreamingAvailability> {
        let outcomes = self.lookup_all(movie_ids).await;
        let total = outcomes.len();
        let results: Vec<StreamingAvailability> = outcomes
            .into_iter()
            .filter_map(|(movie_id, outcome)| outcome.into_availability(movie_id))
            .collect();
        info!(
            "Resolved streaming availability for {}/{} movies",
            results.len(),
            total
        );
        results
    }

    /// Every id paired with its outcome, in input order. Lookups run
    /// concurrently up to the configured limit.
    pub async fn lookup_all(&self, movie_ids: &[String]) -> Vec<(String, LookupOutcome)> {
        stream::iter(movie_ids.iter().cloned())
            .map(|movie_id| async move {
                let outcome = self.lookup(&movie_id).await;
                (movie_id, outcome)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    pub async fn lookup(&self, movie_id: &str) -> LookupOutcome {
        match self.tmdb.fetch_providers_for_movie(movie_id).await {
            ProviderLookup::Unavailable(reason) => {
                debug!("Skipping movie {}: {}", movie_id, reason);
                LookupOutcome::Omitted(reason)
            }
            ProviderLookup::Found(payload) => match collect_providers(&payload, &self.policy) {
                Ok(providers) if providers.is_empty() => LookupOutcome::Empty,
                Ok(providers) => LookupOutcome::Providers(providers),
                Err(e) => {
                    warn!("Malformed provider data for movie {}: {}", movie_id, e);
                    LookupOutcome::Omitted(format!("malformed provider data: {e}"))
                }
            },
        }
    }
}

/// Providers for the policy's region, buckets concatenated in policy order,
/// first occurrence of each `provider_id` kept, then stably sorted by
/// `display_priority`.
pub fn collect_providers(
    payload: &WatchProviders,
    policy: &WatchPolicy,
) -> Result<Vec<StreamingProvider>, serde_json::Error> {
    let Some(region) = payload.results.get(&policy.region) else {
        return Ok(Vec::new());
    };

    let candidates = candidates(region, policy)?;
    let mut seen = HashSet::new();
    let mut providers: Vec<StreamingProvider> = candidates
        .into_iter()
        .filter(|p| seen.insert(p.provider_id))
        .collect();
    providers.sort_by_key(|p| p.display_priority);
    Ok(providers)
}

fn candidates(
    region: &RegionProviders,
    policy: &WatchPolicy,
) -> Result<Vec<StreamingProvider>, serde_json::Error> {
    let mut out = Vec::new();
    for bucket in &policy.provider_types {
        for raw in region.bucket(bucket)? {
            out.push(StreamingProvider {
                provider_id: raw.provider_id,
                provider_name: raw.provider_name,
                display_priority: raw.display_priority.unwrap_or(0),
                logo_path: format!("{}{}", policy.image_base, raw.logo_path),
            });
        }
    }
    Ok(out)
}
