use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    #[serde(default)]
    pub adult: bool,
    pub original_language: String,
    pub original_title: String,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub video: bool,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default = "default_media_type")]
    pub media_type: String,
}

fn default_media_type() -> String {
    "movie".to_string()
}

/// A streaming service offering a title. Two providers are the same service
/// when their `provider_id` matches, whatever the other fields say.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StreamingProvider {
    pub provider_id: i64,
    pub provider_name: String,
    pub display_priority: i64,
    pub logo_path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StreamingAvailability {
    pub movie_id: String,
    pub providers: Vec<StreamingProvider>,
}
