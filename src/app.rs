use crate::config::AppConfig;
use crate::models::{Movie, StreamingAvailability};
use crate::streaming::StreamingAggregator;
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::{Query, QueryRejection};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub streaming: StreamingAggregator,
}

impl AppState {
    pub fn new(tmdb: Arc<dyn TmdbApi>, config: &AppConfig) -> Self {
        let streaming = StreamingAggregator::new(
            tmdb.clone(),
            config.watch.clone(),
            config.lookup_concurrency,
        );
        Self { tmdb, streaming }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Upstream(anyhow::Error),
    BadQuery(String),
    Validation(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Upstream(e) => {
                error!("Request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::BadQuery(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Validation(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Upstream(e)
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamingQuery {
    #[serde(default)]
    movie_ids: Vec<String>,
}

pub async fn run_server(config: AppConfig) -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(&config)?);
    info!(
        "Streaming lookups use region {} with provider types {:?}",
        config.watch.region, config.watch.provider_types
    );
    let state = AppState::new(tmdb, &config);
    let app = build_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/movies/trending", get(trending_movies))
        .route("/api/movies/streaming", get(movie_streaming))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn trending_movies(State(state): State<AppState>) -> Result<Json<Vec<Movie>>, ApiError> {
    let movies = state.tmdb.fetch_trending().await?;
    info!("Serving {} trending movies", movies.len());
    Ok(Json(movies))
}

async fn movie_streaming(
    State(state): State<AppState>,
    query: Result<Query<StreamingQuery>, QueryRejection>,
) -> Result<Json<Vec<StreamingAvailability>>, ApiError> {
    let Query(query) = query.map_err(|e| {
        warn!("Rejecting streaming request: {}", e);
        ApiError::BadQuery(e.to_string())
    })?;
    if query.movie_ids.is_empty() {
        return Err(ApiError::Validation("movie_ids: field required".to_string()));
    }

    let results = state.streaming.availability(&query.movie_ids).await;
    Ok(Json(results))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
