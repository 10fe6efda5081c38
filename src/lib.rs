pub mod config;
pub mod database;
pub mod redis_client;
pub mod models;
pub mod controllers;
pub mod cache;
pub mod services;
pub mod query;
pub mod postprocess;
pub mod chart;
pub mod export;
pub mod error;

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use services::{seat_search::SeatSearch, zip_lookup::{ZipClient, ZipError}};

// Shared state для всего приложения
pub struct AppState {
    pub db: database::Database,
    pub cache: Option<cache::CacheService>,
    pub config: config::Config,
    pub seat_search: SeatSearch,
    pub zip: Option<ZipClient>,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect_lazy(&config.database)?;

        let cache = redis_client::RedisClient::connect_optional(config.redis.url.as_deref())
            .await
            .map(cache::CacheService::new);

        Ok(Self::with_parts(config, db, cache))
    }

    /// Собирает состояние из готовых частей (используется и в тестах).
    pub fn with_parts(
        config: config::Config,
        db: database::Database,
        cache: Option<cache::CacheService>,
    ) -> Arc<Self> {
        let seat_search = SeatSearch::new(db.pool.clone(), cache.clone(), config.redis.search_ttl_seconds);

        let zip = match ZipClient::from_config(&config.zip, cache.clone()) {
            Ok(client) => Some(client),
            Err(ZipError::NotConfigured) => {
                info!("ZIP_API_URL not set, ZIP lookup disabled");
                None
            }
            Err(e) => {
                warn!("ZIP lookup client could not be created: {}", e);
                None
            }
        };

        Arc::new(Self { db, cache, config, seat_search, zip })
    }
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        Some(Err(_)) => {
            warn!("CORS_ALLOWED_ORIGIN is not a valid header value, using permissive CORS");
            CorsLayer::permissive()
        }
        None => CorsLayer::permissive(),
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.app.cors_allowed_origin.as_deref());

    Router::new()
        .route("/", get(|| async { "Ticket Admin API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
