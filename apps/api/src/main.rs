mod applications;
mod auth;
mod billing;
mod companies;
mod config;
mod contact;
mod db;
mod errors;
mod favorites;
mod geocoding;
mod jobs;
mod models;
mod onboarding;
mod pagination;
mod profile;
mod routes;
mod settings;
mod state;
mod storage;
mod validation;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::jwt::{JwtService, ISSUER};
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::geocoding::Geocoder;
use crate::jobs::matching::KeywordJobMatcher;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Buzz2Remote API v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.app_env
    );

    // PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Redis (autocomplete cache)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!(bucket = %config.s3_bucket, "S3 client initialized");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("buzz2remote-api/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let geocoder = Geocoder::new(http.clone(), &config.nominatim_url);

    if config.stripe_secret_key.is_none() {
        info!("Stripe not configured; checkout disabled");
    }

    let state = AppState {
        db,
        redis,
        s3,
        http,
        jwt: JwtService::new(&config.jwt_secret, ISSUER.to_string()),
        geocoder,
        matcher: Arc::new(KeywordJobMatcher),
        config: config.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config)?),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Permissive in development; otherwise only the configured frontend origin.
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    if config.is_development() {
        return Ok(CorsLayer::permissive());
    }
    let origin: HeaderValue = config.frontend_url.trim_end_matches('/').parse()?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any))
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "buzz2remote-static",
    );

    let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&shared)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
