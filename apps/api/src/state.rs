use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::auth::jwt::JwtService;
use crate::config::Config;
use crate::geocoding::Geocoder;
use crate::jobs::matching::JobMatcher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Autocomplete cache.
    pub redis: RedisClient,
    /// Resume uploads and data-export archives.
    pub s3: S3Client,
    /// Outbound HTTP for OAuth, Stripe and feed imports.
    pub http: reqwest::Client,
    pub jwt: JwtService,
    pub geocoder: Geocoder,
    /// Pluggable job matcher. Default: KeywordJobMatcher.
    pub matcher: Arc<dyn JobMatcher>,
    pub config: Config,
}
