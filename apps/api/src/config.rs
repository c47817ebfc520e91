use std::collections::HashMap;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub jwt_secret: String,
    pub app_env: String,
    pub frontend_url: String,
    pub nominatim_url: String,
    pub autocomplete_cache_ttl_secs: u64,
    pub stripe_secret_key: Option<String>,
    /// Plan id -> Stripe price id, from `STRIPE_PRICE_IDS=pro=price_1,enterprise=price_2`.
    pub stripe_price_ids: HashMap<String, String>,
    pub linkedin: Option<OAuthCredentials>,
    pub google: Option<OAuthCredentials>,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_region: env_or("S3_REGION", "us-east-1"),
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            app_env: env_or("APP_ENV", "development"),
            frontend_url: env_or("FRONTEND_URL", "http://localhost:3000"),
            nominatim_url: env_or("NOMINATIM_URL", "https://nominatim.openstreetmap.org"),
            autocomplete_cache_ttl_secs: env_or("AUTOCOMPLETE_CACHE_TTL_SECS", "300")
                .parse::<u64>()
                .context("AUTOCOMPLETE_CACHE_TTL_SECS must be a whole number of seconds")?,
            stripe_secret_key: optional_env("STRIPE_SECRET_KEY"),
            stripe_price_ids: parse_price_ids(&env_or("STRIPE_PRICE_IDS", "")),
            linkedin: oauth_credentials("LINKEDIN_CLIENT_ID", "LINKEDIN_CLIENT_SECRET"),
            google: oauth_credentials("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("development")
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn oauth_credentials(id_key: &str, secret_key: &str) -> Option<OAuthCredentials> {
    Some(OAuthCredentials {
        client_id: optional_env(id_key)?,
        client_secret: optional_env(secret_key)?,
    })
}

/// Parses `plan=price,plan=price`. Malformed pairs are skipped.
pub fn parse_price_ids(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (plan, price) = pair.split_once('=')?;
            let (plan, price) = (plan.trim(), price.trim());
            if plan.is_empty() || price.is_empty() {
                return None;
            }
            Some((plan.to_lowercase(), price.to_string()))
        })
        .collect()
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/buzz2remote_test".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            s3_bucket: "buzz2remote-test".to_string(),
            s3_endpoint: "http://127.0.0.1:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            jwt_secret: "test_secret".to_string(),
            app_env: "test".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            nominatim_url: "http://127.0.0.1:9".to_string(),
            autocomplete_cache_ttl_secs: 300,
            stripe_secret_key: None,
            stripe_price_ids: HashMap::new(),
            linkedin: None,
            google: None,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}
