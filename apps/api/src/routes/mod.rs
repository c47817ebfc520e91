pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::applications::handlers as applications;
use crate::auth::handlers as auth;
use crate::auth::middleware::auth_middleware;
use crate::companies::handlers as companies;
use crate::jobs::handlers as jobs;
use crate::onboarding::handlers as onboarding;
use crate::profile::handlers as profile;
use crate::state::AppState;
use crate::{billing, contact, favorites, geocoding, settings};

/// Multipart framing on top of the PDF itself.
const RESUME_BODY_LIMIT: usize = profile::MAX_RESUME_BYTES + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/auth/register", post(auth::handle_register))
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/me", get(auth::handle_me))
        .route("/auth/change-password", post(auth::handle_change_password))
        .route("/auth/delete-account", delete(auth::handle_delete_account))
        .route("/auth/export-data", get(auth::handle_export_data))
        .route("/auth/oauth/:provider", post(auth::handle_oauth_callback))
        // Jobs
        .route(
            "/api/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/jobs/scrape", post(jobs::handle_scrape))
        .route("/api/jobs/autocomplete", get(jobs::handle_autocomplete))
        .route("/api/jobs/recommended", get(jobs::handle_recommended))
        .route("/api/jobs/:id", get(jobs::handle_get_job))
        // Application tracker
        .route(
            "/applications",
            get(applications::handle_list_applications)
                .post(applications::handle_create_application),
        )
        .route(
            "/applications/stats",
            get(applications::handle_application_stats),
        )
        .route(
            "/applications/:id",
            patch(applications::handle_update_application)
                .delete(applications::handle_delete_application),
        )
        // Profile
        .route(
            "/profile",
            get(profile::handle_get_profile).put(profile::handle_update_profile),
        )
        .route("/profile/completeness", get(profile::handle_completeness))
        .route(
            "/profile/resume",
            post(profile::handle_upload_resume).layer(DefaultBodyLimit::max(RESUME_BODY_LIMIT)),
        )
        // Onboarding, settings, favorites
        .route("/api/v1/onboarding", get(onboarding::handle_get_onboarding))
        .route("/api/v1/onboarding/:step", put(onboarding::handle_submit_step))
        .route(
            "/api/v1/settings",
            get(settings::handle_get_settings).put(settings::handle_update_settings),
        )
        .route("/api/v1/favorites", get(favorites::handle_list_favorites))
        .route("/api/v1/favorites/sync", post(favorites::handle_sync_favorites))
        .route(
            "/api/v1/favorites/:job_id",
            post(favorites::handle_add_favorite).delete(favorites::handle_remove_favorite),
        )
        // Companies
        .route(
            "/api/v1/companies",
            get(companies::handle_list_companies).post(companies::handle_create_company),
        )
        .route("/api/v1/companies/:id", get(companies::handle_get_company))
        .route("/api/v1/companies/:id/jobs", get(companies::handle_company_jobs))
        .route(
            "/api/v1/companies/:id/reviews",
            get(companies::handle_list_reviews).post(companies::handle_create_review),
        )
        .route("/api/v1/companies/:id/culture", get(companies::handle_culture))
        // Billing, geocoding, contact
        .route("/api/v1/pricing/plans", get(billing::handle_list_plans))
        .route("/api/v1/billing/checkout", post(billing::handle_checkout))
        .route("/api/v1/geocode", get(geocoding::handle_geocode))
        .route("/api/v1/contact", post(contact::handle_contact))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::jwt::{JwtService, ISSUER};
    use crate::config::Config;
    use crate::geocoding::Geocoder;
    use crate::jobs::matching::KeywordJobMatcher;

    /// State whose backends are never contacted by the requests below.
    fn test_state() -> AppState {
        let config = Config::for_tests();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let redis = redis::Client::open(config.redis_url.clone()).unwrap();
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "tests"))
            .endpoint_url(&config.s3_endpoint)
            .force_path_style(true)
            .build();
        let http = reqwest::Client::new();
        AppState {
            db,
            redis,
            s3: aws_sdk_s3::Client::from_conf(s3_config),
            geocoder: Geocoder::new(http.clone(), &config.nominatim_url),
            http,
            jwt: JwtService::new(&config.jwt_secret, ISSUER.to_string()),
            matcher: Arc::new(KeywordJobMatcher),
            config,
        }
    }

    fn token(state: &AppState, is_admin: bool) -> String {
        state
            .jwt
            .create_token(Uuid::new_v4(), "ada@example.com", is_admin)
            .unwrap()
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: Method, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(test_state(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "buzz2remote-api");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let (status, body) = send(test_state(), get("/auth/me")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_invalid_token_is_anonymous() {
        let request = Request::builder()
            .uri("/applications")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(test_state(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_route_rejects_regular_user() {
        let state = test_state();
        let token = token(&state, false);
        let body = r#"{"title":"Rust Engineer","company_name":"Ferrous","description":"Build"}"#;
        let request = json_request(Method::POST, "/api/jobs", Some(&token), body);
        let (status, _) = send(state, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_job_search_validation() {
        let (status, body) = send(test_state(), get("/api/jobs?sort=popularity")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_short_autocomplete_query_is_empty() {
        let (status, body) = send(test_state(), get("/api/jobs/autocomplete?q=r")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suggestions"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_autocomplete_without_query_is_empty() {
        let (status, body) = send(test_state(), get("/api/jobs/autocomplete")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "");
        assert_eq!(body["suggestions"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn test_pricing_plans() {
        let (status, body) = send(test_state(), get("/api/v1/pricing/plans")).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["free", "pro", "enterprise"]);
    }

    #[tokio::test]
    async fn test_checkout_free_plan_rejected() {
        let state = test_state();
        let token = token(&state, false);
        let request = json_request(
            Method::POST,
            "/api/v1/billing/checkout",
            Some(&token),
            r#"{"plan":"free"}"#,
        );
        let (status, _) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_checkout_without_stripe_is_unavailable() {
        let state = test_state();
        let token = token(&state, false);
        let request = json_request(
            Method::POST,
            "/api/v1/billing/checkout",
            Some(&token),
            r#"{"plan":"pro"}"#,
        );
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_settings_reject_unknown_theme() {
        let state = test_state();
        let token = token(&state, false);
        let request = json_request(
            Method::PUT,
            "/api/v1/settings",
            Some(&token),
            r#"{"theme":"sepia"}"#,
        );
        let (status, _) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_geocode_query_too_short() {
        let (status, _) = send(test_state(), get("/api/v1/geocode?q=a")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = send(test_state(), get("/api/v2/nothing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
