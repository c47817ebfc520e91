//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::errors::AppError;
use crate::jobs::autocomplete::{
    cache_key, clamp_limit, fetch_candidates, normalize_query, rank_suggestions, read_cache,
    write_cache, Suggestion, MIN_QUERY_CHARS,
};
use crate::jobs::matching::{JobMatch, MatchProfile};
use crate::jobs::scrape::{import_feed, ScrapeReport};
use crate::jobs::search::{build_count, build_select, JobSearchParams};
use crate::models::job::{is_valid_job_type, JobRow};
use crate::pagination::Page;
use crate::state::AppState;
use crate::validation::{is_http_url, require_max_len, require_non_empty};

const RECOMMENDATION_POOL: i64 = 500;
const DEFAULT_RECOMMENDATIONS: usize = 10;
const MAX_RECOMMENDATIONS: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub company_name: String,
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub location: Option<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    #[serde(default)]
    pub salary_currency: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default = "default_remote")]
    pub remote: bool,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub url: Option<String>,
}

fn default_remote() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub feed_url: String,
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AutocompleteResponse {
    pub query: String,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendedQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, sqlx::FromRow)]
struct MatchProfileRow {
    skills: Vec<String>,
    desired_roles: Vec<String>,
    job_types: Vec<String>,
    min_salary: Option<i32>,
    remote_only: bool,
}

impl CreateJobRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("title", &self.title)?;
        require_max_len("title", &self.title, 200)?;
        require_non_empty("company_name", &self.company_name)?;
        require_non_empty("description", &self.description)?;
        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            if min > max {
                return Err(AppError::Validation(
                    "salary_min cannot exceed salary_max".to_string(),
                ));
            }
        }
        if self.salary_min.is_some_and(|s| s < 0) || self.salary_max.is_some_and(|s| s < 0) {
            return Err(AppError::Validation("salary cannot be negative".to_string()));
        }
        if let Some(job_type) = &self.job_type {
            if !is_valid_job_type(job_type) {
                return Err(AppError::Validation(format!("Unknown job_type '{job_type}'")));
            }
        }
        if let Some(url) = &self.url {
            if !is_http_url(url) {
                return Err(AppError::Validation("url must be an http(s) URL".to_string()));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobSearchParams>,
) -> Result<Json<Page<JobRow>>, AppError> {
    let search = params.validate()?;

    let total: i64 = build_count(&search)
        .build_query_scalar()
        .fetch_one(&state.db)
        .await?;
    let items = build_select(&search)
        .build_query_as::<JobRow>()
        .fetch_all(&state.db)
        .await?;

    Ok(Json(Page::new(items, total, search.page, search.per_page)))
}

/// GET /api/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRow>, AppError> {
    Ok(Json(fetch_job(&state, job_id).await?))
}

/// POST /api/jobs (admin)
pub async fn handle_create_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    auth.require_admin()?;
    req.validate()?;

    let location = req
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("Remote")
        .to_string();
    let coordinates = state.geocoder.geocode_best_effort(&location).await;
    let tags = crate::jobs::scrape::normalize_tags(&req.tags);

    let job = sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs
            (id, title, company_id, company_name, location, salary_min, salary_max,
             salary_currency, job_type, remote, description, tags, source, url,
             latitude, longitude)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'manual', $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.title.trim())
    .bind(req.company_id)
    .bind(req.company_name.trim())
    .bind(&location)
    .bind(req.salary_min)
    .bind(req.salary_max)
    .bind(req.salary_currency.as_deref().unwrap_or("USD"))
    .bind(req.job_type.as_deref().unwrap_or("full_time"))
    .bind(req.remote)
    .bind(req.description.trim())
    .bind(&tags)
    .bind(&req.url)
    .bind(coordinates.as_ref().map(|c| c.latitude))
    .bind(coordinates.as_ref().map(|c| c.longitude))
    .fetch_one(&state.db)
    .await?;

    info!(job_id = %job.id, by = %auth.user_id, "Created job");
    Ok((StatusCode::CREATED, Json(job)))
}

/// POST /api/jobs/scrape (admin)
pub async fn handle_scrape(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ScrapeRequest>,
) -> Result<Json<ScrapeReport>, AppError> {
    auth.require_admin()?;
    if !is_http_url(&req.feed_url) {
        return Err(AppError::Validation(
            "feed_url must be an http(s) URL".to_string(),
        ));
    }
    require_non_empty("source", &req.source)?;
    require_max_len("source", &req.source, 50)?;

    let source = req.source.trim().to_lowercase();
    let report = import_feed(&state.db, &state.http, req.feed_url.trim(), &source).await?;
    Ok(Json(report))
}

/// GET /api/jobs/autocomplete
pub async fn handle_autocomplete(
    State(state): State<AppState>,
    Query(query): Query<AutocompleteQuery>,
) -> Result<Json<AutocompleteResponse>, AppError> {
    let normalized = normalize_query(&query.q);
    let limit = clamp_limit(query.limit);

    if normalized.chars().count() < MIN_QUERY_CHARS {
        return Ok(Json(AutocompleteResponse {
            query: normalized,
            suggestions: Vec::new(),
        }));
    }

    let key = cache_key(&normalized, limit);
    if let Some(suggestions) = read_cache(&state.redis, &key).await {
        return Ok(Json(AutocompleteResponse {
            query: normalized,
            suggestions,
        }));
    }

    let candidates = fetch_candidates(&state.db, &normalized).await?;
    let suggestions = rank_suggestions(&normalized, candidates, limit);
    write_cache(
        &state.redis,
        &key,
        &suggestions,
        state.config.autocomplete_cache_ttl_secs,
    )
    .await;

    Ok(Json(AutocompleteResponse {
        query: normalized,
        suggestions,
    }))
}

/// GET /api/jobs/recommended
pub async fn handle_recommended(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RecommendedQuery>,
) -> Result<Json<Vec<JobMatch>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECOMMENDATIONS)
        .clamp(1, MAX_RECOMMENDATIONS);

    let row = sqlx::query_as::<_, MatchProfileRow>(
        r#"
        SELECT p.skills, pr.desired_roles, pr.job_types, pr.min_salary, pr.remote_only
        FROM profiles p
        JOIN preferences pr ON pr.user_id = p.user_id
        WHERE p.user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Profile for user {} not found", auth.user_id)))?;

    let profile = MatchProfile {
        skills: row.skills,
        desired_roles: row.desired_roles,
        job_types: row.job_types,
        min_salary: row.min_salary,
        remote_only: row.remote_only,
    };

    let jobs = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT * FROM jobs
        WHERE is_active AND posted_at >= NOW() - INTERVAL '90 days'
        ORDER BY posted_at DESC
        LIMIT $1
        "#,
    )
    .bind(RECOMMENDATION_POOL)
    .fetch_all(&state.db)
    .await?;

    let ranked = state.matcher.rank(&profile, jobs, limit).await?;
    Ok(Json(ranked))
}

pub async fn fetch_job(state: &AppState, job_id: Uuid) -> Result<JobRow, AppError> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}
