//! Axum route handlers for company profiles and reviews.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::companies::reviews::{culture_report, slugify, CreateReviewRequest, CultureReport};
use crate::errors::AppError;
use crate::jobs::search::like_pattern;
use crate::models::company::{CompanyReviewRow, CompanyRow, CompanySummaryRow};
use crate::models::job::JobRow;
use crate::state::AppState;
use crate::validation::{is_http_url, require_max_len, require_non_empty};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

const SUMMARY_SELECT: &str = r#"
    SELECT c.*,
           (SELECT AVG(r.rating)::FLOAT8 FROM company_reviews r WHERE r.company_id = c.id) AS rating,
           (SELECT COUNT(*) FROM company_reviews r WHERE r.company_id = c.id) AS review_count,
           (SELECT COUNT(*) FROM jobs j WHERE j.company_id = c.id AND j.is_active) AS open_jobs
    FROM companies c
"#;

#[derive(Debug, Default, Deserialize)]
pub struct CompanyListQuery {
    pub q: Option<String>,
    pub industry: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub logo_url: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
}

impl CreateCompanyRequest {
    fn validate(&self) -> Result<String, AppError> {
        require_non_empty("name", &self.name)?;
        require_max_len("name", &self.name, 200)?;
        for (field, value) in [("website", &self.website), ("logo_url", &self.logo_url)] {
            if value.as_deref().is_some_and(|v| !is_http_url(v)) {
                return Err(AppError::Validation(format!(
                    "{field} must be an http(s) URL"
                )));
            }
        }
        let slug = slugify(&self.name);
        if slug.is_empty() {
            return Err(AppError::Validation(
                "name must contain letters or digits".to_string(),
            ));
        }
        Ok(slug)
    }
}

fn build_list(query: &CompanyListQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(SUMMARY_SELECT);
    qb.push(" WHERE TRUE");
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        qb.push(" AND c.name ILIKE ").push_bind(like_pattern(q));
    }
    if let Some(industry) = query
        .industry
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
    {
        qb.push(" AND LOWER(c.industry) = LOWER(")
            .push_bind(industry.to_string())
            .push(")");
    }
    qb.push(" ORDER BY c.name LIMIT ")
        .push_bind(query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT));
    qb
}

/// GET /api/v1/companies
pub async fn handle_list_companies(
    State(state): State<AppState>,
    Query(query): Query<CompanyListQuery>,
) -> Result<Json<Vec<CompanySummaryRow>>, AppError> {
    let companies = build_list(&query)
        .build_query_as::<CompanySummaryRow>()
        .fetch_all(&state.db)
        .await?;
    Ok(Json(companies))
}

/// POST /api/v1/companies (admin)
pub async fn handle_create_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<CompanyRow>), AppError> {
    auth.require_admin()?;
    let slug = req.validate()?;

    let coordinates = match req.location.as_deref() {
        Some(location) => state.geocoder.geocode_best_effort(location).await,
        None => None,
    };

    let company = sqlx::query_as::<_, CompanyRow>(
        r#"
        INSERT INTO companies
            (id, name, slug, logo_url, industry, location, website, description, size,
             latitude, longitude)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(&slug)
    .bind(&req.logo_url)
    .bind(&req.industry)
    .bind(&req.location)
    .bind(&req.website)
    .bind(&req.description)
    .bind(&req.size)
    .bind(coordinates.as_ref().map(|c| c.latitude))
    .bind(coordinates.as_ref().map(|c| c.longitude))
    .fetch_one(&state.db)
    .await?;

    info!(company_id = %company.id, slug = %company.slug, "Company created");
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /api/v1/companies/:id
pub async fn handle_get_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CompanySummaryRow>, AppError> {
    let sql = format!("{SUMMARY_SELECT} WHERE c.id = $1");
    sqlx::query_as::<_, CompanySummaryRow>(&sql)
        .bind(company_id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(company_id))
}

/// GET /api/v1/companies/:id/jobs
pub async fn handle_company_jobs(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    ensure_company(&state, company_id).await?;
    let jobs = sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE company_id = $1 AND is_active ORDER BY posted_at DESC",
    )
    .bind(company_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(jobs))
}

/// GET /api/v1/companies/:id/reviews
pub async fn handle_list_reviews(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Vec<CompanyReviewRow>>, AppError> {
    ensure_company(&state, company_id).await?;
    Ok(Json(fetch_reviews(&state, company_id).await?))
}

/// POST /api/v1/companies/:id/reviews
pub async fn handle_create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<CompanyReviewRow>), AppError> {
    req.validate()?;
    ensure_company(&state, company_id).await?;

    let review = sqlx::query_as::<_, CompanyReviewRow>(
        r#"
        INSERT INTO company_reviews
            (id, company_id, user_id, rating, title, body, pros, cons,
             work_life_balance, culture_values, career_opportunities, compensation, management)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(auth.user_id)
    .bind(req.rating)
    .bind(req.title.trim())
    .bind(&req.body)
    .bind(&req.pros)
    .bind(&req.cons)
    .bind(req.work_life_balance)
    .bind(req.culture_values)
    .bind(req.career_opportunities)
    .bind(req.compensation)
    .bind(req.management)
    .fetch_one(&state.db)
    .await?;

    info!(%company_id, review_id = %review.id, rating = review.rating, "Review posted");
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/v1/companies/:id/culture
pub async fn handle_culture(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CultureReport>, AppError> {
    ensure_company(&state, company_id).await?;
    let reviews = fetch_reviews(&state, company_id).await?;
    Ok(Json(culture_report(&reviews)))
}

async fn fetch_reviews(state: &AppState, company_id: Uuid) -> Result<Vec<CompanyReviewRow>, AppError> {
    Ok(sqlx::query_as::<_, CompanyReviewRow>(
        "SELECT * FROM company_reviews WHERE company_id = $1 ORDER BY created_at DESC",
    )
    .bind(company_id)
    .fetch_all(&state.db)
    .await?)
}

async fn ensure_company(state: &AppState, company_id: Uuid) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM companies WHERE id = $1)")
        .bind(company_id)
        .fetch_one(&state.db)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(not_found(company_id))
    }
}

fn not_found(company_id: Uuid) -> AppError {
    AppError::NotFound(format!("Company {company_id} not found"))
}
