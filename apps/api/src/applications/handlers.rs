//! Axum route handlers for the application tracker.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::applications::tracker::{
    apply_filter, compute_stats, TrackedApplication, TrackerQuery, TrackerStats,
};
use crate::auth::middleware::AuthUser;
use crate::errors::AppError;
use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::state::AppState;
use crate::validation::require_max_len;

const MAX_NOTES_LEN: usize = 5_000;
const MAX_COVER_LETTER_LEN: usize = 20_000;

const SELECT_APPLICATIONS: &str = r#"
    SELECT a.id, a.job_id, a.user_id, a.status, a.notes, a.cover_letter,
           a.applied_at, a.updated_at, j.title AS job_title, j.company_name
    FROM applications a
    JOIN jobs j ON j.id = a.job_id
"#;

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub job_id: Uuid,
    pub notes: Option<String>,
    pub cover_letter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl UpdateApplicationRequest {
    fn parsed_status(&self) -> Result<Option<ApplicationStatus>, AppError> {
        self.status
            .as_deref()
            .map(|s| {
                ApplicationStatus::parse(s)
                    .ok_or_else(|| AppError::Validation(format!("Unknown status '{s}'")))
            })
            .transpose()
    }
}

/// GET /applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TrackerQuery>,
) -> Result<Json<Vec<TrackedApplication>>, AppError> {
    let filter = query.validate()?;
    let rows = fetch_applications(&state.db, auth.user_id).await?;
    Ok(Json(apply_filter(rows, &filter)))
}

/// GET /applications/stats
pub async fn handle_application_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<TrackerStats>, AppError> {
    let rows = fetch_applications(&state.db, auth.user_id).await?;
    Ok(Json(compute_stats(&rows)))
}

/// POST /applications
pub async fn handle_create_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationRow>), AppError> {
    if let Some(notes) = &req.notes {
        require_max_len("notes", notes, MAX_NOTES_LEN)?;
    }
    if let Some(letter) = &req.cover_letter {
        require_max_len("cover_letter", letter, MAX_COVER_LETTER_LEN)?;
    }

    let job_exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM jobs WHERE id = $1)")
        .bind(req.job_id)
        .fetch_one(&state.db)
        .await?;
    if !job_exists {
        return Err(AppError::NotFound(format!("Job {} not found", req.job_id)));
    }

    let inserted: Option<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO applications (id, job_id, user_id, status, notes, cover_letter)
        VALUES ($1, $2, $3, 'pending', $4, $5)
        ON CONFLICT (user_id, job_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.job_id)
    .bind(auth.user_id)
    .bind(&req.notes)
    .bind(&req.cover_letter)
    .fetch_optional(&state.db)
    .await?;

    let id = inserted.ok_or_else(|| {
        AppError::Conflict(format!("Already applied to job {}", req.job_id))
    })?;

    info!(application_id = %id, job_id = %req.job_id, user_id = %auth.user_id, "Application created");
    let row = fetch_owned(&state.db, id, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PATCH /applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
    Json(req): Json<UpdateApplicationRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    let status = req.parsed_status()?;
    if let Some(notes) = &req.notes {
        require_max_len("notes", notes, MAX_NOTES_LEN)?;
    }

    let updated = sqlx::query(
        r#"
        UPDATE applications
        SET status = COALESCE($3, status),
            notes = COALESCE($4, notes),
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(application_id)
    .bind(auth.user_id)
    .bind(status.map(|s| s.as_str()))
    .bind(&req.notes)
    .execute(&state.db)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(not_found(application_id));
    }
    if let Some(status) = status {
        info!(%application_id, status = status.as_str(), "Application status changed");
    }
    Ok(Json(fetch_owned(&state.db, application_id, auth.user_id).await?))
}

/// DELETE /applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(application_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = sqlx::query("DELETE FROM applications WHERE id = $1 AND user_id = $2")
        .bind(application_id)
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(not_found(application_id));
    }
    info!(%application_id, "Application deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// All of a user's applications, newest first.
pub async fn fetch_applications(db: &PgPool, user_id: Uuid) -> Result<Vec<ApplicationRow>, AppError> {
    let sql = format!("{SELECT_APPLICATIONS} WHERE a.user_id = $1 ORDER BY a.applied_at DESC");
    Ok(sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await?)
}

async fn fetch_owned(db: &PgPool, application_id: Uuid, user_id: Uuid) -> Result<ApplicationRow, AppError> {
    let sql = format!("{SELECT_APPLICATIONS} WHERE a.id = $1 AND a.user_id = $2");
    sqlx::query_as::<_, ApplicationRow>(&sql)
        .bind(application_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| not_found(application_id))
}

fn not_found(application_id: Uuid) -> AppError {
    AppError::NotFound(format!("Application {application_id} not found"))
}
