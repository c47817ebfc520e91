//! Saved jobs ("favorites"), including merge of a locally stored list.

use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::errors::AppError;
use crate::models::job::JobRow;
use crate::state::AppState;

const MAX_SYNC_IDS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct SyncFavoritesRequest {
    pub job_ids: Vec<Uuid>,
}

/// Drops duplicates, keeping first-seen order.
fn dedupe_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// GET /api/v1/favorites
pub async fn handle_list_favorites(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<JobRow>>, AppError> {
    Ok(Json(fetch_saved_jobs(&state.db, auth.user_id).await?))
}

/// POST /api/v1/favorites/:job_id
pub async fn handle_add_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM jobs WHERE id = $1)")
        .bind(job_id)
        .fetch_one(&state.db)
        .await?;
    if !exists {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }

    let inserted = sqlx::query(
        "INSERT INTO saved_jobs (user_id, job_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(auth.user_id)
    .bind(job_id)
    .execute(&state.db)
    .await?;

    if inserted.rows_affected() > 0 {
        info!(user_id = %auth.user_id, %job_id, "Job saved");
        Ok(StatusCode::CREATED)
    } else {
        Ok(StatusCode::OK)
    }
}

/// DELETE /api/v1/favorites/:job_id
pub async fn handle_remove_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = sqlx::query("DELETE FROM saved_jobs WHERE user_id = $1 AND job_id = $2")
        .bind(auth.user_id)
        .bind(job_id)
        .execute(&state.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Job {job_id} is not saved")));
    }
    info!(user_id = %auth.user_id, %job_id, "Job unsaved");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/favorites/sync
///
/// Unknown job ids are ignored; the merged server list is returned.
pub async fn handle_sync_favorites(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SyncFavoritesRequest>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let ids = dedupe_ids(&req.job_ids);
    if ids.len() > MAX_SYNC_IDS {
        return Err(AppError::Validation(format!(
            "At most {MAX_SYNC_IDS} job ids can be synced at once"
        )));
    }

    if !ids.is_empty() {
        let merged = sqlx::query(
            r#"
            INSERT INTO saved_jobs (user_id, job_id)
            SELECT $1, j.id FROM jobs j WHERE j.id = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(auth.user_id)
        .bind(&ids)
        .execute(&state.db)
        .await?;
        info!(
            user_id = %auth.user_id,
            submitted = ids.len(),
            added = merged.rows_affected(),
            "Favorites synced"
        );
    }

    Ok(Json(fetch_saved_jobs(&state.db, auth.user_id).await?))
}

/// Saved jobs, most recently saved first.
pub async fn fetch_saved_jobs(db: &PgPool, user_id: Uuid) -> Result<Vec<JobRow>, AppError> {
    Ok(sqlx::query_as::<_, JobRow>(
        r#"
        SELECT j.* FROM saved_jobs s
        JOIN jobs j ON j.id = s.job_id
        WHERE s.user_id = $1
        ORDER BY s.saved_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?)
}
