use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::errors::AppError;
use crate::onboarding::wizard::{advance, OnboardingStep, StepPayload};
use crate::state::AppState;

#[derive(Debug, Serialize, FromRow)]
pub struct OnboardingData {
    pub name: String,
    pub headline: Option<String>,
    pub desired_roles: Vec<String>,
    pub job_types: Vec<String>,
    pub min_salary: Option<i32>,
    pub skills: Vec<String>,
    pub preferred_locations: Vec<String>,
    pub remote_only: bool,
}

#[derive(Debug, FromRow)]
struct CursorRow {
    onboarding_step: i16,
    onboarding_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct OnboardingState {
    pub current_step: OnboardingStep,
    pub step_index: i16,
    pub complete: bool,
    pub steps: Vec<OnboardingStep>,
    pub data: OnboardingData,
}

/// GET /api/v1/onboarding
pub async fn handle_get_onboarding(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<OnboardingState>, AppError> {
    Ok(Json(load_state(&state.db, auth.user_id).await?))
}

/// PUT /api/v1/onboarding/:step
pub async fn handle_submit_step(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(step): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<OnboardingState>, AppError> {
    let step = OnboardingStep::parse(&step)
        .ok_or_else(|| AppError::NotFound(format!("Unknown onboarding step '{step}'")))?;

    let mut tx = state.db.begin().await?;
    let cursor = sqlx::query_as::<_, CursorRow>(
        "SELECT onboarding_step, onboarding_complete FROM preferences WHERE user_id = $1 FOR UPDATE",
    )
    .bind(auth.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Preferences for user {} not found", auth.user_id)))?;

    let current = if cursor.onboarding_complete {
        OnboardingStep::Complete
    } else {
        OnboardingStep::from_index(cursor.onboarding_step)
    };
    let progress = advance(current, step)?;
    let payload = StepPayload::parse(step, body)?;

    match payload {
        StepPayload::Basics(p) => {
            sqlx::query("UPDATE users SET name = $2 WHERE id = $1")
                .bind(auth.user_id)
                .bind(&p.name)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE profiles SET headline = $2, updated_at = NOW() WHERE user_id = $1")
                .bind(auth.user_id)
                .bind(&p.headline)
                .execute(&mut *tx)
                .await?;
        }
        StepPayload::JobPreferences(p) => {
            sqlx::query(
                "UPDATE preferences SET desired_roles = $2, job_types = $3, min_salary = $4 WHERE user_id = $1",
            )
            .bind(auth.user_id)
            .bind(&p.desired_roles)
            .bind(&p.job_types)
            .bind(p.min_salary)
            .execute(&mut *tx)
            .await?;
        }
        StepPayload::Skills(p) => {
            sqlx::query("UPDATE profiles SET skills = $2, updated_at = NOW() WHERE user_id = $1")
                .bind(auth.user_id)
                .bind(&p.skills)
                .execute(&mut *tx)
                .await?;
        }
        StepPayload::Location(p) => {
            sqlx::query(
                "UPDATE preferences SET preferred_locations = $2, remote_only = $3 WHERE user_id = $1",
            )
            .bind(auth.user_id)
            .bind(&p.preferred_locations)
            .bind(p.remote_only)
            .execute(&mut *tx)
            .await?;
        }
    }

    sqlx::query(
        r#"
        UPDATE preferences
        SET onboarding_step = $2, onboarding_complete = $3, updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .bind(progress.cursor.index())
    .bind(progress.complete)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(
        user_id = %auth.user_id,
        step = step.as_str(),
        cursor = progress.cursor.as_str(),
        "Onboarding step saved"
    );
    if progress.complete && !cursor.onboarding_complete {
        info!(user_id = %auth.user_id, "Onboarding complete");
    }

    Ok(Json(load_state(&state.db, auth.user_id).await?))
}

async fn load_state(db: &PgPool, user_id: Uuid) -> Result<OnboardingState, AppError> {
    let cursor = sqlx::query_as::<_, CursorRow>(
        "SELECT onboarding_step, onboarding_complete FROM preferences WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Preferences for user {user_id} not found")))?;

    let data = sqlx::query_as::<_, OnboardingData>(
        r#"
        SELECT u.name, p.headline, pr.desired_roles, pr.job_types, pr.min_salary,
               p.skills, pr.preferred_locations, pr.remote_only
        FROM users u
        JOIN profiles p ON p.user_id = u.id
        JOIN preferences pr ON pr.user_id = u.id
        WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let current_step = if cursor.onboarding_complete {
        OnboardingStep::Complete
    } else {
        OnboardingStep::from_index(cursor.onboarding_step)
    };
    Ok(OnboardingState {
        current_step,
        step_index: current_step.index(),
        complete: cursor.onboarding_complete,
        steps: OnboardingStep::ALL.to_vec(),
        data,
    })
}
