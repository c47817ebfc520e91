//! User settings (theme, notifications, remote-only, salary floor).

use axum::{extract::State, Json};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::errors::AppError;
use crate::models::preferences::{PreferencesRow, THEMES};
use crate::state::AppState;

/// Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    pub theme: Option<String>,
    pub email_notifications: Option<bool>,
    pub remote_only: Option<bool>,
    pub min_salary: Option<i32>,
}

impl UpdateSettingsRequest {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(theme) = &self.theme {
            let theme = theme.trim().to_ascii_lowercase();
            if !THEMES.contains(&theme.as_str()) {
                return Err(AppError::Validation(format!(
                    "theme must be one of {}",
                    THEMES.join(", ")
                )));
            }
            self.theme = Some(theme);
        }
        if self.min_salary.is_some_and(|s| s < 0) {
            return Err(AppError::Validation(
                "min_salary cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// GET /api/v1/settings
pub async fn handle_get_settings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PreferencesRow>, AppError> {
    Ok(Json(fetch_preferences(&state.db, auth.user_id).await?))
}

/// PUT /api/v1/settings
pub async fn handle_update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(mut req): Json<UpdateSettingsRequest>,
) -> Result<Json<PreferencesRow>, AppError> {
    req.validate()?;

    let row = sqlx::query_as::<_, PreferencesRow>(
        r#"
        UPDATE preferences
        SET theme = COALESCE($2, theme),
            email_notifications = COALESCE($3, email_notifications),
            remote_only = COALESCE($4, remote_only),
            min_salary = COALESCE($5, min_salary),
            updated_at = NOW()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(&req.theme)
    .bind(req.email_notifications)
    .bind(req.remote_only)
    .bind(req.min_salary)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| not_found(auth.user_id))?;

    info!(user_id = %auth.user_id, theme = %row.theme, "Settings updated");
    Ok(Json(row))
}

pub async fn fetch_preferences(db: &PgPool, user_id: Uuid) -> Result<PreferencesRow, AppError> {
    sqlx::query_as::<_, PreferencesRow>("SELECT * FROM preferences WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| not_found(user_id))
}

fn not_found(user_id: Uuid) -> AppError {
    AppError::NotFound(format!("Preferences for user {user_id} not found"))
}
