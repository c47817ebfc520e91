//! Axum route handlers for account management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::applications::handlers::fetch_applications;
use crate::auth::middleware::AuthUser;
use crate::auth::oauth::{fetch_profile, OAuthProvider};
use crate::auth::password::{hash_password, validate_password, verify_password};
use crate::errors::AppError;
use crate::favorites::fetch_saved_jobs;
use crate::models::application::ApplicationRow;
use crate::models::job::JobRow;
use crate::models::preferences::PreferencesRow;
use crate::models::profile::ProfileRow;
use crate::models::user::User;
use crate::profile::handlers::fetch_profile as fetch_user_profile;
use crate::settings::fetch_preferences;
use crate::state::AppState;
use crate::storage::{export_key, put_object};
use crate::validation::{normalize_email, require_email, require_max_len, require_non_empty};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackRequest {
    pub code: String,
    pub redirect_uri: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct DataExport {
    pub exported_at: DateTime<Utc>,
    pub user: User,
    pub profile: ProfileRow,
    pub preferences: PreferencesRow,
    pub applications: Vec<ApplicationRow>,
    pub saved_jobs: Vec<JobRow>,
}

#[derive(Debug, Serialize)]
pub struct DataExportResponse {
    pub archive_key: String,
    pub data: DataExport,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    require_email("email", &req.email)?;
    require_non_empty("name", &req.name)?;
    require_max_len("name", &req.name, 100)?;
    validate_password(&req.password)?;

    let email = normalize_email(&req.email);
    if find_user_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(req.password).await?;
    let user = create_user(&state.db, &email, req.name.trim(), Some(&password_hash), "password").await?;
    info!(user_id = %user.id, "Registered new user");

    let token = state.jwt.create_token(user.id, &user.email, user.is_admin)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::Validation("Invalid email or password".to_string());

    let user = find_user_by_email(&state.db, &normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    let verified = match user.password_hash.clone() {
        Some(hash) => verify_password(req.password, hash).await?,
        None => false,
    };
    if !verified {
        return Err(invalid());
    }

    let token = state.jwt.create_token(user.id, &user.email, user.is_admin)?;
    Ok(Json(AuthResponse { token, user }))
}

/// GET /auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<User>, AppError> {
    Ok(Json(fetch_user(&state.db, auth.user_id).await?))
}

/// POST /auth/change-password
pub async fn handle_change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    let user = fetch_user(&state.db, auth.user_id).await?;

    let current_hash = user.password_hash.clone().ok_or_else(|| {
        AppError::Validation(format!(
            "This account signs in with {}; it has no password to change",
            user.auth_provider
        ))
    })?;

    if !verify_password(req.current_password.clone(), current_hash).await? {
        return Err(AppError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }
    validate_password(&req.new_password)?;
    if req.new_password == req.current_password {
        return Err(AppError::Validation(
            "New password must differ from the current password".to_string(),
        ));
    }

    let new_hash = hash_password(req.new_password).await?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(new_hash)
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    info!(user_id = %auth.user_id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /auth/delete-account
pub async fn handle_delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(auth.user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {} not found", auth.user_id)));
    }

    info!(user_id = %auth.user_id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/export-data
///
/// Returns everything stored about the caller and archives the same bundle
/// to object storage.
pub async fn handle_export_data(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DataExportResponse>, AppError> {
    let exported_at = Utc::now();
    let data = DataExport {
        exported_at,
        user: fetch_user(&state.db, auth.user_id).await?,
        profile: fetch_user_profile(&state.db, auth.user_id).await?,
        preferences: fetch_preferences(&state.db, auth.user_id).await?,
        applications: fetch_applications(&state.db, auth.user_id).await?,
        saved_jobs: fetch_saved_jobs(&state.db, auth.user_id).await?,
    };

    let body = serde_json::to_vec_pretty(&data)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("export serialization failed: {e}")))?;
    let archive_key = export_key(auth.user_id, exported_at);
    put_object(
        &state.s3,
        &state.config.s3_bucket,
        &archive_key,
        body,
        "application/json",
    )
    .await?;

    Ok(Json(DataExportResponse { archive_key, data }))
}

/// POST /auth/oauth/:provider
///
/// Signs in (or signs up) with a LinkedIn or Google authorization code.
pub async fn handle_oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(req): Json<OAuthCallbackRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let provider = OAuthProvider::parse(&provider)
        .ok_or_else(|| AppError::NotFound(format!("Unknown OAuth provider '{provider}'")))?;
    let credentials = provider.credentials(&state.config).ok_or_else(|| {
        AppError::Unavailable(format!("{} sign-in is not configured", provider.as_str()))
    })?;
    require_non_empty("code", &req.code)?;

    let profile =
        fetch_profile(&state.http, provider, credentials, &req.code, &req.redirect_uri).await?;
    let email = profile.verified_email(provider)?;

    let user = match find_user_by_email(&state.db, &email).await? {
        Some(user) if user.auth_provider != provider.as_str() => {
            let user = record_auth_provider(&state.db, user.id, provider.as_str()).await?;
            info!(
                user_id = %user.id,
                provider = provider.as_str(),
                "Linked OAuth provider to user"
            );
            user
        }
        Some(user) => user,
        None => {
            let name = profile
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
            let user = create_user(&state.db, &email, &name, None, provider.as_str()).await?;
            info!(user_id = %user.id, provider = provider.as_str(), "Registered user via OAuth");
            user
        }
    };

    let token = state.jwt.create_token(user.id, &user.email, user.is_admin)?;
    Ok(Json(AuthResponse { token, user }))
}

// ────────────────────────────────────────────────────────────────────────────
// Queries
// ────────────────────────────────────────────────────────────────────────────

pub async fn fetch_user(db: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
}

async fn find_user_by_email(db: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    Ok(
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(db)
            .await?,
    )
}

async fn record_auth_provider(
    db: &PgPool,
    user_id: Uuid,
    provider: &str,
) -> Result<User, AppError> {
    Ok(
        sqlx::query_as::<_, User>("UPDATE users SET auth_provider = $2 WHERE id = $1 RETURNING *")
            .bind(user_id)
            .bind(provider)
            .fetch_one(db)
            .await?,
    )
}

/// Inserts the user together with an empty profile and default preferences.
async fn create_user(
    db: &PgPool,
    email: &str,
    name: &str,
    password_hash: Option<&str>,
    provider: &str,
) -> Result<User, AppError> {
    let mut tx = db.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, name, password_hash, auth_provider)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(provider)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO preferences (user_id) VALUES ($1)")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(user)
}
