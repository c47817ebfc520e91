use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::validation::{normalize_email, require_email, require_max_len, require_non_empty};

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub received: bool,
}

impl ContactRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("name", &self.name)?;
        require_max_len("name", &self.name, 100)?;
        require_email("email", &self.email)?;
        require_non_empty("subject", &self.subject)?;
        require_max_len("subject", &self.subject, 200)?;
        require_non_empty("message", &self.message)?;
        require_max_len("message", &self.message, 5_000)?;
        Ok(())
    }
}

/// POST /api/v1/contact
pub async fn handle_contact(
    State(state): State<AppState>,
    Json(req): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    req.validate()?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO contact_messages (id, name, email, subject, message) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(req.name.trim())
    .bind(normalize_email(&req.email))
    .bind(req.subject.trim())
    .bind(req.message.trim())
    .execute(&state.db)
    .await?;

    info!(message_id = %id, "Contact message stored");
    Ok((StatusCode::CREATED, Json(ContactResponse { id, received: true })))
}
