use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const THEMES: &[&str] = &["light", "dark", "system"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PreferencesRow {
    pub user_id: Uuid,
    pub onboarding_step: i16,
    pub onboarding_complete: bool,
    pub desired_roles: Vec<String>,
    pub job_types: Vec<String>,
    pub min_salary: Option<i32>,
    pub preferred_locations: Vec<String>,
    pub remote_only: bool,
    pub email_notifications: bool,
    pub theme: String,
    pub updated_at: DateTime<Utc>,
}
