use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const JOB_TYPES: &[&str] = &["full_time", "part_time", "contract", "freelance", "internship"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub company_id: Option<Uuid>,
    pub company_name: String,
    pub location: String,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub salary_currency: String,
    pub job_type: String,
    pub remote: bool,
    pub description: String,
    pub tags: Vec<String>,
    pub source: String,
    pub source_id: Option<String>,
    pub url: Option<String>,
    #[serde(skip_serializing)]
    pub content_hash: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub posted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn is_valid_job_type(job_type: &str) -> bool {
    JOB_TYPES.contains(&job_type)
}
