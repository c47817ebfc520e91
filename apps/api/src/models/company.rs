use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Company with rating aggregates computed from its reviews.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanySummaryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub size: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub rating: Option<f64>,
    pub review_count: i64,
    pub open_jobs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyReviewRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub rating: i16,
    pub title: String,
    pub body: Option<String>,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub work_life_balance: i16,
    pub culture_values: i16,
    pub career_opportunities: i16,
    pub compensation: i16,
    pub management: i16,
    pub created_at: DateTime<Utc>,
}
