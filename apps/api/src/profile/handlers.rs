//! Axum route handlers for the Profile API.

use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::errors::AppError;
use crate::models::profile::{Education, ProfileRow, WorkExperience};
use crate::profile::completeness::{compute_completeness_report, CompletenessReport};
use crate::profile::skills::{detect_skills, merge_skills};
use crate::state::AppState;
use crate::storage::{put_object, resume_key};
use crate::validation::{is_http_url, require_max_len, require_non_empty};

pub const MAX_SKILLS: usize = 100;
pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;
const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ResumeUploadResponse {
    pub resume_key: String,
    pub detected_skills: Vec<String>,
    pub added_skills: Vec<String>,
    pub skills: Vec<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl UpdateProfileRequest {
    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("name", &self.name)?;
        require_max_len("name", &self.name, 100)?;
        if let Some(headline) = &self.headline {
            require_max_len("headline", headline, 200)?;
        }
        if let Some(bio) = &self.bio {
            require_max_len("bio", bio, 5_000)?;
        }
        if self.skills.len() > MAX_SKILLS {
            return Err(AppError::Validation(format!(
                "At most {MAX_SKILLS} skills are allowed"
            )));
        }
        if self.skills.iter().any(|s| s.trim().is_empty()) {
            return Err(AppError::Validation("Skills cannot be empty".to_string()));
        }
        for (i, entry) in self.experience.iter().enumerate() {
            if entry.company.trim().is_empty() || entry.title.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "experience[{i}] needs a company and a title"
                )));
            }
        }
        for (i, entry) in self.education.iter().enumerate() {
            if entry.institution.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "education[{i}] needs an institution"
                )));
            }
        }
        for (network, url) in &self.social_links {
            if !is_http_url(url) {
                return Err(AppError::Validation(format!(
                    "social_links.{network} must be an http(s) URL"
                )));
            }
        }
        Ok(())
    }

    /// Trimmed skills with case-insensitive duplicates removed.
    fn normalized_skills(&self) -> Vec<String> {
        let mut skills = Vec::new();
        merge_skills(
            &mut skills,
            &self.skills.iter().map(|s| s.trim().to_string()).collect::<Vec<_>>(),
            MAX_SKILLS,
        );
        skills
    }
}

/// GET /profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileRow>, AppError> {
    Ok(Json(fetch_profile(&state.db, auth.user_id).await?))
}

/// PUT /profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileRow>, AppError> {
    req.validate()?;
    let skills = req.normalized_skills();
    let social_links: BTreeMap<String, String> = req
        .social_links
        .iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let mut tx = state.db.begin().await?;
    sqlx::query("UPDATE users SET name = $2 WHERE id = $1")
        .bind(auth.user_id)
        .bind(req.name.trim())
        .execute(&mut *tx)
        .await?;
    let updated = sqlx::query(
        r#"
        UPDATE profiles
        SET headline = $2, bio = $3, location = $4, skills = $5,
            experience = $6, education = $7, social_links = $8, updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .bind(trimmed(req.headline))
    .bind(trimmed(req.bio))
    .bind(trimmed(req.location))
    .bind(&skills)
    .bind(SqlJson(&req.experience))
    .bind(SqlJson(&req.education))
    .bind(SqlJson(&social_links))
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Profile for user {} not found",
            auth.user_id
        )));
    }
    tx.commit().await?;

    info!(user_id = %auth.user_id, skills = skills.len(), "Profile updated");
    Ok(Json(fetch_profile(&state.db, auth.user_id).await?))
}

/// GET /profile/completeness
pub async fn handle_completeness(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CompletenessReport>, AppError> {
    let profile = fetch_profile(&state.db, auth.user_id).await?;
    Ok(Json(compute_completeness_report(&profile)))
}

/// POST /profile/resume (multipart, field `resume`)
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ResumeUploadResponse>, AppError> {
    let mut pdf: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if matches!(field.name(), Some("resume") | Some("file")) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            pdf = Some(bytes);
            break;
        }
    }
    let pdf = pdf.ok_or_else(|| AppError::Validation("Missing 'resume' file field".to_string()))?;
    check_pdf(&pdf)?;

    let extracted = tokio::task::spawn_blocking({
        let pdf = pdf.clone();
        move || pdf_extract::extract_text_from_mem(&pdf)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}")))?;
    let text = match extracted {
        Ok(text) => text,
        Err(e) => {
            warn!(user_id = %auth.user_id, "PDF text extraction failed: {e}");
            return Err(AppError::Validation(
                "Could not read text from the PDF".to_string(),
            ));
        }
    };

    let key = resume_key(auth.user_id, Uuid::new_v4());
    put_object(&state.s3, &state.config.s3_bucket, &key, pdf, "application/pdf").await?;

    let detected_skills = detect_skills(&text);
    let mut profile = fetch_profile(&state.db, auth.user_id).await?;
    let added_skills = merge_skills(&mut profile.skills, &detected_skills, MAX_SKILLS);

    sqlx::query(
        r#"
        UPDATE profiles
        SET resume_s3_key = $2, resume_text = $3, skills = $4, updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .bind(&key)
    .bind(&text)
    .bind(&profile.skills)
    .execute(&state.db)
    .await?;

    info!(
        user_id = %auth.user_id,
        detected = detected_skills.len(),
        added = added_skills.len(),
        "Resume uploaded"
    );
    Ok(Json(ResumeUploadResponse {
        resume_key: key,
        detected_skills,
        added_skills,
        skills: profile.skills,
    }))
}

fn check_pdf(bytes: &[u8]) -> Result<(), AppError> {
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if bytes.len() > MAX_RESUME_BYTES {
        return Err(AppError::Validation(
            "Resume must be at most 5 MiB".to_string(),
        ));
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(AppError::Validation("Resume must be a PDF".to_string()));
    }
    Ok(())
}

pub async fn fetch_profile(db: &PgPool, user_id: Uuid) -> Result<ProfileRow, AppError> {
    sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT p.user_id, u.name, u.email, p.headline, p.bio, p.location, p.skills,
               p.experience, p.education, p.social_links, p.resume_s3_key,
               p.resume_text, p.updated_at
        FROM profiles p
        JOIN users u ON u.id = p.user_id
        WHERE p.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &str) -> UpdateProfileRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_minimal_profile_is_valid() {
        let req = request(r#"{"name":"Ada"}"#);
        assert!(req.validate().is_ok());
        assert!(req.skills.is_empty());
    }

    #[test]
    fn test_too_many_skills() {
        let mut req = request(r#"{"name":"Ada"}"#);
        req.skills = (0..=MAX_SKILLS).map(|i| format!("s{i}")).collect();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_blank_skill_rejected() {
        let req = request(r#"{"name":"Ada","skills":["rust","  "]}"#);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_experience_needs_company_and_title() {
        let req = request(r#"{"name":"Ada","experience":[{"company":"Ferrous","title":""}]}"#);
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("experience[0]"));
    }

    #[test]
    fn test_social_links_must_be_urls() {
        let req = request(r#"{"name":"Ada","social_links":{"github":"github.com/ada"}}"#);
        assert!(req.validate().is_err());
        let req = request(r#"{"name":"Ada","social_links":{"github":"https://github.com/ada"}}"#);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_normalized_skills_dedupe() {
        let req = request(r#"{"name":"Ada","skills":[" Rust ","rust","SQL"]}"#);
        assert_eq!(req.normalized_skills(), vec!["Rust", "SQL"]);
    }

    #[test]
    fn test_check_pdf() {
        assert!(check_pdf(b"%PDF-1.7 ...").is_ok());
        assert!(check_pdf(b"").is_err());
        assert!(check_pdf(b"PK\x03\x04 zip").is_err());
        let mut big = PDF_MAGIC.to_vec();
        big.resize(MAX_RESUME_BYTES + 1, b' ');
        assert!(check_pdf(&big).is_err());
    }
}
