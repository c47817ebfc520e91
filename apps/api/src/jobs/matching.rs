//! Pluggable, trait-based scorer that ranks jobs for a user.
//!
//! Default: `KeywordJobMatcher`.
//! `AppState` holds an `Arc<dyn JobMatcher>`.

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::job::JobRow;

/// What the matcher knows about the user.
#[derive(Debug, Clone, Default)]
pub struct MatchProfile {
    pub skills: Vec<String>,
    pub desired_roles: Vec<String>,
    pub job_types: Vec<String>,
    pub min_salary: Option<i32>,
    pub remote_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobMatch {
    pub job: JobRow,
    /// 0 – 100
    pub score: u32,
    pub matched_skills: Vec<String>,
    pub role_match: bool,
}

#[async_trait]
pub trait JobMatcher: Send + Sync {
    async fn rank(
        &self,
        profile: &MatchProfile,
        jobs: Vec<JobRow>,
        limit: usize,
    ) -> Result<Vec<JobMatch>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordJobMatcher
// ────────────────────────────────────────────────────────────────────────────

const SKILL_WEIGHT: f64 = 0.6;
const ROLE_WEIGHT: f64 = 0.25;
const PREFERENCE_WEIGHT: f64 = 0.15;

/// Keyword scorer.
///
/// score = 100 × (0.6 × skill coverage + 0.25 × role match + 0.15 × preference fit)
///
/// - skill coverage: user skills found in the job's tags, title or
///   description, divided by the job's tag count (or by the user's skill
///   count when the job has no tags), capped at 1.
/// - role match: any desired role appears in the title.
/// - preference fit: half for job type, half for salary floor; an unset
///   preference counts as satisfied.
///
/// Non-remote jobs are excluded for remote-only users; zero scores are dropped.
pub struct KeywordJobMatcher;

#[async_trait]
impl JobMatcher for KeywordJobMatcher {
    async fn rank(
        &self,
        profile: &MatchProfile,
        jobs: Vec<JobRow>,
        limit: usize,
    ) -> Result<Vec<JobMatch>, AppError> {
        Ok(rank_by_keywords(profile, jobs, limit))
    }
}

pub(crate) fn contains_term(haystack_lower: &str, term_lower: &str) -> bool {
    haystack_lower
        .match_indices(term_lower)
        .any(|(i, m)| {
            let before = haystack_lower[..i].chars().next_back();
            let after = haystack_lower[i + m.len()..].chars().next();
            let boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric());
            boundary(before) && boundary(after)
        })
}

pub fn score_job(profile: &MatchProfile, job: &JobRow) -> Option<(u32, Vec<String>, bool)> {
    if profile.remote_only && !job.remote {
        return None;
    }

    let title = job.title.to_lowercase();
    let description = job.description.to_lowercase();
    let tags: Vec<String> = job.tags.iter().map(|t| t.to_lowercase()).collect();

    let mut matched_skills = Vec::new();
    for skill in &profile.skills {
        let skill_lower = skill.trim().to_lowercase();
        if skill_lower.is_empty() || matched_skills.iter().any(|m: &String| m.to_lowercase() == skill_lower) {
            continue;
        }
        let hit = tags.contains(&skill_lower)
            || contains_term(&title, &skill_lower)
            || contains_term(&description, &skill_lower);
        if hit {
            matched_skills.push(skill.trim().to_string());
        }
    }

    let denominator = if tags.is_empty() {
        profile.skills.len()
    } else {
        tags.len()
    };
    let skill_coverage = if denominator == 0 {
        0.0
    } else {
        (matched_skills.len() as f64 / denominator as f64).min(1.0)
    };

    let role_match = profile
        .desired_roles
        .iter()
        .map(|r| r.trim().to_lowercase())
        .any(|r| !r.is_empty() && title.contains(&r));

    let type_fit = profile.job_types.is_empty()
        || profile
            .job_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&job.job_type));
    let salary_fit = match (profile.min_salary, job.salary_max.or(job.salary_min)) {
        (Some(floor), Some(offered)) => offered >= floor,
        _ => true,
    };
    let preference_fit = 0.5 * f64::from(u8::from(type_fit)) + 0.5 * f64::from(u8::from(salary_fit));

    let raw = SKILL_WEIGHT * skill_coverage
        + ROLE_WEIGHT * f64::from(u8::from(role_match))
        + PREFERENCE_WEIGHT * preference_fit;
    let score = (raw * 100.0).round() as u32;

    // Preference fit alone does not make a recommendation.
    if matched_skills.is_empty() && !role_match {
        return None;
    }
    Some((score.min(100), matched_skills, role_match))
}

pub fn rank_by_keywords(profile: &MatchProfile, jobs: Vec<JobRow>, limit: usize) -> Vec<JobMatch> {
    let mut matches: Vec<JobMatch> = jobs
        .into_iter()
        .filter_map(|job| {
            let (score, matched_skills, role_match) = score_job(profile, &job)?;
            (score > 0).then_some(JobMatch {
                job,
                score,
                matched_skills,
                role_match,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.job.posted_at.cmp(&a.job.posted_at))
    });
    matches.truncate(limit);
    matches
}
