//! Turns job-search query-string filters into a parameterized SQL query.

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::is_valid_job_type;
use crate::pagination::{normalize_page, normalize_per_page, offset};

const MAX_QUERY_LEN: usize = 200;
const MAX_POSTED_WITHIN_DAYS: i32 = 365;

/// Raw query-string parameters for `GET /api/jobs`.
#[derive(Debug, Default, Deserialize)]
pub struct JobSearchParams {
    pub q: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub remote: Option<bool>,
    pub salary_min: Option<i32>,
    pub tag: Option<String>,
    pub company_id: Option<Uuid>,
    pub posted_within_days: Option<i32>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobSort {
    #[default]
    Newest,
    Oldest,
    Salary,
}

impl JobSort {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" | "date" | "recent" => Some(JobSort::Newest),
            "oldest" => Some(JobSort::Oldest),
            "salary" => Some(JobSort::Salary),
            _ => None,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            JobSort::Newest => " ORDER BY posted_at DESC, id",
            JobSort::Oldest => " ORDER BY posted_at ASC, id",
            JobSort::Salary => {
                " ORDER BY COALESCE(salary_max, salary_min) DESC NULLS LAST, posted_at DESC, id"
            }
        }
    }
}

/// Validated, normalized search.
#[derive(Debug, Clone, Default)]
pub struct JobSearch {
    pub text: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub remote: Option<bool>,
    pub salary_min: Option<i32>,
    pub tag: Option<String>,
    pub company_id: Option<Uuid>,
    pub posted_within_days: Option<i32>,
    pub sort: JobSort,
    pub page: i64,
    pub per_page: i64,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl JobSearchParams {
    pub fn validate(self) -> Result<JobSearch, AppError> {
        let text = non_blank(self.q);
        if text.as_ref().is_some_and(|t| t.chars().count() > MAX_QUERY_LEN) {
            return Err(AppError::Validation(format!(
                "q must be at most {MAX_QUERY_LEN} characters"
            )));
        }

        let job_type = non_blank(self.job_type).map(|t| t.to_ascii_lowercase());
        if let Some(t) = &job_type {
            if !is_valid_job_type(t) {
                return Err(AppError::Validation(format!("Unknown job_type '{t}'")));
            }
        }

        if self.salary_min.is_some_and(|s| s < 0) {
            return Err(AppError::Validation(
                "salary_min cannot be negative".to_string(),
            ));
        }

        if let Some(days) = self.posted_within_days {
            if !(1..=MAX_POSTED_WITHIN_DAYS).contains(&days) {
                return Err(AppError::Validation(format!(
                    "posted_within_days must be between 1 and {MAX_POSTED_WITHIN_DAYS}"
                )));
            }
        }

        let sort = match non_blank(self.sort) {
            Some(s) => JobSort::parse(&s)
                .ok_or_else(|| AppError::Validation(format!("Unknown sort '{s}'")))?,
            None => JobSort::default(),
        };

        Ok(JobSearch {
            text,
            location: non_blank(self.location),
            job_type,
            remote: self.remote,
            salary_min: self.salary_min,
            tag: non_blank(self.tag).map(|t| t.to_lowercase()),
            company_id: self.company_id,
            posted_within_days: self.posted_within_days,
            sort,
            page: normalize_page(self.page),
            per_page: normalize_per_page(self.per_page),
        })
    }
}

/// Escapes `%`, `_` and `\` so user text matches literally inside LIKE.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Substring pattern for ILIKE.
pub fn like_pattern(text: &str) -> String {
    format!("%{}%", escape_like(text))
}

fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, search: &JobSearch) {
    qb.push(" WHERE is_active = TRUE");

    if let Some(text) = &search.text {
        let pattern = like_pattern(text);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR company_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS t WHERE t ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
    if let Some(location) = &search.location {
        qb.push(" AND location ILIKE ")
            .push_bind(like_pattern(location));
    }
    if let Some(job_type) = &search.job_type {
        qb.push(" AND job_type = ").push_bind(job_type.clone());
    }
    if let Some(remote) = search.remote {
        qb.push(" AND remote = ").push_bind(remote);
    }
    if let Some(salary_min) = search.salary_min {
        qb.push(" AND COALESCE(salary_max, salary_min) >= ")
            .push_bind(salary_min);
    }
    if let Some(tag) = &search.tag {
        qb.push(" AND ").push_bind(tag.clone()).push(" = ANY(tags)");
    }
    if let Some(company_id) = search.company_id {
        qb.push(" AND company_id = ").push_bind(company_id);
    }
    if let Some(days) = search.posted_within_days {
        qb.push(" AND posted_at >= NOW() - make_interval(days => ")
            .push_bind(days)
            .push(")");
    }
}

/// `SELECT * FROM jobs ...` for the requested page.
pub fn build_select(search: &JobSearch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT * FROM jobs");
    push_filters(&mut qb, search);
    qb.push(search.sort.order_by());
    qb.push(" LIMIT ")
        .push_bind(search.per_page)
        .push(" OFFSET ")
        .push_bind(offset(search.page, search.per_page));
    qb
}

/// `SELECT COUNT(*) FROM jobs ...` with the same filters.
pub fn build_count(search: &JobSearch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM jobs");
    push_filters(&mut qb, search);
    qb
}
