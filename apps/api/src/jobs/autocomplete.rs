//! Search-box suggestions drawn from job titles, company names and tags.
//!
//! Ranking is done in Rust over a bounded candidate set from Postgres; the
//! ranked list is cached in Redis per normalized query.

use std::collections::HashSet;

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::jobs::search::{escape_like, like_pattern};

pub const MIN_QUERY_CHARS: usize = 2;
pub const DEFAULT_LIMIT: usize = 8;
pub const MAX_LIMIT: usize = 20;
const CANDIDATE_LIMIT: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Title,
    Company,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub kind: SuggestionKind,
}

/// Trims, lowercases and collapses inner whitespace.
pub fn normalize_query(q: &str) -> String {
    q.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub fn cache_key(normalized_query: &str, limit: usize) -> String {
    format!("autocomplete:v1:{limit}:{normalized_query}")
}

/// 0 = whole-text prefix, 1 = prefix of a later word, 2 = substring.
fn match_rank(text_lower: &str, query: &str) -> Option<u8> {
    if text_lower.starts_with(query) {
        return Some(0);
    }
    let word_prefix = text_lower
        .match_indices(query)
        .any(|(i, _)| {
            text_lower[..i]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_alphanumeric())
        });
    if word_prefix {
        return Some(1);
    }
    if text_lower.contains(query) {
        return Some(2);
    }
    None
}

/// Orders candidates by match quality, then length, then alphabetically.
/// Case-insensitive duplicates keep the first-seen spelling.
pub fn rank_suggestions(query: &str, candidates: Vec<Suggestion>, limit: usize) -> Vec<Suggestion> {
    let query = normalize_query(query);
    if query.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut ranked: Vec<(u8, String, Suggestion)> = candidates
        .into_iter()
        .filter_map(|s| {
            let lower = s.text.trim().to_lowercase();
            if lower.is_empty() || !seen.insert(lower.clone()) {
                return None;
            }
            match_rank(&lower, &query).map(|rank| (rank, lower, s))
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(a.1.chars().count().cmp(&b.1.chars().count()))
            .then(a.1.cmp(&b.1))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(_, _, mut s)| {
            s.text = s.text.trim().to_string();
            s
        })
        .collect()
}

/// Candidates are ordered by match class before the limit so that prefix
/// matches survive a crowded result set. `$3` is the prefix pattern and `$4`
/// the word-prefix pattern.
const CANDIDATE_SQL: &str = r#"
    SELECT text, kind FROM (
        SELECT DISTINCT title AS text, 'title' AS kind
        FROM jobs WHERE is_active AND title ILIKE $1
        UNION
        SELECT DISTINCT company_name, 'company'
        FROM jobs WHERE is_active AND company_name ILIKE $1
        UNION
        SELECT DISTINCT t, 'tag'
        FROM jobs, unnest(tags) AS t WHERE is_active AND t ILIKE $1
    ) candidates
    ORDER BY
        CASE
            WHEN LOWER(text) LIKE $3 THEN 0
            WHEN ' ' || LOWER(text) LIKE $4 THEN 1
            ELSE 2
        END,
        LENGTH(text),
        text
    LIMIT $2
"#;

/// `query%`, matching text that starts with the query.
pub fn prefix_pattern(normalized_query: &str) -> String {
    format!("{}%", escape_like(normalized_query))
}

/// `% query%`, matching the query at the start of any later word.
pub fn word_prefix_pattern(normalized_query: &str) -> String {
    format!("% {}%", escape_like(normalized_query))
}

/// Loads matching titles, companies and tags from active jobs.
pub async fn fetch_candidates(
    db: &PgPool,
    normalized_query: &str,
) -> Result<Vec<Suggestion>, AppError> {
    let rows: Vec<(String, String)> = sqlx::query_as(CANDIDATE_SQL)
        .bind(like_pattern(normalized_query))
        .bind(CANDIDATE_LIMIT)
        .bind(prefix_pattern(normalized_query))
        .bind(word_prefix_pattern(normalized_query))
        .fetch_all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(text, kind)| Suggestion {
            text,
            kind: match kind.as_str() {
                "company" => SuggestionKind::Company,
                "tag" => SuggestionKind::Tag,
                _ => SuggestionKind::Title,
            },
        })
        .collect())
}

/// Cache read. Redis failures are logged and treated as a miss.
pub async fn read_cache(redis: &redis::Client, key: &str) -> Option<Vec<Suggestion>> {
    let mut conn = match redis.get_multiplexed_async_connection().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Autocomplete cache unavailable: {e}");
            return None;
        }
    };
    let cached: Option<String> = match conn.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Autocomplete cache read failed: {e}");
            return None;
        }
    };
    let suggestions = serde_json::from_str(&cached?).ok();
    if suggestions.is_some() {
        debug!(key, "Autocomplete cache hit");
    }
    suggestions
}

/// Cache write. Redis failures are logged and ignored.
pub async fn write_cache(
    redis: &redis::Client,
    key: &str,
    suggestions: &[Suggestion],
    ttl_secs: u64,
) {
    let Ok(payload) = serde_json::to_string(suggestions) else {
        return;
    };
    let result: redis::RedisResult<()> = async {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        conn.set_ex(key, payload, ttl_secs).await
    }
    .await;
    if let Err(e) = result {
        warn!("Autocomplete cache write failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str, kind: SuggestionKind) -> Suggestion {
        Suggestion {
            text: text.to_string(),
            kind,
        }
    }

    #[test]
    fn test_short_query_returns_nothing() {
        let out = rank_suggestions("r", vec![s("Rust Engineer", SuggestionKind::Title)], 8);
        assert!(out.is_empty());
    }

    #[test]
    fn test_prefix_beats_word_prefix_beats_substring() {
        let out = rank_suggestions(
            "dev",
            vec![
                s("Frontend Developer", SuggestionKind::Title),
                s("devops", SuggestionKind::Tag),
                s("WebDev Studio", SuggestionKind::Company),
            ],
            8,
        );
        let texts: Vec<_> = out.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["devops", "Frontend Developer", "WebDev Studio"]);
    }

    #[test]
    fn test_shorter_first_then_alphabetical() {
        let out = rank_suggestions(
            "rust",
            vec![
                s("Rust Engineer", SuggestionKind::Title),
                s("rust", SuggestionKind::Tag),
                s("Rust Developer", SuggestionKind::Title),
            ],
            8,
        );
        let texts: Vec<_> = out.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["rust", "Rust Engineer", "Rust Developer"]);
    }

    #[test]
    fn test_case_insensitive_dedup() {
        let out = rank_suggestions(
            "go",
            vec![
                s("Go", SuggestionKind::Tag),
                s("GO", SuggestionKind::Tag),
                s(" go ", SuggestionKind::Tag),
            ],
            8,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "Go");
    }

    #[test]
    fn test_limit_applies() {
        let candidates = (0..30)
            .map(|i| s(&format!("Engineer {i}"), SuggestionKind::Title))
            .collect();
        assert_eq!(rank_suggestions("eng", candidates, 5).len(), 5);
    }

    #[test]
    fn test_non_matching_candidates_dropped() {
        let out = rank_suggestions("python", vec![s("Rust Engineer", SuggestionKind::Title)], 8);
        assert!(out.is_empty());
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Senior   RUST\tdev "), "senior rust dev");
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(100)), MAX_LIMIT);
    }

    #[test]
    fn test_cache_key_includes_limit() {
        assert_ne!(cache_key("rust", 5), cache_key("rust", 8));
    }

    #[test]
    fn test_candidates_ordered_before_limit() {
        let order_by = CANDIDATE_SQL.find("ORDER BY").unwrap();
        let limit = CANDIDATE_SQL.find("LIMIT $2").unwrap();
        assert!(order_by < limit);
        assert!(CANDIDATE_SQL[order_by..limit].contains("LIKE $3 THEN 0"));
    }

    #[test]
    fn test_prefix_patterns_escape_wildcards() {
        assert_eq!(prefix_pattern("en"), "en%");
        assert_eq!(prefix_pattern("c_"), "c\\_%");
        assert_eq!(word_prefix_pattern("go"), "% go%");
    }

    #[tokio::test]
    async fn test_cache_failures_are_bypassed() {
        let redis = redis::Client::open("redis://127.0.0.1:1").unwrap();
        let key = cache_key("rust", DEFAULT_LIMIT);
        assert!(read_cache(&redis, &key).await.is_none());
        write_cache(&redis, &key, &[s("Rust", SuggestionKind::Tag)], 60).await;
        assert!(read_cache(&redis, &key).await.is_none());
    }
}
