//! Job-feed import: fetch a JSON array of remote listings, normalize each one
//! and upsert it keyed by `(source, source_id)`.
//!
//! The feed shape follows the common remote-board export format (RemoteOK
//! style): `position`/`title`, `company`, `tags`, HTML `description`,
//! `salary_min`/`salary_max`, ISO `date`, `url`. Elements that do not look
//! like listings (e.g. a leading legal notice) are skipped.

use chrono::{DateTime, Utc};
use scraper::{Html, Node};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::is_valid_job_type;

const MAX_TAGS: usize = 20;
const MAX_FEED_BYTES: usize = 10 * 1024 * 1024;

/// One feed element. Every field is read leniently: a value of the wrong
/// JSON type becomes `None` instead of failing the whole listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedListing {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "position", deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, alias = "company_name", deserialize_with = "lenient_string")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_salary")]
    pub salary_min: Option<i64>,
    #[serde(default, deserialize_with = "lenient_salary")]
    pub salary_max: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, alias = "apply_url", deserialize_with = "lenient_string")]
    pub url: Option<String>,
}

fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts an array (non-string entries dropped) or a comma-separated string.
fn lenient_tags<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        Some(Value::String(s)) => Some(s.split(',').map(str::to_string).collect()),
        _ => None,
    })
}

fn lenient_salary<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(salary_value))
}

/// Reads a salary from a JSON number or a numeric string such as
/// `"80000"`, `"$80,000"` or `"80000.50"`.
pub fn salary_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | '_' | ' '))
                .collect();
            digits.parse::<i64>().ok().or_else(|| {
                digits
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as i64)
            })
        }
        _ => None,
    }
}

/// A listing ready to be written to the `jobs` table.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedJob {
    pub source_id: String,
    pub title: String,
    pub company_name: String,
    pub location: String,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub job_type: String,
    pub description: String,
    pub tags: Vec<String>,
    pub url: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub content_hash: String,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ScrapeReport {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

const BLOCK_ELEMENTS: &[&str] = &[
    "br", "p", "li", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "tr",
];

fn is_block(node: Option<&Node>) -> bool {
    node.and_then(Node::as_element)
        .is_some_and(|el| BLOCK_ELEMENTS.contains(&el.name()))
}

/// Extracts the text of an HTML fragment. Script and style contents are
/// dropped; block elements start a new line and runs of whitespace collapse.
pub fn strip_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => out.push('\n'),
            Node::Text(text) => {
                let hidden = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|el| matches!(el.name(), "script" | "style"))
                });
                if hidden {
                    continue;
                }
                if is_block(node.prev_sibling().map(|s| s.value())) {
                    out.push('\n');
                }
                out.push_str(text);
            }
            _ => {}
        }
    }

    out.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercases, trims and de-duplicates tags, preserving first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || out.contains(&tag) {
            continue;
        }
        out.push(tag);
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}

/// Zero and negative salaries mean "not stated"; a reversed range is swapped.
pub fn normalize_salary(min: Option<i64>, max: Option<i64>) -> (Option<i32>, Option<i32>) {
    let clean = |v: Option<i64>| {
        v.filter(|v| *v > 0)
            .map(|v| i32::try_from(v).unwrap_or(i32::MAX))
    };
    match (clean(min), clean(max)) {
        (Some(lo), Some(hi)) if lo > hi => (Some(hi), Some(lo)),
        other => other,
    }
}

pub fn content_hash(title: &str, company: &str, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(company.as_bytes());
    hasher.update([0u8]);
    hasher.update(description.as_bytes());
    hex::encode(hasher.finalize())
}

fn id_to_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns `None` for listings without a title or company.
pub fn normalize_listing(listing: &FeedListing, now: DateTime<Utc>) -> Option<NormalizedJob> {
    let title = listing.title.as_deref()?.trim();
    let company = listing.company.as_deref()?.trim();
    if title.is_empty() || company.is_empty() {
        return None;
    }

    let description = listing
        .description
        .as_deref()
        .map(strip_html)
        .unwrap_or_default();
    let hash = content_hash(title, company, &description);
    let source_id = listing
        .id
        .as_ref()
        .and_then(id_to_string)
        .unwrap_or_else(|| hash[..16].to_string());

    let location = listing
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("Remote")
        .to_string();

    let job_type = listing
        .job_type
        .as_deref()
        .map(|t| t.trim().to_ascii_lowercase().replace(['-', ' '], "_"))
        .filter(|t| is_valid_job_type(t))
        .unwrap_or_else(|| "full_time".to_string());

    let posted_at = listing
        .date
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc3339(d.trim()).ok())
        .map(|d| d.with_timezone(&Utc))
        .filter(|d| *d <= now)
        .unwrap_or(now);

    let (salary_min, salary_max) = normalize_salary(listing.salary_min, listing.salary_max);

    Some(NormalizedJob {
        source_id,
        title: title.to_string(),
        company_name: company.to_string(),
        location,
        salary_min,
        salary_max,
        job_type,
        description,
        tags: normalize_tags(listing.tags.as_deref().unwrap_or_default()),
        url: listing.url.clone().filter(|u| !u.trim().is_empty()),
        posted_at,
        content_hash: hash,
    })
}

/// Splits a feed body into listings. Elements that are not objects, or that
/// lack a title or company, are counted as skipped; other malformed fields
/// are dropped from the listing.
pub fn parse_feed(body: &str) -> Result<(Vec<FeedListing>, usize), AppError> {
    let items: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| AppError::Upstream(format!("Feed is not a JSON array: {e}")))?;

    let mut listings = Vec::new();
    let mut skipped = 0;
    for item in items {
        match serde_json::from_value::<FeedListing>(item) {
            Ok(listing) if listing.title.is_some() && listing.company.is_some() => {
                listings.push(listing)
            }
            _ => skipped += 1,
        }
    }
    Ok((listings, skipped))
}

pub async fn fetch_feed(http: &reqwest::Client, feed_url: &str) -> Result<String, AppError> {
    let response = http
        .get(feed_url)
        .header("Accept", "application/json")
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AppError::Upstream(format!("Feed request failed: {e}")))?;

    let body = response
        .bytes()
        .await
        .map_err(|e| AppError::Upstream(format!("Feed body unreadable: {e}")))?;
    if body.len() > MAX_FEED_BYTES {
        return Err(AppError::Upstream(format!(
            "Feed exceeds {MAX_FEED_BYTES} bytes"
        )));
    }
    String::from_utf8(body.to_vec())
        .map_err(|e| AppError::Upstream(format!("Feed is not UTF-8: {e}")))
}

/// Fetches, normalizes and upserts a feed. Listings whose content hash is
/// unchanged are left untouched.
pub async fn import_feed(
    db: &PgPool,
    http: &reqwest::Client,
    feed_url: &str,
    source: &str,
) -> Result<ScrapeReport, AppError> {
    let body = fetch_feed(http, feed_url).await?;
    let (listings, non_listings) = parse_feed(&body)?;
    let now = Utc::now();

    let mut report = ScrapeReport {
        fetched: listings.len(),
        skipped: non_listings,
        ..Default::default()
    };

    for listing in &listings {
        let Some(job) = normalize_listing(listing, now) else {
            report.skipped += 1;
            continue;
        };

        let inserted: Option<bool> = sqlx::query_scalar(
            r#"
            INSERT INTO jobs
                (id, title, company_id, company_name, location, salary_min, salary_max,
                 job_type, remote, description, tags, source, source_id, url, content_hash, posted_at)
            VALUES
                ($1, $2, (SELECT id FROM companies WHERE LOWER(name) = LOWER($3) LIMIT 1), $3, $4,
                 $5, $6, $7, TRUE, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (source, source_id) DO UPDATE SET
                title = EXCLUDED.title,
                company_name = EXCLUDED.company_name,
                location = EXCLUDED.location,
                salary_min = EXCLUDED.salary_min,
                salary_max = EXCLUDED.salary_max,
                job_type = EXCLUDED.job_type,
                description = EXCLUDED.description,
                tags = EXCLUDED.tags,
                url = EXCLUDED.url,
                content_hash = EXCLUDED.content_hash,
                is_active = TRUE,
                updated_at = NOW()
            WHERE jobs.content_hash IS DISTINCT FROM EXCLUDED.content_hash
            RETURNING (xmax = 0)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&job.title)
        .bind(&job.company_name)
        .bind(&job.location)
        .bind(job.salary_min)
        .bind(job.salary_max)
        .bind(&job.job_type)
        .bind(&job.description)
        .bind(&job.tags)
        .bind(source)
        .bind(&job.source_id)
        .bind(&job.url)
        .bind(&job.content_hash)
        .bind(job.posted_at)
        .fetch_optional(db)
        .await?;

        match inserted {
            Some(true) => report.inserted += 1,
            Some(false) => report.updated += 1,
            None => report.unchanged += 1,
        }
    }

    if report.skipped > 0 {
        warn!(source, skipped = report.skipped, "Skipped feed entries without title or company");
    }
    info!(
        source,
        fetched = report.fetched,
        inserted = report.inserted,
        updated = report.updated,
        unchanged = report.unchanged,
        "Feed import finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_strip_html() {
        let html = "<p>We build <b>remote</b> tools &amp; more.</p><ul><li>Rust</li><li>Go</li></ul>";
        assert_eq!(strip_html(html), "We build remote tools & more.\nRust\nGo");
    }

    #[test]
    fn test_strip_html_drops_script_and_style() {
        let html =
            "<style>p{color:red}</style><p>Pay 5 < 10 and 7 > 3</p><script>track()</script>";
        assert_eq!(strip_html(html), "Pay 5 < 10 and 7 > 3");
    }

    #[test]
    fn test_strip_html_breaks_after_block() {
        assert_eq!(
            strip_html("<p>Intro</p>Apply&nbsp;now<br>Thanks"),
            "Intro\nApply now\nThanks"
        );
    }

    #[test]
    fn test_strip_html_plain_text_untouched() {
        assert_eq!(strip_html("Plain   text"), "Plain text");
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            "Rust".to_string(),
            " rust ".to_string(),
            "".to_string(),
            "Backend".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["rust", "backend"]);
    }

    #[test]
    fn test_normalize_salary() {
        assert_eq!(normalize_salary(Some(0), Some(0)), (None, None));
        assert_eq!(
            normalize_salary(Some(120_000), Some(90_000)),
            (Some(90_000), Some(120_000))
        );
        assert_eq!(normalize_salary(Some(50_000), None), (Some(50_000), None));
    }

    #[test]
    fn test_parse_feed_skips_legal_notice() {
        let body = r#"[
            {"legal": "API terms of service"},
            {"id": "1001", "position": "Rust Engineer", "company": "Ferrous", "tags": ["Rust"]},
            {"id": 1002, "title": "Designer", "company": "Pixel"}
        ]"#;
        let (listings, skipped) = parse_feed(body).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_parse_feed_accepts_string_salaries() {
        let body =
            r#"[{"id":"1","title":"Rust Engineer","company":"Ferrous","salary_min":"80000"}]"#;
        let (listings, skipped) = parse_feed(body).unwrap();
        assert_eq!((listings.len(), skipped), (1, 0));
        assert_eq!(listings[0].salary_min, Some(80_000));
    }

    #[test]
    fn test_parse_feed_tolerates_mistyped_fields() {
        let body = r#"[
            {"title": "Go Developer", "company": "Gopher", "tags": "Go, Backend",
             "salary_max": true, "location": 42},
            {"title": "No company", "salary_min": 90000},
            "not an object"
        ]"#;
        let (listings, skipped) = parse_feed(body).unwrap();
        assert_eq!((listings.len(), skipped), (1, 2));
        let job = normalize_listing(&listings[0], now()).unwrap();
        assert_eq!(job.tags, vec!["go", "backend"]);
        assert_eq!(job.salary_max, None);
        assert_eq!(job.location, "42");
    }

    #[test]
    fn test_salary_value() {
        assert_eq!(salary_value(&Value::from(120_000)), Some(120_000));
        assert_eq!(salary_value(&Value::from(95_000.4)), Some(95_000));
        assert_eq!(salary_value(&Value::from("$80,000")), Some(80_000));
        assert_eq!(salary_value(&Value::from("competitive")), None);
        assert_eq!(salary_value(&Value::Null), None);
    }

    #[test]
    fn test_parse_feed_rejects_non_array() {
        assert!(matches!(parse_feed("{}"), Err(AppError::Upstream(_))));
    }

    #[test]
    fn test_normalize_listing_full() {
        let listing = FeedListing {
            id: Some(Value::from(42)),
            title: Some(" Senior Rust Engineer ".to_string()),
            company: Some("Ferrous".to_string()),
            location: Some("".to_string()),
            tags: Some(vec!["Rust".to_string(), "rust".to_string()]),
            description: Some("<p>Hello</p>".to_string()),
            salary_min: Some(150_000),
            salary_max: Some(120_000),
            job_type: Some("Part-Time".to_string()),
            date: Some("2026-01-10T08:00:00+00:00".to_string()),
            url: Some("https://example.com/jobs/42".to_string()),
        };
        let job = normalize_listing(&listing, now()).unwrap();
        assert_eq!(job.source_id, "42");
        assert_eq!(job.title, "Senior Rust Engineer");
        assert_eq!(job.location, "Remote");
        assert_eq!(job.tags, vec!["rust"]);
        assert_eq!(job.description, "Hello");
        assert_eq!(job.salary_min, Some(120_000));
        assert_eq!(job.salary_max, Some(150_000));
        assert_eq!(job.job_type, "part_time");
        assert_eq!(job.posted_at, Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_normalize_listing_requires_title_and_company() {
        let listing = FeedListing {
            id: None,
            title: Some("Engineer".to_string()),
            company: Some("  ".to_string()),
            location: None,
            tags: None,
            description: None,
            salary_min: None,
            salary_max: None,
            job_type: None,
            date: None,
            url: None,
        };
        assert!(normalize_listing(&listing, now()).is_none());
    }

    #[test]
    fn test_normalize_listing_defaults() {
        let listing: FeedListing =
            serde_json::from_str(r#"{"title":"Engineer","company":"Acme","date":"not a date","job_type":"gig"}"#)
                .unwrap();
        let job = normalize_listing(&listing, now()).unwrap();
        assert_eq!(job.posted_at, now());
        assert_eq!(job.job_type, "full_time");
        assert_eq!(job.source_id.len(), 16);
        assert!(job.url.is_none());
    }

    #[test]
    fn test_future_dates_clamped_to_now() {
        let listing: FeedListing =
            serde_json::from_str(r#"{"title":"Engineer","company":"Acme","date":"2030-01-01T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(normalize_listing(&listing, now()).unwrap().posted_at, now());
    }

    #[test]
    fn test_content_hash_is_stable_and_field_separated() {
        assert_eq!(content_hash("a", "b", "c"), content_hash("a", "b", "c"));
        assert_ne!(content_hash("ab", "", "c"), content_hash("a", "b", "c"));
    }
}
