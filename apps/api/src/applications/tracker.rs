//! Filtering, sorting, badges and counts over a user's applications.
//!
//! The list is small (one user's applications), so it is loaded whole and
//! shaped in memory.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::application::{ApplicationRow, ApplicationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub label: &'static str,
    pub color: &'static str,
}

/// Static badge lookup table.
pub fn badge_for(status: ApplicationStatus) -> Badge {
    match status {
        ApplicationStatus::Pending => Badge {
            label: "Pending",
            color: "yellow",
        },
        ApplicationStatus::Reviewing => Badge {
            label: "Under Review",
            color: "blue",
        },
        ApplicationStatus::Interview => Badge {
            label: "Interview",
            color: "purple",
        },
        ApplicationStatus::Accepted => Badge {
            label: "Accepted",
            color: "green",
        },
        ApplicationStatus::Rejected => Badge {
            label: "Rejected",
            color: "red",
        },
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackerSort {
    #[default]
    DateDesc,
    DateAsc,
    Company,
    Status,
}

impl TrackerSort {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date_desc" | "newest" => Some(TrackerSort::DateDesc),
            "date_asc" | "oldest" => Some(TrackerSort::DateAsc),
            "company" => Some(TrackerSort::Company),
            "status" => Some(TrackerSort::Status),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TrackerQuery {
    pub status: Option<String>,
    pub company: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackerFilter {
    pub status: Option<ApplicationStatus>,
    pub company: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort: TrackerSort,
}

impl TrackerQuery {
    /// `status=all` (or empty) means no status filter.
    pub fn validate(self) -> Result<TrackerFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(
                ApplicationStatus::parse(s)
                    .ok_or_else(|| AppError::Validation(format!("Unknown status '{s}'")))?,
            ),
        };
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(AppError::Validation(
                    "from must not be after to".to_string(),
                ));
            }
        }
        let sort = match self.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => TrackerSort::parse(s)
                .ok_or_else(|| AppError::Validation(format!("Unknown sort '{s}'")))?,
            None => TrackerSort::default(),
        };
        Ok(TrackerFilter {
            status,
            company: self
                .company
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty()),
            from: self.from,
            to: self.to,
            sort,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackedApplication {
    #[serde(flatten)]
    pub application: ApplicationRow,
    pub badge: Badge,
}

fn status_of(row: &ApplicationRow) -> ApplicationStatus {
    ApplicationStatus::parse(&row.status).unwrap_or(ApplicationStatus::Pending)
}

fn applied_on(applied_at: DateTime<Utc>) -> NaiveDate {
    applied_at.date_naive()
}

pub fn apply_filter(rows: Vec<ApplicationRow>, filter: &TrackerFilter) -> Vec<TrackedApplication> {
    let mut kept: Vec<ApplicationRow> = rows
        .into_iter()
        .filter(|row| filter.status.map_or(true, |s| status_of(row) == s))
        .filter(|row| {
            filter
                .company
                .as_deref()
                .map_or(true, |c| row.company_name.to_lowercase().contains(c))
        })
        .filter(|row| filter.from.map_or(true, |from| applied_on(row.applied_at) >= from))
        .filter(|row| filter.to.map_or(true, |to| applied_on(row.applied_at) <= to))
        .collect();

    match filter.sort {
        TrackerSort::DateDesc => kept.sort_by(|a, b| b.applied_at.cmp(&a.applied_at)),
        TrackerSort::DateAsc => kept.sort_by(|a, b| a.applied_at.cmp(&b.applied_at)),
        TrackerSort::Company => kept.sort_by(|a, b| {
            a.company_name
                .to_lowercase()
                .cmp(&b.company_name.to_lowercase())
                .then(b.applied_at.cmp(&a.applied_at))
        }),
        TrackerSort::Status => kept.sort_by(|a, b| {
            let rank = |r: &ApplicationRow| {
                ApplicationStatus::ALL
                    .iter()
                    .position(|s| *s == status_of(r))
                    .unwrap_or(0)
            };
            rank(a).cmp(&rank(b)).then(b.applied_at.cmp(&a.applied_at))
        }),
    }

    kept.into_iter()
        .map(|application| TrackedApplication {
            badge: badge_for(status_of(&application)),
            application,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub badge: Badge,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TrackerStats {
    pub total: usize,
    pub by_status: Vec<StatusCount>,
}

/// Every status is listed, zero when absent.
pub fn compute_stats(rows: &[ApplicationRow]) -> TrackerStats {
    let by_status = ApplicationStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            badge: badge_for(status),
            count: rows.iter().filter(|r| status_of(r) == status).count(),
        })
        .collect();
    TrackerStats {
        total: rows.len(),
        by_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn row(company: &str, status: &str, day: u32) -> ApplicationRow {
        let at = Utc.with_ymd_and_hms(2026, 5, day, 9, 0, 0).unwrap();
        ApplicationRow {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            status: status.to_string(),
            notes: None,
            cover_letter: None,
            applied_at: at,
            updated_at: at,
            job_title: "Engineer".to_string(),
            company_name: company.to_string(),
        }
    }

    fn sample() -> Vec<ApplicationRow> {
        vec![
            row("Ferrous", "interview", 3),
            row("acme", "pending", 10),
            row("Globex", "rejected", 1),
            row("Acme Labs", "accepted", 7),
        ]
    }

    fn companies(items: &[TrackedApplication]) -> Vec<&str> {
        items
            .iter()
            .map(|t| t.application.company_name.as_str())
            .collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let out = apply_filter(sample(), &TrackerFilter::default());
        assert_eq!(companies(&out), vec!["acme", "Acme Labs", "Ferrous", "Globex"]);
    }

    #[test]
    fn test_status_filter() {
        let filter = TrackerQuery {
            status: Some("Interview".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let out = apply_filter(sample(), &filter);
        assert_eq!(companies(&out), vec!["Ferrous"]);
        assert_eq!(out[0].badge.color, "purple");
    }

    #[test]
    fn test_status_all_means_no_filter() {
        let filter = TrackerQuery {
            status: Some("all".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(apply_filter(sample(), &filter).len(), 4);
    }

    #[test]
    fn test_company_substring_case_insensitive() {
        let filter = TrackerQuery {
            company: Some("ACME".to_string()),
            sort: Some("company".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(companies(&apply_filter(sample(), &filter)), vec!["acme", "Acme Labs"]);
    }

    #[test]
    fn test_date_range_inclusive() {
        let filter = TrackerQuery {
            from: NaiveDate::from_ymd_opt(2026, 5, 3),
            to: NaiveDate::from_ymd_opt(2026, 5, 7),
            sort: Some("date_asc".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(companies(&apply_filter(sample(), &filter)), vec!["Ferrous", "Acme Labs"]);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = TrackerQuery {
            from: NaiveDate::from_ymd_opt(2026, 5, 7),
            to: NaiveDate::from_ymd_opt(2026, 5, 3),
            ..Default::default()
        }
        .validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_status_sort_follows_pipeline_order() {
        let filter = TrackerQuery {
            sort: Some("status".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let out = apply_filter(sample(), &filter);
        let statuses: Vec<_> = out.iter().map(|t| t.application.status.as_str()).collect();
        assert_eq!(statuses, vec!["pending", "interview", "accepted", "rejected"]);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let result = TrackerQuery {
            status: Some("ghosted".to_string()),
            ..Default::default()
        }
        .validate();
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_stats_include_every_status() {
        let stats = compute_stats(&sample());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_status.len(), 5);
        let reviewing = stats
            .by_status
            .iter()
            .find(|s| s.status == ApplicationStatus::Reviewing)
            .unwrap();
        assert_eq!(reviewing.count, 0);
    }

    #[test]
    fn test_stats_empty() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.by_status.iter().all(|s| s.count == 0));
    }

    #[test]
    fn test_badge_table_covers_all_statuses() {
        for status in ApplicationStatus::ALL {
            assert!(!badge_for(status).label.is_empty());
        }
        assert_eq!(badge_for(ApplicationStatus::Reviewing).label, "Under Review");
    }
}
