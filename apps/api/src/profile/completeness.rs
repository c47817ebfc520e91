use serde::{Deserialize, Serialize};

use crate::models::profile::ProfileRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Strong,
    Moderate,
    Weak,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionHealth {
    pub section: String,
    pub score: f64,
    pub weight: f64,
    pub status: SectionStatus,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub overall_score: f64,
    pub sections: Vec<SectionHealth>,
    pub missing_sections: Vec<String>,
}

const SECTION_WEIGHTS: &[(&str, f64)] = &[
    ("basics", 0.20),
    ("skills", 0.20),
    ("experience", 0.25),
    ("education", 0.10),
    ("social_links", 0.10),
    ("resume", 0.15),
];

const TARGET_SKILLS: usize = 10;
const TARGET_EXPERIENCE: usize = 2;
const TARGET_SOCIAL_LINKS: usize = 2;

fn status_for(score: f64) -> SectionStatus {
    match score {
        s if s >= 0.8 => SectionStatus::Strong,
        s if s >= 0.5 => SectionStatus::Moderate,
        s if s > 0.0 => SectionStatus::Weak,
        _ => SectionStatus::Missing,
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn ratio(have: usize, target: usize) -> f64 {
    (have as f64 / target as f64).min(1.0)
}

fn section_score(section: &str, profile: &ProfileRow) -> (f64, Vec<String>) {
    let mut recommendations = Vec::new();
    let score = match section {
        "basics" => {
            let fields = [
                ("headline", &profile.headline),
                ("bio", &profile.bio),
                ("location", &profile.location),
            ];
            let mut have = 0;
            for (name, value) in fields {
                if filled(value) {
                    have += 1;
                } else {
                    recommendations.push(format!("Add a {name} to your profile"));
                }
            }
            ratio(have, fields.len())
        }
        "skills" => {
            let count = profile.skills.len();
            if count < TARGET_SKILLS {
                recommendations.push(format!(
                    "List at least {TARGET_SKILLS} skills ({count} so far)"
                ));
            }
            ratio(count, TARGET_SKILLS)
        }
        "experience" => {
            let entries = &profile.experience.0;
            let described = entries.iter().filter(|e| filled(&e.description)).count();
            if entries.len() < TARGET_EXPERIENCE {
                recommendations.push("Add more experience entries to build a complete picture".to_string());
            }
            if described < entries.len() {
                recommendations.push(format!(
                    "{} experience entries have no description",
                    entries.len() - described
                ));
            }
            if entries.is_empty() {
                0.0
            } else {
                // Count coverage, discounted for undescribed entries.
                let detail = described as f64 / entries.len() as f64;
                ratio(entries.len(), TARGET_EXPERIENCE) * (0.6 + 0.4 * detail)
            }
        }
        "education" => {
            if profile.education.0.is_empty() {
                recommendations.push("Add your education".to_string());
                0.0
            } else {
                1.0
            }
        }
        "social_links" => {
            let count = profile
                .social_links
                .0
                .values()
                .filter(|v| !v.trim().is_empty())
                .count();
            if count < TARGET_SOCIAL_LINKS {
                recommendations.push("Link your LinkedIn, GitHub or portfolio".to_string());
            }
            ratio(count, TARGET_SOCIAL_LINKS)
        }
        "resume" => {
            if profile.resume_s3_key.is_some() {
                1.0
            } else {
                recommendations.push("Upload your resume as a PDF".to_string());
                0.0
            }
        }
        _ => 0.0,
    };
    (score.clamp(0.0, 1.0), recommendations)
}

pub fn compute_completeness_report(profile: &ProfileRow) -> CompletenessReport {
    let mut sections = Vec::new();
    let mut weighted_score_sum = 0.0;
    let mut missing_sections = Vec::new();

    for (section_key, weight) in SECTION_WEIGHTS {
        let (score, recommendations) = section_score(section_key, profile);
        let status = status_for(score);
        if status == SectionStatus::Missing {
            missing_sections.push(section_key.to_string());
        }
        weighted_score_sum += score * weight;
        sections.push(SectionHealth {
            section: section_key.to_string(),
            score,
            weight: *weight,
            status,
            recommendations,
        });
    }

    let total_weight: f64 = SECTION_WEIGHTS.iter().map(|(_, w)| w).sum();
    let overall_score = if total_weight > 0.0 {
        (weighted_score_sum / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    CompletenessReport {
        overall_score,
        sections,
        missing_sections,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    use super::*;
    use crate::models::profile::{Education, WorkExperience};

    fn empty_profile() -> ProfileRow {
        ProfileRow {
            user_id: Uuid::nil(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            headline: None,
            bio: None,
            location: None,
            skills: Vec::new(),
            experience: Json(Vec::new()),
            education: Json(Vec::new()),
            social_links: Json(BTreeMap::new()),
            resume_s3_key: None,
            resume_text: None,
            updated_at: Utc::now(),
        }
    }

    fn full_profile() -> ProfileRow {
        let mut p = empty_profile();
        p.headline = Some("Rust engineer".to_string());
        p.bio = Some("Builds services".to_string());
        p.location = Some("Lisbon".to_string());
        p.skills = (0..12).map(|i| format!("skill{i}")).collect();
        p.experience = Json(vec![
            WorkExperience {
                company: "Ferrous".to_string(),
                title: "Engineer".to_string(),
                description: Some("Shipped the API".to_string()),
                ..Default::default()
            };
            2
        ]);
        p.education = Json(vec![Education {
            institution: "TU Delft".to_string(),
            ..Default::default()
        }]);
        p.social_links = Json(BTreeMap::from([
            ("github".to_string(), "https://github.com/ada".to_string()),
            ("linkedin".to_string(), "https://linkedin.com/in/ada".to_string()),
        ]));
        p.resume_s3_key = Some("resumes/x/y.pdf".to_string());
        p
    }

    #[test]
    fn test_empty_profile_is_all_missing() {
        let report = compute_completeness_report(&empty_profile());
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.missing_sections.len(), SECTION_WEIGHTS.len());
        assert!(report
            .sections
            .iter()
            .all(|s| s.status == SectionStatus::Missing && !s.recommendations.is_empty()));
    }

    #[test]
    fn test_full_profile_is_strong() {
        let report = compute_completeness_report(&full_profile());
        assert!((report.overall_score - 1.0).abs() < 1e-9);
        assert!(report.missing_sections.is_empty());
        assert!(report.sections.iter().all(|s| s.status == SectionStatus::Strong));
    }

    #[test]
    fn test_partial_basics_is_moderate() {
        let mut p = empty_profile();
        p.headline = Some("Engineer".to_string());
        p.location = Some("Remote".to_string());
        let report = compute_completeness_report(&p);
        let basics = &report.sections[0];
        assert_eq!(basics.section, "basics");
        assert_eq!(basics.status, SectionStatus::Moderate);
        assert_eq!(basics.recommendations, vec!["Add a bio to your profile"]);
    }

    #[test]
    fn test_few_skills_is_weak() {
        let mut p = empty_profile();
        p.skills = vec!["rust".to_string(), "sql".to_string()];
        let report = compute_completeness_report(&p);
        let skills = report.sections.iter().find(|s| s.section == "skills").unwrap();
        assert_eq!(skills.status, SectionStatus::Weak);
    }

    #[test]
    fn test_undescribed_experience_discounted() {
        let mut p = full_profile();
        p.experience.0[1].description = None;
        let report = compute_completeness_report(&p);
        let exp = report.sections.iter().find(|s| s.section == "experience").unwrap();
        assert!((exp.score - 0.8).abs() < 1e-9);
        assert!(report.overall_score < 1.0);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = SECTION_WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
