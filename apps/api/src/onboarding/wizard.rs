//! Onboarding step order, cursor movement and per-step payloads.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::job::is_valid_job_type;
use crate::validation::{require_max_len, require_non_empty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Basics,
    JobPreferences,
    Skills,
    Location,
    Complete,
}

impl OnboardingStep {
    pub const ALL: [OnboardingStep; 5] = [
        OnboardingStep::Basics,
        OnboardingStep::JobPreferences,
        OnboardingStep::Skills,
        OnboardingStep::Location,
        OnboardingStep::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStep::Basics => "basics",
            OnboardingStep::JobPreferences => "job_preferences",
            OnboardingStep::Skills => "skills",
            OnboardingStep::Location => "location",
            OnboardingStep::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn index(&self) -> i16 {
        *self as i16
    }

    /// Out-of-range cursors clamp to the nearest end.
    pub fn from_index(index: i16) -> Self {
        let i = index.clamp(0, Self::ALL.len() as i16 - 1) as usize;
        Self::ALL[i]
    }

    fn next(&self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub cursor: OnboardingStep,
    pub complete: bool,
}

/// Moves the cursor after `submitted` is saved. Steps ahead of the cursor
/// are rejected; earlier steps may be revisited without moving it back.
pub fn advance(cursor: OnboardingStep, submitted: OnboardingStep) -> Result<Progress, AppError> {
    if submitted == OnboardingStep::Complete {
        return Err(AppError::Validation(
            "'complete' has no data to submit".to_string(),
        ));
    }
    if submitted > cursor {
        return Err(AppError::Conflict(format!(
            "Step '{}' is not reachable yet; current step is '{}'",
            submitted.as_str(),
            cursor.as_str()
        )));
    }
    let cursor = cursor.max(submitted.next());
    Ok(Progress {
        cursor,
        complete: cursor == OnboardingStep::Complete,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasicsStep {
    pub name: String,
    pub headline: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobPreferencesStep {
    pub desired_roles: Vec<String>,
    #[serde(default)]
    pub job_types: Vec<String>,
    pub min_salary: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillsStep {
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationStep {
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    #[serde(default = "default_remote_only")]
    pub remote_only: bool,
}

fn default_remote_only() -> bool {
    true
}

#[derive(Debug, Clone)]
pub enum StepPayload {
    Basics(BasicsStep),
    JobPreferences(JobPreferencesStep),
    Skills(SkillsStep),
    Location(LocationStep),
}

const MAX_ROLES: usize = 10;
const MAX_SKILLS: usize = 100;
const MAX_LOCATIONS: usize = 10;

fn clean_list(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(v)) {
            out.push(v.to_string());
        }
    }
    out
}

impl StepPayload {
    /// Decodes and validates the body for `step`, normalizing lists.
    pub fn parse(step: OnboardingStep, body: serde_json::Value) -> Result<Self, AppError> {
        let invalid = |e: serde_json::Error| {
            AppError::Validation(format!("Invalid '{}' payload: {e}", step.as_str()))
        };
        match step {
            OnboardingStep::Basics => {
                let mut p: BasicsStep = serde_json::from_value(body).map_err(invalid)?;
                require_non_empty("name", &p.name)?;
                require_max_len("name", &p.name, 100)?;
                p.name = p.name.trim().to_string();
                p.headline = p
                    .headline
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty());
                if let Some(h) = &p.headline {
                    require_max_len("headline", h, 200)?;
                }
                Ok(StepPayload::Basics(p))
            }
            OnboardingStep::JobPreferences => {
                let mut p: JobPreferencesStep = serde_json::from_value(body).map_err(invalid)?;
                p.desired_roles = clean_list(&p.desired_roles);
                if p.desired_roles.is_empty() || p.desired_roles.len() > MAX_ROLES {
                    return Err(AppError::Validation(format!(
                        "Provide between 1 and {MAX_ROLES} desired roles"
                    )));
                }
                p.job_types = clean_list(&p.job_types)
                    .into_iter()
                    .map(|t| t.to_ascii_lowercase())
                    .collect();
                if let Some(bad) = p.job_types.iter().find(|t| !is_valid_job_type(t)) {
                    return Err(AppError::Validation(format!("Unknown job_type '{bad}'")));
                }
                if p.min_salary.is_some_and(|s| s < 0) {
                    return Err(AppError::Validation(
                        "min_salary cannot be negative".to_string(),
                    ));
                }
                Ok(StepPayload::JobPreferences(p))
            }
            OnboardingStep::Skills => {
                let mut p: SkillsStep = serde_json::from_value(body).map_err(invalid)?;
                p.skills = clean_list(&p.skills);
                if p.skills.is_empty() || p.skills.len() > MAX_SKILLS {
                    return Err(AppError::Validation(format!(
                        "Provide between 1 and {MAX_SKILLS} skills"
                    )));
                }
                Ok(StepPayload::Skills(p))
            }
            OnboardingStep::Location => {
                let mut p: LocationStep = serde_json::from_value(body).map_err(invalid)?;
                p.preferred_locations = clean_list(&p.preferred_locations);
                if p.preferred_locations.len() > MAX_LOCATIONS {
                    return Err(AppError::Validation(format!(
                        "At most {MAX_LOCATIONS} preferred locations"
                    )));
                }
                if !p.remote_only && p.preferred_locations.is_empty() {
                    return Err(AppError::Validation(
                        "Pick at least one location or choose remote only".to_string(),
                    ));
                }
                Ok(StepPayload::Location(p))
            }
            OnboardingStep::Complete => Err(AppError::Validation(
                "'complete' has no data to submit".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_order_and_parse() {
        assert_eq!(OnboardingStep::parse("Job_Preferences"), Some(OnboardingStep::JobPreferences));
        assert_eq!(OnboardingStep::parse("welcome"), None);
        assert_eq!(OnboardingStep::from_index(0), OnboardingStep::Basics);
        assert_eq!(OnboardingStep::from_index(99), OnboardingStep::Complete);
        assert_eq!(OnboardingStep::from_index(-3), OnboardingStep::Basics);
    }

    #[test]
    fn test_walks_forward_to_complete() {
        let mut cursor = OnboardingStep::Basics;
        for step in &OnboardingStep::ALL[..4] {
            let progress = advance(cursor, *step).unwrap();
            cursor = progress.cursor;
        }
        assert_eq!(cursor, OnboardingStep::Complete);
        assert!(advance(OnboardingStep::Location, OnboardingStep::Location)
            .unwrap()
            .complete);
    }

    #[test]
    fn test_step_ahead_is_conflict() {
        let result = advance(OnboardingStep::Basics, OnboardingStep::Skills);
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_revisit_does_not_move_cursor_back() {
        let progress = advance(OnboardingStep::Location, OnboardingStep::Basics).unwrap();
        assert_eq!(progress.cursor, OnboardingStep::Location);
        assert!(!progress.complete);

        let done = advance(OnboardingStep::Complete, OnboardingStep::Skills).unwrap();
        assert_eq!(done.cursor, OnboardingStep::Complete);
        assert!(done.complete);
    }

    #[test]
    fn test_complete_is_not_submittable() {
        assert!(advance(OnboardingStep::Complete, OnboardingStep::Complete).is_err());
        assert!(StepPayload::parse(OnboardingStep::Complete, json!({})).is_err());
    }

    #[test]
    fn test_basics_payload() {
        let payload =
            StepPayload::parse(OnboardingStep::Basics, json!({"name": "  Ada ", "headline": " "}))
                .unwrap();
        match payload {
            StepPayload::Basics(b) => {
                assert_eq!(b.name, "Ada");
                assert!(b.headline.is_none());
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(StepPayload::parse(OnboardingStep::Basics, json!({"name": ""})).is_err());
    }

    #[test]
    fn test_job_preferences_payload() {
        let payload = StepPayload::parse(
            OnboardingStep::JobPreferences,
            json!({"desired_roles": ["Backend", "backend", " "], "job_types": ["Contract"]}),
        )
        .unwrap();
        match payload {
            StepPayload::JobPreferences(p) => {
                assert_eq!(p.desired_roles, vec!["Backend"]);
                assert_eq!(p.job_types, vec!["contract"]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(StepPayload::parse(
            OnboardingStep::JobPreferences,
            json!({"desired_roles": ["Backend"], "job_types": ["gig"]})
        )
        .is_err());
        assert!(StepPayload::parse(OnboardingStep::JobPreferences, json!({"desired_roles": []})).is_err());
    }

    #[test]
    fn test_skills_payload_requires_one() {
        assert!(StepPayload::parse(OnboardingStep::Skills, json!({"skills": []})).is_err());
        assert!(StepPayload::parse(OnboardingStep::Skills, json!({"skills": ["rust"]})).is_ok());
    }

    #[test]
    fn test_location_payload() {
        assert!(StepPayload::parse(OnboardingStep::Location, json!({})).is_ok());
        assert!(StepPayload::parse(
            OnboardingStep::Location,
            json!({"remote_only": false, "preferred_locations": []})
        )
        .is_err());
    }

    #[test]
    fn test_wrong_shape_is_validation_error() {
        let result = StepPayload::parse(OnboardingStep::Skills, json!({"skills": "rust"}));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
