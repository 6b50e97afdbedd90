use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A job requirement specification, loaded once from `requirements/*.json`.
///
/// Skill maps are ordered so that scoring walks them deterministically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementSpec {
    /// Explicit identifier. When absent the registry uses the file stem.
    #[serde(default)]
    pub id: Option<String>,
    pub position: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub required_skills: BTreeMap<String, f64>,
    #[serde(default)]
    pub preferred_skills: BTreeMap<String, f64>,
    #[serde(default)]
    pub min_experience_years: f64,
    #[serde(default)]
    pub education_level: Vec<String>,
}

impl RequirementSpec {
    /// Checks the numeric invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        for (category, skills) in [
            ("required_skills", &self.required_skills),
            ("preferred_skills", &self.preferred_skills),
        ] {
            if let Some((skill, weight)) = skills
                .iter()
                .find(|(_, w)| !w.is_finite() || **w <= 0.0)
            {
                return Err(format!(
                    "{category}: weight for '{skill}' must be a positive number, got {weight}"
                ));
            }
        }
        if !self.min_experience_years.is_finite() || self.min_experience_years < 0.0 {
            return Err(format!(
                "min_experience_years must be >= 0, got {}",
                self.min_experience_years
            ));
        }
        Ok(())
    }
}
