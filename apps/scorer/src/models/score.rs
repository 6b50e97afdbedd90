use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::profile::ProfileData;
use crate::scoring::education::EducationScore;
use crate::scoring::experience::ExperienceScore;
use crate::scoring::skills::SkillsScore;
use crate::scoring::text_similarity::TextSimilarityScore;

/// Fixed scale of every score. Percentage equals total_score on this scale.
pub const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Highly Recommended")]
    HighlyRecommended,
    #[serde(rename = "Recommended")]
    Recommended,
    #[serde(rename = "Consider")]
    Consider,
    #[serde(rename = "Not Recommended")]
    NotRecommended,
}

impl Recommendation {
    pub fn label(self) -> &'static str {
        match self {
            Recommendation::HighlyRecommended => "Highly Recommended",
            Recommendation::Recommended => "Recommended",
            Recommendation::Consider => "Consider",
            Recommendation::NotRecommended => "Not Recommended",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub skills: SkillsScore,
    pub text_similarity: TextSimilarityScore,
    pub experience: ExperienceScore,
    pub education: EducationScore,
}

impl ScoreBreakdown {
    /// Sum of the four category scores; this is what `total_score` is.
    pub fn total(&self) -> f64 {
        self.skills.points_earned
            + self.text_similarity.points_earned
            + self.experience.points_earned
            + self.education.points_earned
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    pub total_score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub recommendation: Recommendation,
    pub breakdown: ScoreBreakdown,
    pub scored_at: DateTime<Utc>,
}

/// The persisted output document, one per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreArtifact {
    pub profile: ProfileData,
    pub requirements_id: String,
    pub profile_url: String,
    pub score: ScoreResult,
    pub scored_at: DateTime<Utc>,
}

impl ScoreArtifact {
    pub fn new(profile: ProfileData, requirements_id: String, profile_url: String, score: ScoreResult) -> Self {
        Self {
            scored_at: score.scored_at,
            profile,
            requirements_id,
            profile_url,
            score,
        }
    }
}
