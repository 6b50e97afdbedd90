//! Composite scoring: runs the four category scorers and maps the total to a
//! recommendation bucket.
//!
//! Workers hold an `Arc<dyn ProfileScorer>`; `CompositeScorer` is the only
//! production implementation.

use chrono::{DateTime, Utc};

use crate::models::profile::ProfileData;
use crate::models::requirement::RequirementSpec;
use crate::models::score::{Recommendation, ScoreBreakdown, ScoreResult, MAX_SCORE};
use crate::scoring::config::ScoringConfig;
use crate::scoring::education::score_education;
use crate::scoring::experience::score_experience;
use crate::scoring::skills::score_skills;
use crate::scoring::text_similarity::score_text_similarity;

/// Scores one profile against one requirement. Implementations must be pure:
/// the same inputs always produce the same result.
pub trait ProfileScorer: Send + Sync {
    fn score(
        &self,
        profile: &ProfileData,
        requirement: &RequirementSpec,
        scored_at: DateTime<Utc>,
    ) -> ScoreResult;
}

/// Skills (40) + text similarity (30) + experience (20) + education (10).
#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    config: ScoringConfig,
}

impl CompositeScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Closed-open buckets, top bucket closed: [80,100], [60,80), [40,60), [0,40).
    pub fn recommend(&self, percentage: f64) -> Recommendation {
        if percentage >= self.config.highly_recommended_at {
            Recommendation::HighlyRecommended
        } else if percentage >= self.config.recommended_at {
            Recommendation::Recommended
        } else if percentage >= self.config.consider_at {
            Recommendation::Consider
        } else {
            Recommendation::NotRecommended
        }
    }
}

impl ProfileScorer for CompositeScorer {
    fn score(
        &self,
        profile: &ProfileData,
        requirement: &RequirementSpec,
        scored_at: DateTime<Utc>,
    ) -> ScoreResult {
        let config = &self.config;

        let breakdown = ScoreBreakdown {
            skills: score_skills(
                &profile.normalized_skills(),
                &requirement.required_skills,
                &requirement.preferred_skills,
                config,
            ),
            text_similarity: score_text_similarity(
                &requirement.job_description,
                &profile.narrative_text(),
                config.text_similarity_max,
            ),
            experience: score_experience(
                &profile.experiences,
                requirement.min_experience_years,
                config.experience_max,
            ),
            education: score_education(
                &profile.education,
                &requirement.education_level,
                config.education_max,
            ),
        };

        let total_score = breakdown.total();
        let percentage = total_score * (100.0 / MAX_SCORE);

        ScoreResult {
            total_score,
            max_score: MAX_SCORE,
            percentage,
            recommendation: self.recommend(percentage),
            breakdown,
            scored_at,
        }
    }
}
