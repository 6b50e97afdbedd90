use serde::{Deserialize, Serialize};

use crate::models::score::MAX_SCORE;

/// Category maxima, fuzzy threshold and recommendation boundaries.
///
/// Passed into `CompositeScorer` at construction; nothing inside the scorers
/// hard-codes these numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringConfig {
    pub required_skills_max: f64,
    pub preferred_skills_max: f64,
    pub text_similarity_max: f64,
    pub experience_max: f64,
    pub education_max: f64,
    /// Minimum fuzzy ratio (0–100) for a profile skill to count as a match.
    pub fuzzy_threshold: f64,
    pub highly_recommended_at: f64,
    pub recommended_at: f64,
    pub consider_at: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            required_skills_max: 30.0,
            preferred_skills_max: 10.0,
            text_similarity_max: 30.0,
            experience_max: 20.0,
            education_max: 10.0,
            fuzzy_threshold: 80.0,
            highly_recommended_at: 80.0,
            recommended_at: 60.0,
            consider_at: 40.0,
        }
    }
}

impl ScoringConfig {
    pub fn with_fuzzy_threshold(fuzzy_threshold: f64) -> Self {
        Self {
            fuzzy_threshold,
            ..Self::default()
        }
    }

    pub fn skills_max(&self) -> f64 {
        self.required_skills_max + self.preferred_skills_max
    }

    /// Rejects configurations whose category maxima do not add up to the
    /// fixed 100-point scale, or whose threshold is outside 0–100.
    pub fn validate(&self) -> Result<(), String> {
        let maxima = [
            self.required_skills_max,
            self.preferred_skills_max,
            self.text_similarity_max,
            self.experience_max,
            self.education_max,
        ];
        if maxima.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err("category maxima must be non-negative numbers".to_string());
        }
        let total: f64 = maxima.iter().sum();
        if (total - MAX_SCORE).abs() > 1e-9 {
            return Err(format!(
                "category maxima must sum to {MAX_SCORE}, got {total}"
            ));
        }
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(format!(
                "fuzzy_threshold must be within 0..=100, got {}",
                self.fuzzy_threshold
            ));
        }
        if !(self.consider_at <= self.recommended_at
            && self.recommended_at <= self.highly_recommended_at)
        {
            return Err("recommendation boundaries must be non-decreasing".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid_and_sums_to_100() {
        let config = ScoringConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.skills_max(), 40.0);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        assert!(ScoringConfig::with_fuzzy_threshold(101.0).validate().is_err());
        assert!(ScoringConfig::with_fuzzy_threshold(-1.0).validate().is_err());
        assert!(ScoringConfig::with_fuzzy_threshold(0.0).validate().is_ok());
        assert!(ScoringConfig::with_fuzzy_threshold(100.0).validate().is_ok());
    }

    #[test]
    fn test_maxima_not_summing_to_100_rejected() {
        let config = ScoringConfig {
            education_max: 15.0,
            ..ScoringConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("sum"), "{err}");
    }
}
