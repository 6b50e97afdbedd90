//! Skills scoring: weighted, fuzzy-tolerant matching of required and preferred
//! skill maps against the profile's skill set.
//!
//! A requirement skill is matched when its best ratio against any profile skill
//! reaches the fuzzy threshold. A matched skill earns its full weight; the ratio
//! only decides whether it matched.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strsim::levenshtein;

use crate::scoring::config::ScoringConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillMatch {
    pub skill: String,
    pub matched_with: String,
    /// Fuzzy ratio, 0–100.
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillCategoryScore {
    pub points_earned: f64,
    pub points_possible: f64,
    pub matched: Vec<SkillMatch>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillsScore {
    pub points_earned: f64,
    pub points_possible: f64,
    pub required: SkillCategoryScore,
    pub preferred: SkillCategoryScore,
}

/// Normalized edit-distance similarity on a 0–100 scale, case-insensitive.
///
/// `100 × (longest − levenshtein) / longest`, counted in chars. Two empty
/// strings are identical.
pub fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 100.0;
    }
    let distance = levenshtein(&a, &b);
    (longest - distance) as f64 * 100.0 / longest as f64
}

/// Scores both skill categories. `profile_skills` is expected lowercased
/// (see `ProfileData::normalized_skills`).
pub fn score_skills(
    profile_skills: &BTreeSet<String>,
    required: &BTreeMap<String, f64>,
    preferred: &BTreeMap<String, f64>,
    config: &ScoringConfig,
) -> SkillsScore {
    let required = score_category(
        profile_skills,
        required,
        config.required_skills_max,
        config.fuzzy_threshold,
    );
    let preferred = score_category(
        profile_skills,
        preferred,
        config.preferred_skills_max,
        config.fuzzy_threshold,
    );

    SkillsScore {
        points_earned: required.points_earned + preferred.points_earned,
        points_possible: config.skills_max(),
        required,
        preferred,
    }
}

fn score_category(
    profile_skills: &BTreeSet<String>,
    skills: &BTreeMap<String, f64>,
    max_points: f64,
    threshold: f64,
) -> SkillCategoryScore {
    let mut matched = Vec::new();
    let mut missing = Vec::new();
    let mut total_weight = 0.0;
    let mut matched_weight = 0.0;

    for (skill, weight) in skills {
        total_weight += weight;
        match best_match(skill, profile_skills) {
            Some((profile_skill, ratio)) if ratio >= threshold => {
                matched_weight += weight;
                matched.push(SkillMatch {
                    skill: skill.clone(),
                    matched_with: profile_skill.to_string(),
                    similarity: ratio,
                });
            }
            _ => missing.push(skill.clone()),
        }
    }

    // Empty (or all-zero) categories score nothing rather than dividing by zero.
    let points_earned = if total_weight > 0.0 {
        (max_points * matched_weight / total_weight).clamp(0.0, max_points)
    } else {
        0.0
    };

    SkillCategoryScore {
        points_earned,
        points_possible: max_points,
        matched,
        missing,
    }
}

/// Highest-ratio profile skill for `skill`. Ties keep the first in set order.
fn best_match<'a>(skill: &str, profile_skills: &'a BTreeSet<String>) -> Option<(&'a str, f64)> {
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in profile_skills {
        let ratio = fuzzy_ratio(skill, candidate);
        if best.map_or(true, |(_, r)| ratio > r) {
            best = Some((candidate.as_str(), ratio));
            if ratio >= 100.0 {
                break;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill_set(skills: &[&str]) -> BTreeSet<String> {
        skills.iter().map(|s| s.to_lowercase()).collect()
    }

    fn weights(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_fuzzy_ratio_exact_and_case_insensitive() {
        assert_eq!(fuzzy_ratio("Python", "python"), 100.0);
        assert_eq!(fuzzy_ratio("", ""), 100.0);
        assert_eq!(fuzzy_ratio("rust", ""), 0.0);
    }

    #[test]
    fn test_fuzzy_ratio_postgres_variant() {
        let ratio = fuzzy_ratio("PostgreSQL", "Postgres");
        assert!(ratio >= 80.0, "ratio was {ratio}");
        assert!(ratio < 100.0);
    }

    #[test]
    fn test_required_points_example() {
        let profile = skill_set(&["Python", "Postgres"]);
        let required = weights(&[("Python", 10.0), ("FastAPI", 8.0), ("PostgreSQL", 7.0)]);
        let result = score_skills(&profile, &required, &BTreeMap::new(), &ScoringConfig::default());

        assert!((result.required.points_earned - 20.4).abs() < 1e-9);
        let matched: Vec<&str> = result
            .required
            .matched
            .iter()
            .map(|m| m.skill.as_str())
            .collect();
        assert_eq!(matched, vec!["PostgreSQL", "Python"]);
        assert_eq!(result.required.missing, vec!["FastAPI"]);
        assert_eq!(
            result
                .required
                .matched
                .iter()
                .find(|m| m.skill == "PostgreSQL")
                .map(|m| m.matched_with.as_str()),
            Some("postgres")
        );
    }

    #[test]
    fn test_empty_categories_score_zero() {
        let result = score_skills(
            &skill_set(&["Python"]),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &ScoringConfig::default(),
        );
        assert_eq!(result.points_earned, 0.0);
        assert_eq!(result.required.points_earned, 0.0);
        assert_eq!(result.preferred.points_earned, 0.0);
        assert_eq!(result.points_possible, 40.0);
    }

    #[test]
    fn test_all_matched_hits_category_caps() {
        let profile = skill_set(&["Python", "Docker", "Redis"]);
        let result = score_skills(
            &profile,
            &weights(&[("Python", 3.0)]),
            &weights(&[("Docker", 1.0), ("Redis", 2.0)]),
            &ScoringConfig::default(),
        );
        assert!((result.required.points_earned - 30.0).abs() < 1e-9);
        assert!((result.preferred.points_earned - 10.0).abs() < 1e-9);
        assert!((result.points_earned - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_profile_skills_everything_missing() {
        let result = score_skills(
            &BTreeSet::new(),
            &weights(&[("Rust", 1.0)]),
            &weights(&[("Kafka", 1.0)]),
            &ScoringConfig::default(),
        );
        assert_eq!(result.points_earned, 0.0);
        assert_eq!(result.required.missing, vec!["Rust"]);
        assert_eq!(result.preferred.missing, vec!["Kafka"]);
    }

    #[test]
    fn test_raising_threshold_never_adds_matches() {
        let profile = skill_set(&["Postgres", "Pyhton", "Docker Compose", "k8s", "JavaScript"]);
        let required = weights(&[
            ("PostgreSQL", 7.0),
            ("Python", 10.0),
            ("Docker", 4.0),
            ("Kubernetes", 5.0),
            ("Java", 2.0),
        ]);
        let mut previous = usize::MAX;
        for threshold in 0..=100 {
            let config = ScoringConfig::with_fuzzy_threshold(threshold as f64);
            let result = score_skills(&profile, &required, &BTreeMap::new(), &config);
            let count = result.required.matched.len();
            assert!(
                count <= previous,
                "threshold {threshold}: {count} matches after {previous}"
            );
            previous = count;
        }
    }

    #[test]
    fn test_scores_stay_within_category_bounds() {
        let profile = skill_set(&["Rust", "Go", "SQL", "Terraform"]);
        for threshold in [0.0, 25.0, 50.0, 80.0, 100.0] {
            let config = ScoringConfig::with_fuzzy_threshold(threshold);
            let result = score_skills(
                &profile,
                &weights(&[("Rust", 0.5), ("Go", 9.0), ("C++", 3.0)]),
                &weights(&[("Terraform", 2.0), ("Ansible", 2.0)]),
                &config,
            );
            assert!((0.0..=30.0).contains(&result.required.points_earned));
            assert!((0.0..=10.0).contains(&result.preferred.points_earned));
            assert!((0.0..=40.0).contains(&result.points_earned));
        }
    }
}
