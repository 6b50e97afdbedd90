use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::profile::{meaningful, Education};

/// Degree hierarchy, lowest first. The discriminant is the rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DegreeLevel {
    #[serde(rename = "High School")]
    HighSchool = 1,
    Diploma = 2,
    Bachelor = 3,
    Master = 4,
    #[serde(rename = "PhD")]
    Phd = 5,
}

/// Keyword table checked against lowercased degree text. A text matching
/// several levels classifies as the highest one.
const LEVEL_KEYWORDS: &[(DegreeLevel, &[&str])] = &[
    (
        DegreeLevel::Phd,
        &["phd", "ph.d", "doctor", "doctoral", "doctorate", "dphil"],
    ),
    (
        DegreeLevel::Master,
        &["master", "mba", "m.s.", "m.sc", "msc", "m.eng", "m.a.", "magister"],
    ),
    (
        DegreeLevel::Bachelor,
        &["bachelor", "b.s.", "b.sc", "bsc", "b.a.", "b.eng", "b.tech", "undergraduate", "sarjana"],
    ),
    (DegreeLevel::Diploma, &["diploma", "associate"]),
    (DegreeLevel::HighSchool, &["high school", "secondary school"]),
];

impl DegreeLevel {
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Classifies free-text degree wording into the hierarchy.
    pub fn classify(text: &str) -> Option<Self> {
        let lower = meaningful(text)?.to_lowercase();
        LEVEL_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(level, _)| *level)
    }
}

impl fmt::Display for DegreeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DegreeLevel::HighSchool => "High School",
            DegreeLevel::Diploma => "Diploma",
            DegreeLevel::Bachelor => "Bachelor",
            DegreeLevel::Master => "Master",
            DegreeLevel::Phd => "PhD",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EducationScore {
    pub points_earned: f64,
    pub points_possible: f64,
    /// Highest classified degree, `None` when no entry could be classified.
    pub matched_degree: Option<DegreeLevel>,
    pub profile_degrees: Vec<String>,
    pub required_levels: Vec<String>,
    pub meets_requirement: bool,
}

/// Compares the highest attained degree against the lowest accepted level.
///
/// No requirement (empty or unclassifiable labels) earns full points. Below the
/// minimum earns `max × attained / minimum`, always under `max`.
pub fn score_education(
    education: &[Education],
    required_levels: &[String],
    max_points: f64,
) -> EducationScore {
    let profile_degrees: Vec<String> = education
        .iter()
        .filter_map(|e| meaningful(&e.degree))
        .map(str::to_string)
        .collect();

    let attained = profile_degrees
        .iter()
        .filter_map(|d| DegreeLevel::classify(d))
        .max();
    let minimum = required_levels
        .iter()
        .filter_map(|l| DegreeLevel::classify(l))
        .min();

    let (points_earned, meets_requirement) = match (attained, minimum) {
        (_, None) => (max_points, true),
        (None, Some(_)) => (0.0, false),
        (Some(attained), Some(minimum)) if attained >= minimum => (max_points, true),
        (Some(attained), Some(minimum)) => (
            max_points * f64::from(attained.rank()) / f64::from(minimum.rank()),
            false,
        ),
    };

    EducationScore {
        points_earned,
        points_possible: max_points,
        matched_degree: attained,
        profile_degrees,
        required_levels: required_levels.to_vec(),
        meets_requirement,
    }
}
