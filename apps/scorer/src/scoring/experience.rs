use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::profile::{meaningful, Experience};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperienceScore {
    pub points_earned: f64,
    pub points_possible: f64,
    pub total_months: u32,
    pub total_years: f64,
    pub required_years: f64,
    pub meets_requirement: bool,
}

lazy_static! {
    // "2 yrs", "1 yr", "3 years"
    static ref YEARS_RE: Regex = Regex::new(r"(?i)(\d+)\s*(?:yrs?|years?)").unwrap();
    // "3 mos", "1 mo", "10 months"
    static ref MONTHS_RE: Regex = Regex::new(r"(?i)(\d+)\s*mo").unwrap();
}

/// Parses a duration like "2 yrs 3 mos", "1 yr", "6 mos" or
/// "Jan 2021 - Present · 3 yrs 2 mos" into months.
///
/// The first number followed by a year unit and the first number followed by a
/// month unit are used. Anything unparseable contributes 0.
pub fn parse_duration_months(duration: &str) -> u32 {
    let Some(text) = meaningful(duration) else {
        return 0;
    };

    let leading_number = |re: &Regex| -> u32 {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    leading_number(&*YEARS_RE)
        .saturating_mul(12)
        .saturating_add(leading_number(&*MONTHS_RE))
}

/// Sums every entry's duration independently and compares against `min_years`.
///
/// Concurrent roles are not deduplicated; overlapping periods count twice.
pub fn score_experience(experiences: &[Experience], min_years: f64, max_points: f64) -> ExperienceScore {
    let total_months: u32 = experiences
        .iter()
        .map(|e| parse_duration_months(&e.duration))
        .fold(0, u32::saturating_add);
    let total_years = f64::from(total_months) / 12.0;
    let meets_requirement = total_years >= min_years;

    let points_earned = if meets_requirement || min_years <= 0.0 {
        max_points
    } else {
        (max_points * total_years / min_years).clamp(0.0, max_points)
    };

    ExperienceScore {
        points_earned,
        points_possible: max_points,
        total_months,
        total_years,
        required_years: min_years,
        meets_requirement,
    }
}
