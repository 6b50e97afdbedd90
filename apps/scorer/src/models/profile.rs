use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Placeholder the profile crawler writes for fields it could not extract.
const MISSING_PLACEHOLDER: &str = "n/a";

/// Returns `None` for blank text and the crawler's `N/A` placeholder.
pub fn meaningful(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(MISSING_PLACEHOLDER) {
        None
    } else {
        Some(trimmed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Experience {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    /// Free text such as "Jan 2021 - Present · 3 yrs 2 mos".
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Education {
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectEntry {
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Projects arrive either as a single narrative or as a list of entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Projects {
    Text(String),
    Entries(Vec<ProjectEntry>),
}

impl Projects {
    /// Flattens the projects into one whitespace-separated narrative.
    pub fn text(&self) -> String {
        match self {
            Projects::Text(text) => meaningful(text).unwrap_or_default().to_string(),
            Projects::Entries(entries) => entries
                .iter()
                .flat_map(|p| [p.title.as_str(), p.description.as_str()])
                .filter_map(meaningful)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// A scraped candidate profile. Read-only input to scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub projects: Option<Projects>,
}

impl ProfileData {
    /// Narrative used for text similarity: about, then every experience
    /// description, then projects, joined by single spaces.
    pub fn narrative_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(about) = self.about.as_deref().and_then(meaningful) {
            parts.push(about.to_string());
        }
        parts.extend(
            self.experiences
                .iter()
                .filter_map(|e| meaningful(&e.description))
                .map(str::to_string),
        );
        if let Some(projects) = &self.projects {
            let text = projects.text();
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join(" ")
    }

    /// Lowercased skill names with blanks and placeholders removed.
    pub fn normalized_skills(&self) -> BTreeSet<String> {
        self.skills
            .iter()
            .filter_map(|s| meaningful(s))
            .map(str::to_lowercase)
            .collect()
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .and_then(meaningful)
            .unwrap_or("unknown")
    }
}
