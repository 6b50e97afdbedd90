//! Requirement registry: immutable map from requirements_id to spec.
//!
//! Loaded once before any worker starts, then shared as `Arc<RequirementRegistry>`.
//! No interior mutability and no I/O after load, so workers read it without locks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::{JobError, RegistryError};
use crate::models::requirement::RequirementSpec;

#[derive(Debug, Default)]
pub struct RequirementRegistry {
    specs: HashMap<String, Arc<RequirementSpec>>,
}

impl RequirementRegistry {
    /// Loads every `*.json` file in `dir`.
    ///
    /// Files that fail to parse or validate are skipped with a warning; the id is
    /// the requirement's `id` field, else the file stem. Loading zero specs is an error.
    pub fn load_dir(dir: &Path) -> Result<Self, RegistryError> {
        let read_dir = std::fs::read_dir(dir).map_err(|source| RegistryError::ReadDir {
            path: dir.display().to_string(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut specs = HashMap::new();
        for path in paths {
            let Some((id, spec)) = load_file(&path) else {
                continue;
            };
            if specs.contains_key(&id) {
                warn!(path = %path.display(), requirements_id = %id, "Duplicate requirements id, keeping the first");
                continue;
            }
            info!(
                requirements_id = %id,
                position = %spec.position,
                required_skills = spec.required_skills.len(),
                preferred_skills = spec.preferred_skills.len(),
                "Loaded requirement spec"
            );
            specs.insert(id, Arc::new(spec));
        }

        if specs.is_empty() {
            return Err(RegistryError::Empty(dir.display().to_string()));
        }
        Ok(Self { specs })
    }

    #[cfg(test)]
    pub fn from_specs(specs: impl IntoIterator<Item = (String, RequirementSpec)>) -> Self {
        Self {
            specs: specs
                .into_iter()
                .map(|(id, spec)| (id, Arc::new(spec)))
                .collect(),
        }
    }

    pub fn get(&self, requirements_id: &str) -> Result<Arc<RequirementSpec>, JobError> {
        self.specs
            .get(requirements_id)
            .cloned()
            .ok_or_else(|| JobError::UnknownRequirement(requirements_id.to_string()))
    }

    /// Loaded ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.specs.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }
}

fn load_file(path: &Path) -> Option<(String, RequirementSpec)> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), "Cannot read requirement file: {e}");
            return None;
        }
    };
    let spec: RequirementSpec = match serde_json::from_str(&raw) {
        Ok(spec) => spec,
        Err(e) => {
            warn!(path = %path.display(), "Invalid requirement file: {e}");
            return None;
        }
    };
    if let Err(reason) = spec.validate() {
        warn!(path = %path.display(), "Rejected requirement file: {reason}");
        return None;
    }

    let id = spec
        .id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))?;
    Some((id, spec))
}
