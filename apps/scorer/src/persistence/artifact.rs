use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::errors::JobError;
use crate::models::score::ScoreArtifact;
use crate::persistence::ResultStore;

/// Collision retries before giving up on a file name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Writes one pretty-printed JSON document per scored job into `dir`.
///
/// File name: `<name>_<requirements_id>_<YYYYMMDD_HHMMSS_micros>_score.json`.
/// The document is written to a hidden temp file first and only linked under
/// its final name once complete, so readers never see a partial artifact and a
/// failed write leaves nothing behind. An existing artifact is never
/// overwritten; a clash gets a numeric suffix instead.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    dir: PathBuf,
}

impl FileResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the output directory if it is missing.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    fn file_stem(artifact: &ScoreArtifact) -> String {
        format!(
            "{}_{}_{}",
            slugify(artifact.profile.display_name()),
            slugify(&artifact.requirements_id),
            artifact.scored_at.format("%Y%m%d_%H%M%S_%6f"),
        )
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn save(&self, artifact: &ScoreArtifact) -> Result<PathBuf, JobError> {
        let body = serde_json::to_vec_pretty(artifact)
            .map_err(|e| JobError::Persistence(format!("serialize artifact: {e}")))?;
        let stem = Self::file_stem(artifact);
        let dir = self.dir.clone();

        let path = tokio::task::spawn_blocking(move || {
            write_new(&dir, &stem, |file| {
                file.write_all(&body)?;
                file.sync_all()
            })
        })
        .await
        .map_err(|e| JobError::Persistence(format!("write task failed: {e}")))??;

        debug!(path = %path.display(), "Score artifact written");
        Ok(path)
    }
}

/// Runs `write` against a temp file in `dir`, then links the finished file as
/// `<stem>_score.json` or the first free `<stem>_<n>_score.json`.
/// The temp file is removed on every error path.
fn write_new(
    dir: &Path,
    stem: &str,
    write: impl FnOnce(&mut File) -> std::io::Result<()>,
) -> Result<PathBuf, JobError> {
    let mut tmp: NamedTempFile = Builder::new()
        .prefix(".")
        .suffix(".json.tmp")
        .tempfile_in(dir)
        .map_err(|e| JobError::Persistence(format!("create temp file in {}: {e}", dir.display())))?;

    write(tmp.as_file_mut())
        .map_err(|e| JobError::Persistence(format!("write {}: {e}", tmp.path().display())))?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}_score.json")
        } else {
            format!("{stem}_{attempt}_score.json")
        };
        let path = dir.join(name);

        match tmp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => tmp = e.file,
            Err(e) => {
                return Err(JobError::Persistence(format!(
                    "link {}: {}",
                    path.display(),
                    e.error
                )))
            }
        }
    }

    Err(JobError::Persistence(format!(
        "no free file name for {stem} in {}",
        dir.display()
    )))
}

/// Lowercases and keeps `[a-z0-9_-]`; whitespace and path separators become
/// `_`. Empty results fall back to `unknown`.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c);
        } else if (c.is_whitespace() || c == '/' || c == '\\') && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug.to_string()
    }
}
