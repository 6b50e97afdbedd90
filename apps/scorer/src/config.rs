use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::scoring::ScoringConfig;

/// Application configuration loaded from environment variables.
/// Start-up fails if a required variable is missing or a value is out of range.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub queue_name: String,
    /// Names this process's processing lists; unique per running scorer.
    pub instance_id: String,
    pub workers: usize,
    pub requirements_dir: PathBuf,
    pub output_dir: PathBuf,
    pub fuzzy_threshold: f64,
    pub queue_block_timeout: Duration,
    /// Enables lead-score sync when set.
    pub database_url: Option<String>,
    /// Enables the /health and /stats server when set.
    pub stats_port: Option<u16>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let workers = optional("SCORING_WORKERS")
            .unwrap_or_else(|| "2".to_string())
            .parse::<usize>()
            .context("SCORING_WORKERS must be a positive integer")?;
        if workers == 0 {
            bail!("SCORING_WORKERS must be at least 1");
        }

        let fuzzy_threshold = optional("FUZZY_THRESHOLD")
            .unwrap_or_else(|| "80".to_string())
            .parse::<f64>()
            .context("FUZZY_THRESHOLD must be a number")?;
        if !(0.0..=100.0).contains(&fuzzy_threshold) {
            bail!("FUZZY_THRESHOLD must be within 0..=100, got {fuzzy_threshold}");
        }

        let block_secs = optional("QUEUE_BLOCK_TIMEOUT_SECS")
            .unwrap_or_else(|| "5".to_string())
            .parse::<u64>()
            .context("QUEUE_BLOCK_TIMEOUT_SECS must be a whole number of seconds")?;
        if block_secs == 0 {
            // 0 would make BLMOVE block forever and workers would miss shutdown.
            bail!("QUEUE_BLOCK_TIMEOUT_SECS must be at least 1");
        }
        if block_secs > 30 {
            // An idle consumer renews its 60s lease once per block.
            bail!("QUEUE_BLOCK_TIMEOUT_SECS must be at most 30, got {block_secs}");
        }

        // Two processes sharing an instance id would share processing lists.
        let instance_id = optional("SCORER_INSTANCE_ID")
            .or_else(|| optional("HOSTNAME"))
            .unwrap_or_else(|| "scorer".to_string());
        if instance_id.contains(char::is_whitespace) {
            bail!("SCORER_INSTANCE_ID must not contain whitespace");
        }

        let stats_port = optional("STATS_PORT")
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("STATS_PORT must be a valid port number")?;

        Ok(Config {
            redis_url: var("REDIS_URL")
                .context("Required environment variable 'REDIS_URL' is not set")?,
            queue_name: optional("SCORING_QUEUE").unwrap_or_else(|| "scoring_queue".to_string()),
            instance_id,
            workers,
            requirements_dir: optional("REQUIREMENTS_DIR")
                .unwrap_or_else(|| "requirements".to_string())
                .into(),
            output_dir: optional("OUTPUT_DIR")
                .unwrap_or_else(|| "data/scores".to_string())
                .into(),
            fuzzy_threshold,
            queue_block_timeout: Duration::from_secs(block_secs),
            database_url: optional("DATABASE_URL"),
            stats_port,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Scoring constants for the composite scorer, validated.
    pub fn scoring_config(&self) -> Result<ScoringConfig> {
        let config = ScoringConfig::with_fuzzy_threshold(self.fuzzy_threshold);
        config
            .validate()
            .map_err(|reason| anyhow::anyhow!("Invalid scoring configuration: {reason}"))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("REDIS_URL", "redis://localhost:6379")]).unwrap();
        assert_eq!(config.queue_name, "scoring_queue");
        assert_eq!(config.workers, 2);
        assert_eq!(config.requirements_dir, PathBuf::from("requirements"));
        assert_eq!(config.output_dir, PathBuf::from("data/scores"));
        assert_eq!(config.fuzzy_threshold, 80.0);
        assert_eq!(config.queue_block_timeout, Duration::from_secs(5));
        assert!(config.database_url.is_none());
        assert!(config.stats_port.is_none());
        assert_eq!(config.scoring_config().unwrap().fuzzy_threshold, 80.0);
    }

    #[test]
    fn test_redis_url_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("REDIS_URL"));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let base = ("REDIS_URL", "redis://localhost");
        assert!(load(&[base, ("SCORING_WORKERS", "0")]).is_err());
        assert!(load(&[base, ("SCORING_WORKERS", "-1")]).is_err());
        assert!(load(&[base, ("FUZZY_THRESHOLD", "101")]).is_err());
        assert!(load(&[base, ("FUZZY_THRESHOLD", "high")]).is_err());
        assert!(load(&[base, ("QUEUE_BLOCK_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[base, ("QUEUE_BLOCK_TIMEOUT_SECS", "31")]).is_err());
        assert!(load(&[base, ("STATS_PORT", "70000")]).is_err());
        assert!(load(&[base, ("SCORER_INSTANCE_ID", "two words")]).is_err());
    }

    #[test]
    fn test_instance_id_falls_back_to_hostname() {
        let base = ("REDIS_URL", "redis://localhost");
        assert_eq!(load(&[base]).unwrap().instance_id, "scorer");
        assert_eq!(
            load(&[base, ("HOSTNAME", "pod-7")]).unwrap().instance_id,
            "pod-7"
        );
        assert_eq!(
            load(&[base, ("HOSTNAME", "pod-7"), ("SCORER_INSTANCE_ID", "blue")])
                .unwrap()
                .instance_id,
            "blue"
        );
    }

    #[test]
    fn test_optional_surfaces() {
        let config = load(&[
            ("REDIS_URL", "redis://localhost"),
            ("DATABASE_URL", "postgres://localhost/leads"),
            ("STATS_PORT", "9100"),
            ("SCORING_WORKERS", "4"),
            ("FUZZY_THRESHOLD", "90"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/leads"));
        assert_eq!(config.stats_port, Some(9100));
        assert_eq!(config.workers, 4);
        assert_eq!(config.scoring_config().unwrap().fuzzy_threshold, 90.0);
    }
}
