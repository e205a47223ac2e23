//! Job Configuration
//!
//! Layered configuration for the league cycle job: optional config file,
//! `config/default`, `config/local`, then `TRADEQUEST__`-prefixed
//! environment variables. CLI flags are applied on top in `main`.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use tradequest_db::DatabaseConfig;
use tradequest_league::{
    CycleConfig, TierLadder, DEFAULT_DEEP_LINK, DEFAULT_DEMOTION_ZONE, DEFAULT_MAX_PARALLEL_COHORTS,
    DEFAULT_PROMOTION_ZONE, DEFAULT_TIERS,
};

/// Job configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// League rules
    #[serde(default)]
    pub league: LeagueSettings,

    /// Cycle close execution
    #[serde(default)]
    pub job: JobSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// League rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueSettings {
    /// Tier names, lowest first
    #[serde(default = "default_tiers")]
    pub tiers: Vec<String>,

    /// Top ranks promoted each cycle
    #[serde(default = "default_promotion_zone")]
    pub promotion_zone: usize,

    /// Bottom ranks demoted each cycle
    #[serde(default = "default_demotion_zone")]
    pub demotion_zone: usize,

    /// In-app route attached to notifications (empty string disables it)
    #[serde(default = "default_deep_link")]
    pub deep_link: String,
}

impl Default for LeagueSettings {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            promotion_zone: default_promotion_zone(),
            demotion_zone: default_demotion_zone(),
            deep_link: default_deep_link(),
        }
    }
}

impl LeagueSettings {
    /// Build the engine configuration
    pub fn cycle_config(&self) -> anyhow::Result<CycleConfig> {
        let ladder = TierLadder::from_names(&self.tiers).context("invalid league.tiers")?;
        let deep_link = Some(self.deep_link.trim().to_string()).filter(|link| !link.is_empty());

        let config = CycleConfig::with_ladder(ladder)
            .with_zones(self.promotion_zone, self.demotion_zone)
            .with_deep_link(deep_link);
        config.validate().context("invalid league settings")?;
        Ok(config)
    }
}

/// Cycle close execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Cohorts loaded and committed at the same time
    #[serde(default = "default_max_parallel_cohorts")]
    pub max_parallel_cohorts: usize,

    /// Exit non-zero when any member failed
    #[serde(default)]
    pub fail_on_errors: bool,

    /// Apply pending migrations before running a command
    #[serde(default = "default_true")]
    pub auto_migrate: bool,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            max_parallel_cohorts: default_max_parallel_cohorts(),
            fail_on_errors: false,
            auto_migrate: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// =============================================================================
// Default Functions
// =============================================================================

fn default_tiers() -> Vec<String> {
    DEFAULT_TIERS.iter().map(|t| t.to_string()).collect()
}

fn default_promotion_zone() -> usize {
    DEFAULT_PROMOTION_ZONE
}

fn default_demotion_zone() -> usize {
    DEFAULT_DEMOTION_ZONE
}

fn default_deep_link() -> String {
    DEFAULT_DEEP_LINK.to_string()
}

fn default_max_parallel_cohorts() -> usize {
    DEFAULT_MAX_PARALLEL_COHORTS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl JobConfig {
    /// Load configuration from environment and optional config file
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        // TRADEQUEST__LEAGUE__TIERS=Bronze,Silver,Gold
        builder = builder.add_source(
            config::Environment::with_prefix("TRADEQUEST")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("league.tiers"),
        );

        let config = builder.build().context("failed to read configuration")?;
        let job_config: JobConfig = config
            .try_deserialize()
            .context("failed to parse configuration")?;

        Ok(job_config)
    }

    /// Configuration for local development
    pub fn development() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://tradequest-dev.db".to_string(),
                ..Default::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build_engine_config() {
        let config = JobConfig::default();
        let cycle = config.league.cycle_config().unwrap();
        assert_eq!(cycle.promotion_zone, 10);
        assert_eq!(cycle.demotion_zone, 5);
        assert_eq!(cycle.ladder.len(), 8);
        assert_eq!(cycle.deep_link.as_deref(), Some("/leagues"));
        assert_eq!(config.job.max_parallel_cohorts, 4);
    }

    #[test]
    fn test_empty_deep_link_disables_it() {
        let settings = LeagueSettings {
            deep_link: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.cycle_config().unwrap().deep_link, None);
    }

    #[test]
    fn test_duplicate_tiers_rejected() {
        let settings = LeagueSettings {
            tiers: vec!["Gold".to_string(), "Gold".to_string()],
            ..Default::default()
        };
        assert!(settings.cycle_config().is_err());
    }

    #[test]
    fn test_development_config() {
        let config = JobConfig::development();
        assert_eq!(config.logging.level, "debug");
        assert!(config.database.url.starts_with("sqlite://"));
        assert!(config.job.auto_migrate);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: JobConfig =
            serde_json::from_str(r#"{"league": {"promotion_zone": 3}, "job": {"fail_on_errors": true}}"#).unwrap();
        assert_eq!(config.league.promotion_zone, 3);
        assert_eq!(config.league.demotion_zone, 5);
        assert!(config.job.fail_on_errors);
        assert_eq!(config.database.url, "sqlite://tradequest.db");
    }
}
