//! TradeQuest League Job
//!
//! Closes a monthly league cycle: ranks every tier cohort, promotes the top,
//! demotes the bottom, resets scores and queues one results notification per
//! member. Meant to be invoked by an external scheduler shortly after the
//! month rolls over.
//!
//! # Usage
//!
//! ```bash
//! # Close last month
//! tradequest-league-job close
//!
//! # Close a specific month and fail the job if any member failed
//! tradequest-league-job close --cycle 2026-09 --fail-on-errors
//!
//! # Preview a close without writing anything
//! tradequest-league-job plan --cycle 2026-09
//!
//! # Environment overrides
//! TRADEQUEST__LEAGUE__PROMOTION_ZONE=5 tradequest-league-job close
//! ```

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tradequest_db::Database;
use tradequest_league::{load_standings, CycleConfig, LeagueCycleProcessor, Transition};
use tradequest_types::{CycleAnchor, TierName, UserId};

use crate::config::JobConfig;

// =============================================================================
// CLI Arguments
// =============================================================================

/// TradeQuest league cycle job
#[derive(Parser, Debug)]
#[command(name = "tradequest-league-job")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "TRADEQUEST_CONFIG", global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TRADEQUEST_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "TRADEQUEST_LOG_FORMAT", global = true)]
    log_format: Option<String>,

    /// SQLite connection URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Close a cycle and print the summary as JSON
    Close {
        /// Cycle to close (YYYY-MM); defaults to last month
        #[arg(long)]
        cycle: Option<CycleAnchor>,

        /// Exit with an error when any member failed
        #[arg(long)]
        fail_on_errors: bool,
    },
    /// Compute a close without writing anything
    Plan {
        /// Cycle to preview (YYYY-MM); defaults to last month
        #[arg(long)]
        cycle: Option<CycleAnchor>,
    },
    /// Print the live league table of a tier
    Standings {
        #[arg(long)]
        tier: String,
    },
    /// Enrol a user in the lowest tier
    Join {
        #[arg(long, value_parser = parse_user_id)]
        user: UserId,
    },
    /// Add XP to a member's current score
    Award {
        #[arg(long, value_parser = parse_user_id)]
        user: UserId,

        #[arg(long)]
        points: u64,
    },
    /// Apply pending database migrations
    Migrate,
}

fn parse_user_id(s: &str) -> Result<UserId, String> {
    UserId::parse(s).map_err(|e| format!("invalid user id '{}': {}", s, e))
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut job_config = JobConfig::load(args.config.as_deref())?;

    if let Some(url) = args.database_url {
        job_config.database.url = url;
    }
    if let Some(level) = args.log_level {
        job_config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        job_config.logging.format = format;
    }

    init_logging(&job_config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting TradeQuest league job");

    validate_config(&job_config)?;
    let cycle_config = job_config.league.cycle_config()?;

    let db = init_database(&job_config).await?;

    match args.command {
        Command::Migrate => {
            if !job_config.job.auto_migrate {
                db.migrate().await?;
            }
            tracing::info!("Database schema is up to date");
        }
        Command::Close { cycle, fail_on_errors } => {
            let closing = resolve_cycle(cycle)?;
            let processor = build_processor(&db, cycle_config, &job_config);
            let summary = processor.run(closing).await;

            print_json(&summary)?;

            if (fail_on_errors || job_config.job.fail_on_errors) && !summary.is_clean() {
                anyhow::bail!(
                    "cycle {} closed with {} failure(s)",
                    closing.label(),
                    summary.failures.len()
                );
            }
        }
        Command::Plan { cycle } => {
            let closing = resolve_cycle(cycle)?;
            let processor = build_processor(&db, cycle_config, &job_config);
            let plan = processor.dry_run(closing).await?;

            let preview = PlanPreview {
                closing_cycle: closing.label(),
                next_cycle: plan.next_cycle.label(),
                promotions: plan.promotions(),
                demotions: plan.demotions(),
                already_closed: plan.already_closed,
                transitions: plan.transitions().collect(),
                failures: plan.failures().map(|f| f.to_string()).collect(),
            };
            print_json(&preview)?;
        }
        Command::Standings { tier } => {
            let repo = db.membership_repo();
            let table = load_standings(&repo, &TierName::new(tier), &cycle_config).await?;
            print_json(&table)?;
        }
        Command::Join { user } => {
            let record = db
                .membership_repo()
                .join(&user, cycle_config.ladder.lowest(), CycleAnchor::current())
                .await?;
            tracing::info!(user_id = %user, tier = %record.tier, "Member enrolled");
            print_json(&record)?;
        }
        Command::Award { user, points } => {
            let score = db.membership_repo().award_points(&user, points).await?;
            tracing::info!(user_id = %user, points, score, "Points awarded");
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct PlanPreview<'a> {
    closing_cycle: String,
    next_cycle: String,
    promotions: usize,
    demotions: usize,
    already_closed: usize,
    transitions: Vec<&'a Transition>,
    failures: Vec<String>,
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    // Logs go to stderr so stdout carries only the JSON output.
    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true).with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}

/// Validate configuration
fn validate_config(config: &JobConfig) -> anyhow::Result<()> {
    if config.database.url.trim().is_empty() {
        anyhow::bail!("database.url is empty. Set DATABASE_URL or TRADEQUEST__DATABASE__URL.");
    }

    if config.job.max_parallel_cohorts == 0 {
        anyhow::bail!("job.max_parallel_cohorts must be at least 1");
    }

    if config.database.is_in_memory() {
        tracing::warn!("Using an in-memory database; nothing will persist after the job exits");
    }

    Ok(())
}

/// Open the database and bring the schema up to date
async fn init_database(config: &JobConfig) -> anyhow::Result<Database> {
    let db = Database::connect(&config.database)
        .await
        .context("failed to open database")?;

    if config.job.auto_migrate {
        db.migrate().await?;
    }

    let health = db.health_check().await?;
    if !health.healthy {
        anyhow::bail!("Database health check failed");
    }
    tracing::info!(members = ?health.members, "Database health check passed");

    Ok(db)
}

fn build_processor(db: &Database, cycle_config: CycleConfig, config: &JobConfig) -> LeagueCycleProcessor {
    LeagueCycleProcessor::new(
        Arc::new(db.membership_repo()),
        Arc::new(db.notification_repo()),
        cycle_config,
    )
    .with_max_parallel_cohorts(config.job.max_parallel_cohorts)
}

/// The requested cycle, or the month before the current one
fn resolve_cycle(requested: Option<CycleAnchor>) -> anyhow::Result<CycleAnchor> {
    match requested {
        Some(cycle) => Ok(cycle),
        None => Ok(CycleAnchor::current().previous()?),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
