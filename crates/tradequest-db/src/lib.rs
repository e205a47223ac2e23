//! TradeQuest Database Layer
//!
//! SQLite persistence for the league system.
//!
//! # Tables
//!
//! - **league_memberships**: one row per member; scores are bumped live by
//!   XP awards and the row is rewritten once per cycle close
//! - **notifications**: outbox read by the delivery service
//!
//! # Repository Pattern
//!
//! Each table has its own repository. [`MembershipRepo`] implements the
//! league engine's `MembershipStore` and [`NotificationRepo`] its
//! `NotificationSink`, so a cycle close can run straight against the
//! database.

pub mod config;
pub mod error;
pub mod models;
pub mod repos;

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

pub use config::DatabaseConfig;
pub use error::{DbError, DbResult};
pub use models::*;
pub use repos::*;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the configured database
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        info!("Connecting to SQLite: {}", config.url_masked());

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DbError::Connection(format!("invalid database url: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

        pool_options = if config.is_in_memory() {
            // The database lives as long as its single connection.
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection(format!("SQLite: {}", e)))?;

        info!("Connected to SQLite");
        Ok(Self { pool })
    }

    /// Fresh, migrated in-memory database
    pub async fn in_memory() -> DbResult<Self> {
        let db = Self::connect(&DatabaseConfig::in_memory()).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations
    pub async fn migrate(&self) -> DbResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;
        info!("Migrations complete");
        Ok(())
    }

    pub async fn health_check(&self) -> DbResult<HealthStatus> {
        let healthy = sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok();
        let members = if healthy {
            self.membership_repo().count().await.ok()
        } else {
            None
        };
        Ok(HealthStatus { healthy, members })
    }

    pub fn membership_repo(&self) -> MembershipRepo {
        MembershipRepo::new(self.pool.clone())
    }

    pub fn notification_repo(&self) -> NotificationRepo {
        NotificationRepo::new(self.pool.clone())
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Member count, when the schema is in place
    pub members: Option<i64>,
}
