//! # TradeQuest League Engine
//!
//! Monthly league reset for TradeQuest. Members compete inside a tier
//! cohort for one calendar month; when the month closes, each cohort is
//! ranked, the top of every cohort moves up a tier, the bottom moves down,
//! lifetime counters are updated, scores reset, and every member receives
//! exactly one results notification.
//!
//! ## Pipeline
//!
//! ```text
//! MembershipStore ──► SnapshotLoader ──► plan_cycle ──► CycleCommitter ──► MembershipStore
//!                       (freeze)        (pure)          (per member)      NotificationSink
//! ```
//!
//! - [`ladder`]: ordered tier names
//! - [`zone`]: promotion / demotion / safe classification
//! - [`snapshot`]: one consistent read of every cohort
//! - [`transition`]: per-member outcome, update and notification
//! - [`committer`]: writes outcomes back, isolating failures per member
//! - [`processor`]: the cycle-close job tying it all together
//! - [`standings`]: live ranking of a cohort between closes
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tradequest_league::{CycleConfig, InMemoryLeagueStore, LeagueCycleProcessor};
//!
//! let store = Arc::new(InMemoryLeagueStore::new());
//! let processor = LeagueCycleProcessor::new(store.clone(), store, CycleConfig::default());
//! let summary = processor.run(CycleAnchor::current()).await?;
//! println!("{} members processed", summary.processed_count);
//! ```

pub mod committer;
pub mod config;
pub mod failure;
pub mod ladder;
pub mod memory;
pub mod processor;
pub mod snapshot;
pub mod standings;
pub mod store;
pub mod transition;
pub mod zone;

pub use committer::{CohortReport, CycleCommitter};
pub use config::{CycleConfig, DEFAULT_DEEP_LINK, DEFAULT_DEMOTION_ZONE, DEFAULT_PROMOTION_ZONE};
pub use failure::{CycleFailure, FailureStage};
pub use ladder::{TierLadder, DEFAULT_TIERS};
pub use memory::InMemoryLeagueStore;
pub use processor::{CycleSummary, LeagueCycleProcessor, DEFAULT_MAX_PARALLEL_COHORTS};
pub use snapshot::{Cohort, Snapshot, SnapshotLoader};
pub use standings::{load_standings, standings, StandingEntry};
pub use store::{MembershipStore, NotificationSink, StoreError, StoreResult};
pub use transition::{plan_cohort, plan_cycle, plan_member, CohortPlan, CyclePlan, PlannedUpdate, Transition};
pub use zone::{classify_zone, Zone};

use thiserror::Error;
use tradequest_types::{TierName, TypesError};

/// League engine errors
#[derive(Debug, Error)]
pub enum LeagueError {
    #[error("Invalid tier ladder: {0}")]
    InvalidLadder(String),

    #[error("Tier '{0}' is not on the ladder")]
    UnknownTier(TierName),

    #[error("Invalid league configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid cycle: {0}")]
    Cycle(#[from] TypesError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for league operations
pub type LeagueResult<T> = Result<T, LeagueError>;
