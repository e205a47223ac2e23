//! Store and sink interfaces consumed by the cycle-close job
//!
//! The membership store is the persisted source of league records; the
//! notification sink is the outbox member notifications are queued to. Both
//! are external collaborators, so the engine only sees these traits.

use async_trait::async_trait;
use thiserror::Error;

use tradequest_types::{MembershipRecord, MembershipUpdate, Notification, TierName, UserId};

/// Errors reported by a store or sink
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// The record changed since it was read (e.g. already advanced to the next cycle)
    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted league membership records
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Every tier at least one record currently sits in
    async fn list_distinct_tiers(&self) -> StoreResult<Vec<TierName>>;

    /// All records whose current tier is `tier`
    async fn load_cohort(&self, tier: &TierName) -> StoreResult<Vec<MembershipRecord>>;

    /// Ids of the records in `tier`, used to report failures when a full
    /// cohort load is not possible
    async fn cohort_member_ids(&self, tier: &TierName) -> StoreResult<Vec<UserId>>;

    /// Write a cycle-close update for one member.
    ///
    /// Implementations must reject the write with [`StoreError::Conflict`]
    /// when the stored cycle id differs from `update.expected_cycle_id`.
    async fn update_record(&self, user_id: &UserId, update: &MembershipUpdate) -> StoreResult<()>;
}

/// Outbox for member notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Queue a notification for delivery
    async fn enqueue(&self, notification: &Notification) -> StoreResult<()>;
}
