//! In-memory league store
//!
//! Implements both [`MembershipStore`] and [`NotificationSink`] over locked
//! maps. Used for local runs and tests; the SQLite store lives in
//! `tradequest-db`.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::ladder::TierLadder;
use crate::store::{MembershipStore, NotificationSink, StoreError, StoreResult};
use tradequest_types::{
    CycleAnchor, MembershipRecord, MembershipUpdate, Notification, TierName, UserId,
};

/// League store backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryLeagueStore {
    records: RwLock<HashMap<UserId, MembershipRecord>>,
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryLeagueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user at the bottom of `ladder`. Returns the existing record if
    /// the user already joined.
    pub fn join(&self, user_id: UserId, ladder: &TierLadder, cycle: CycleAnchor) -> MembershipRecord {
        self.records
            .write()
            .entry(user_id)
            .or_insert_with(|| MembershipRecord::join(user_id, ladder.lowest().clone(), cycle))
            .clone()
    }

    /// Insert or replace a record as-is
    pub fn insert(&self, record: MembershipRecord) {
        self.records.write().insert(record.user_id, record);
    }

    /// Add points to a member's current-cycle score
    pub fn award_points(&self, user_id: &UserId, points: u64) -> StoreResult<u64> {
        let mut records = self.records.write();
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;
        record.award_points(points);
        Ok(record.period_score)
    }

    /// Current record for a member
    pub fn get(&self, user_id: &UserId) -> Option<MembershipRecord> {
        self.records.read().get(user_id).cloned()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no members
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// All queued notifications, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().clone()
    }

    /// Queued notifications for one member
    pub fn notifications_for(&self, user_id: &UserId) -> Vec<Notification> {
        self.notifications
            .read()
            .iter()
            .filter(|n| &n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MembershipStore for InMemoryLeagueStore {
    async fn list_distinct_tiers(&self) -> StoreResult<Vec<TierName>> {
        let tiers: BTreeSet<TierName> = self.records.read().values().map(|r| r.tier.clone()).collect();
        Ok(tiers.into_iter().collect())
    }

    async fn load_cohort(&self, tier: &TierName) -> StoreResult<Vec<MembershipRecord>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| &r.tier == tier)
            .cloned()
            .collect())
    }

    async fn cohort_member_ids(&self, tier: &TierName) -> StoreResult<Vec<UserId>> {
        let mut ids: Vec<UserId> = self
            .records
            .read()
            .values()
            .filter(|r| &r.tier == tier)
            .map(|r| r.user_id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn update_record(&self, user_id: &UserId, update: &MembershipUpdate) -> StoreResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;

        if record.cycle.id != update.expected_cycle_id {
            return Err(StoreError::Conflict(format!(
                "{} is at cycle {}, expected {}",
                user_id, record.cycle.id, update.expected_cycle_id
            )));
        }

        record.apply(update);
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for InMemoryLeagueStore {
    async fn enqueue(&self, notification: &Notification) -> StoreResult<()> {
        self.notifications.write().push(notification.clone());
        Ok(())
    }
}
