//! # Cycle Committer
//!
//! Writes planned transitions back to the membership store and queues the
//! matching notifications. Each member is committed on its own; a failed
//! write or enqueue is recorded and the next member proceeds.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::failure::{CycleFailure, FailureStage};
use crate::store::{MembershipStore, NotificationSink};
use crate::transition::{CohortPlan, PlannedUpdate};
use tradequest_types::TierName;

/// Outcome of committing one cohort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortReport {
    pub tier: TierName,
    pub cohort_size: usize,
    /// Members whose record was written
    pub processed: usize,
    pub promotions: usize,
    pub demotions: usize,
    pub failures: Vec<CycleFailure>,
}

/// Result of committing a single member
enum MemberOutcome {
    /// Record written and notification queued
    Committed,
    /// Record written but the notification could not be queued
    NotifyFailed(CycleFailure),
    /// Record not written; member left as it was
    WriteFailed(CycleFailure),
}

/// Applies cohort plans to the store and notification sink
#[derive(Clone)]
pub struct CycleCommitter {
    store: Arc<dyn MembershipStore>,
    sink: Arc<dyn NotificationSink>,
}

impl CycleCommitter {
    pub fn new(store: Arc<dyn MembershipStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { store, sink }
    }

    /// Commit every planned update of a cohort, in rank order
    pub async fn commit_cohort(&self, plan: CohortPlan) -> CohortReport {
        let mut report = CohortReport {
            tier: plan.tier,
            cohort_size: plan.cohort_size,
            processed: 0,
            promotions: 0,
            demotions: 0,
            failures: plan.failures,
        };

        for planned in &plan.updates {
            let written = match self.commit_member(&report.tier, planned).await {
                MemberOutcome::Committed => true,
                MemberOutcome::NotifyFailed(failure) => {
                    report.failures.push(failure);
                    true
                }
                MemberOutcome::WriteFailed(failure) => {
                    report.failures.push(failure);
                    false
                }
            };

            if written {
                report.processed += 1;
                if planned.transition.was_promoted {
                    report.promotions += 1;
                }
                if planned.transition.was_demoted {
                    report.demotions += 1;
                }
            }
        }

        info!(
            tier = %report.tier,
            cohort_size = report.cohort_size,
            processed = report.processed,
            promotions = report.promotions,
            demotions = report.demotions,
            failures = report.failures.len(),
            "Cohort committed"
        );

        report
    }

    async fn commit_member(&self, tier: &TierName, planned: &PlannedUpdate) -> MemberOutcome {
        let user_id = planned.transition.user_id;

        if let Err(e) = self.store.update_record(&user_id, &planned.update).await {
            warn!(user_id = %user_id, tier = %tier, rank = planned.transition.rank, reason = %e, "Failed to update league record");
            return MemberOutcome::WriteFailed(CycleFailure::member(
                user_id,
                tier.clone(),
                FailureStage::UpdateRecord,
                e.to_string(),
            ));
        }

        if let Err(e) = self.sink.enqueue(&planned.notification).await {
            warn!(
                user_id = %user_id,
                tier = %tier,
                kind = %planned.notification.kind,
                reason = %e,
                "Record updated but notification could not be queued"
            );
            return MemberOutcome::NotifyFailed(CycleFailure::member(
                user_id,
                tier.clone(),
                FailureStage::EnqueueNotification,
                e.to_string(),
            ));
        }

        MemberOutcome::Committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CycleConfig;
    use crate::memory::InMemoryLeagueStore;
    use crate::snapshot::Cohort;
    use crate::store::{StoreError, StoreResult};
    use crate::transition::plan_cohort;
    use async_trait::async_trait;
    use tradequest_types::{CycleAnchor, MembershipRecord, Notification, UserId};
    use uuid::Uuid;

    struct RejectingSink;

    #[async_trait]
    impl NotificationSink for RejectingSink {
        async fn enqueue(&self, _notification: &Notification) -> StoreResult<()> {
            Err(StoreError::Unavailable("outbox offline".into()))
        }
    }

    fn cycle() -> CycleAnchor {
        CycleAnchor::from_id(2026 * 12 + 9).unwrap()
    }

    fn seed(store: &InMemoryLeagueStore, size: u128) -> Cohort {
        let members: Vec<MembershipRecord> = (1..=size)
            .map(|n| {
                let mut r = MembershipRecord::join(UserId::from_uuid(Uuid::from_u128(n)), TierName::from("Gold"), cycle());
                r.period_score = 100 * (size - n + 1) as u64;
                store.insert(r.clone());
                r
            })
            .collect();
        Cohort::new(TierName::from("Gold"), members)
    }

    #[tokio::test]
    async fn test_commit_writes_and_notifies() {
        let store = Arc::new(InMemoryLeagueStore::new());
        let cohort = seed(&store, 8);
        let plan = plan_cohort(&cohort, &CycleConfig::default().with_zones(2, 2), cycle().next().unwrap());

        let committer = CycleCommitter::new(store.clone(), store.clone());
        let report = committer.commit_cohort(plan).await;

        assert_eq!(report.processed, 8);
        assert_eq!(report.promotions, 2);
        assert_eq!(report.demotions, 2);
        assert!(report.failures.is_empty());
        assert_eq!(store.notifications().len(), 8);

        let top = store.get(&UserId::from_uuid(Uuid::from_u128(1))).unwrap();
        assert_eq!(top.tier, TierName::from("Platinum"));
        assert_eq!(top.period_score, 0);
    }

    #[tokio::test]
    async fn test_enqueue_failure_keeps_tier_change() {
        let store = Arc::new(InMemoryLeagueStore::new());
        let cohort = seed(&store, 3);
        let plan = plan_cohort(&cohort, &CycleConfig::default(), cycle().next().unwrap());

        let committer = CycleCommitter::new(store.clone(), Arc::new(RejectingSink));
        let report = committer.commit_cohort(plan).await;

        assert_eq!(report.processed, 3);
        assert_eq!(report.promotions, 3);
        assert_eq!(report.failures.len(), 3);
        assert!(report
            .failures
            .iter()
            .all(|f| f.stage == FailureStage::EnqueueNotification));

        let member = store.get(&UserId::from_uuid(Uuid::from_u128(2))).unwrap();
        assert_eq!(member.tier, TierName::from("Platinum"));
    }

    #[tokio::test]
    async fn test_write_conflict_is_not_counted() {
        let store = Arc::new(InMemoryLeagueStore::new());
        let cohort = seed(&store, 2);
        let next = cycle().next().unwrap();
        let plan = plan_cohort(&cohort, &CycleConfig::default(), next);

        // Simulate another run having already advanced member 1
        let mut advanced = store.get(&UserId::from_uuid(Uuid::from_u128(1))).unwrap();
        advanced.cycle = next;
        store.insert(advanced);

        let committer = CycleCommitter::new(store.clone(), store.clone());
        let report = committer.commit_cohort(plan).await;

        assert_eq!(report.processed, 1);
        assert_eq!(report.promotions, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, FailureStage::UpdateRecord);
        assert_eq!(store.notifications().len(), 1);
    }
}
