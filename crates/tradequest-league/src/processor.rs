//! # League Cycle Processor
//!
//! The scheduled monthly job. Given the cycle being closed it:
//!
//! 1. takes a [`Snapshot`] of every cohort,
//! 2. plans every member's transition from that snapshot,
//! 3. commits cohorts concurrently (members within a cohort in rank order).
//!
//! `run` never fails as a whole. Everything that goes wrong is reported in
//! the returned [`CycleSummary`] so the scheduler can decide whether to alert
//! or retry. A retry only writes members that were not yet advanced, and
//! ranks them against the full cohort they closed in.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::committer::{CohortReport, CycleCommitter};
use crate::config::CycleConfig;
use crate::failure::{CycleFailure, FailureStage};
use crate::snapshot::{Snapshot, SnapshotLoader};
use crate::store::{MembershipStore, NotificationSink};
use crate::transition::{plan_cycle, CyclePlan};
use crate::LeagueResult;
use tradequest_types::{CycleAnchor, CycleRunId};

/// Default number of cohorts committed at the same time
pub const DEFAULT_MAX_PARALLEL_COHORTS: usize = 4;

/// Report of one cycle close
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSummary {
    pub run_id: CycleRunId,
    pub closing_cycle: CycleAnchor,
    /// `None` only when the next cycle could not be derived
    pub next_cycle: Option<CycleAnchor>,
    /// Members whose record was advanced by this run
    pub processed_count: usize,
    pub promotions: usize,
    pub demotions: usize,
    /// Members skipped because an earlier run already advanced them
    pub already_closed: usize,
    pub failures: Vec<CycleFailure>,
    pub cohorts: Vec<CohortReport>,
    pub started_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

impl CycleSummary {
    /// True when nothing failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures that name a member
    pub fn failed_members(&self) -> impl Iterator<Item = &CycleFailure> {
        self.failures.iter().filter(|f| f.user_id.is_some())
    }
}

/// Monthly league reset job
pub struct LeagueCycleProcessor {
    store: Arc<dyn MembershipStore>,
    committer: CycleCommitter,
    config: CycleConfig,
    max_parallel_cohorts: usize,
}

impl LeagueCycleProcessor {
    pub fn new(store: Arc<dyn MembershipStore>, sink: Arc<dyn NotificationSink>, config: CycleConfig) -> Self {
        Self {
            committer: CycleCommitter::new(store.clone(), sink),
            store,
            config,
            max_parallel_cohorts: DEFAULT_MAX_PARALLEL_COHORTS,
        }
    }

    /// Bound how many cohorts are loaded and committed at once
    pub fn with_max_parallel_cohorts(mut self, max: usize) -> Self {
        self.max_parallel_cohorts = max.max(1);
        self
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Freeze every cohort for the close of `closing_cycle`
    pub async fn snapshot(&self, closing_cycle: CycleAnchor) -> Snapshot {
        SnapshotLoader::new(self.store.as_ref(), &self.config.ladder)
            .with_concurrency(self.max_parallel_cohorts)
            .load(closing_cycle)
            .await
    }

    /// Compute the close of `closing_cycle` without writing anything
    pub async fn dry_run(&self, closing_cycle: CycleAnchor) -> LeagueResult<CyclePlan> {
        let snapshot = self.snapshot(closing_cycle).await;
        plan_cycle(&snapshot, &self.config)
    }

    /// Close `closing_cycle`: rank every cohort, move members between tiers,
    /// reset scores and notify everyone.
    pub async fn run(&self, closing_cycle: CycleAnchor) -> CycleSummary {
        let run_id = CycleRunId::new();
        let started_at = Utc::now();
        info!(run_id = %run_id, cycle = %closing_cycle, "Starting league cycle close");

        let snapshot = self.snapshot(closing_cycle).await;

        let plan = match plan_cycle(&snapshot, &self.config) {
            Ok(plan) => plan,
            Err(e) => {
                // Only reachable when the next cycle cannot be derived.
                error!(run_id = %run_id, cycle = %closing_cycle, error = %e, "Cannot plan cycle close");
                let mut failures = snapshot.failures;
                failures.push(CycleFailure::run(FailureStage::Transition, e.to_string()));
                return CycleSummary {
                    run_id,
                    closing_cycle,
                    next_cycle: None,
                    processed_count: 0,
                    promotions: 0,
                    demotions: 0,
                    already_closed: snapshot.already_closed,
                    failures,
                    cohorts: Vec::new(),
                    started_at,
                    timestamp: Utc::now(),
                };
            }
        };

        let CyclePlan {
            next_cycle,
            cohorts,
            load_failures,
            already_closed,
            ..
        } = plan;

        // Cohorts share nothing mutable, so they commit independently.
        let mut reports: Vec<CohortReport> = stream::iter(cohorts)
            .map(|cohort| self.committer.commit_cohort(cohort))
            .buffer_unordered(self.max_parallel_cohorts)
            .collect()
            .await;
        reports.sort_by_key(|r| self.config.ladder.index_of(&r.tier).unwrap_or(usize::MAX));

        let mut failures = load_failures;
        failures.extend(reports.iter().flat_map(|r| r.failures.iter().cloned()));

        let summary = CycleSummary {
            run_id,
            closing_cycle,
            next_cycle: Some(next_cycle),
            processed_count: reports.iter().map(|r| r.processed).sum(),
            promotions: reports.iter().map(|r| r.promotions).sum(),
            demotions: reports.iter().map(|r| r.demotions).sum(),
            already_closed,
            failures,
            cohorts: reports,
            started_at,
            timestamp: Utc::now(),
        };

        if summary.is_clean() {
            info!(
                run_id = %run_id,
                cycle = %closing_cycle,
                processed = summary.processed_count,
                promotions = summary.promotions,
                demotions = summary.demotions,
                already_closed = summary.already_closed,
                "League cycle closed"
            );
        } else {
            warn!(
                run_id = %run_id,
                cycle = %closing_cycle,
                processed = summary.processed_count,
                promotions = summary.promotions,
                demotions = summary.demotions,
                failures = summary.failures.len(),
                "League cycle closed with failures"
            );
        }

        summary
    }
}
