//! # Membership Snapshot Loader
//!
//! Reads every cohort once at the start of a cycle close and freezes it.
//! Ranking, transitions and commits all work from this snapshot, so XP
//! awards landing mid-run cannot reshuffle ranks.
//!
//! ## Guarantees
//!
//! - Each tier's cohort is loaded exactly once and sorted once:
//!   `period_score` descending, ties broken by `user_id` ascending.
//! - A member appears in at most one cohort. Records reported under a tier
//!   they no longer belong to, or seen twice, are dropped.
//! - Records already advanced past the closing cycle are counted as
//!   `already_closed` and never written again. When they were advanced by
//!   this close they rejoin the cohort they closed in, with the score they
//!   closed with, as settled members. A retried close therefore ranks the
//!   remaining members exactly as the first attempt did.
//! - A cohort that fails to load is reported member-by-member when the store
//!   can still list its ids, and as a single cohort failure otherwise.
//!   Settled members of a neighbouring tier may be hiding in it, so cohorts
//!   next to it on the ladder are deferred to a later run.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::failure::{CycleFailure, FailureStage};
use crate::ladder::TierLadder;
use crate::store::MembershipStore;
use tradequest_types::{CycleAnchor, MembershipRecord, TierName, UserId};

/// Default number of cohorts loaded concurrently
pub const DEFAULT_LOAD_CONCURRENCY: usize = 4;

// ============================================================================
// Cohort
// ============================================================================

/// Members sharing one tier at snapshot time, in rank order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    pub tier: TierName,
    members: Vec<MembershipRecord>,
    /// Members whose result for this close is already stored
    #[serde(default)]
    settled: BTreeSet<UserId>,
}

impl Cohort {
    /// Build a cohort, sorting members into rank order
    pub fn new(tier: TierName, members: Vec<MembershipRecord>) -> Self {
        Self::with_settled(tier, members, Vec::new())
    }

    /// Build a cohort that also holds settled members. Settled records must
    /// carry the tier and score they closed the cycle with; they take part in
    /// ranking but are not planned again.
    pub fn with_settled(tier: TierName, pending: Vec<MembershipRecord>, settled: Vec<MembershipRecord>) -> Self {
        let settled_ids = settled.iter().map(|m| m.user_id).collect();
        let mut members = pending;
        members.extend(settled);
        sort_by_rank(&mut members);
        Self {
            tier,
            members,
            settled: settled_ids,
        }
    }

    /// Members in rank order (index 0 = rank 1)
    pub fn members(&self) -> &[MembershipRecord] {
        &self.members
    }

    /// Members paired with their 1-based rank
    pub fn ranked(&self) -> impl Iterator<Item = (usize, &MembershipRecord)> {
        self.members.iter().enumerate().map(|(i, m)| (i + 1, m))
    }

    pub fn is_settled(&self, user_id: &UserId) -> bool {
        self.settled.contains(user_id)
    }

    /// Members this close still has to write
    pub fn pending_len(&self) -> usize {
        self.members.len() - self.settled.len()
    }

    /// Full cohort size, settled members included
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Sort records by `period_score` descending, then `user_id` ascending
pub fn sort_by_rank(members: &mut [MembershipRecord]) {
    members.sort_by(|a, b| {
        b.period_score
            .cmp(&a.period_score)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
}

/// Order tier names by ladder position; names the ladder does not know come
/// last, alphabetically. Duplicates are removed.
pub fn order_tiers(ladder: &TierLadder, tiers: Vec<TierName>) -> Vec<TierName> {
    let present: BTreeSet<TierName> = tiers.into_iter().collect();
    let mut known: Vec<(usize, TierName)> = Vec::new();
    let mut unknown: Vec<TierName> = Vec::new();

    for tier in present {
        match ladder.index_of(&tier) {
            Some(i) => known.push((i, tier)),
            None => unknown.push(tier),
        }
    }

    known.sort_by_key(|(i, _)| *i);
    known.into_iter().map(|(_, t)| t).chain(unknown).collect()
}

/// The record as it stood when `closing_cycle` closed, if this close is the
/// one that advanced it
pub fn settled_view(record: &MembershipRecord, closing_cycle: CycleAnchor) -> Option<MembershipRecord> {
    if closing_cycle.next().ok() != Some(record.cycle) {
        return None;
    }
    let tier = record.last_cycle_tier.clone()?;
    let score = record.last_cycle_score?;

    let mut view = record.clone();
    view.tier = tier;
    view.period_score = score;
    view.cycle = closing_cycle;
    Some(view)
}

// ============================================================================
// Snapshot
// ============================================================================

/// Frozen view of every cohort at the start of a cycle close
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Cycle being closed
    pub closing_cycle: CycleAnchor,
    /// Cohorts in ladder order
    pub cohorts: Vec<Cohort>,
    /// Cohorts (or the tier listing) that could not be read
    pub failures: Vec<CycleFailure>,
    /// Records skipped because they were already advanced past `closing_cycle`
    pub already_closed: usize,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Members this close still has to write, across all cohorts
    pub fn member_count(&self) -> usize {
        self.cohorts.iter().map(Cohort::pending_len).sum()
    }

    /// Cohort for a tier, if it was loaded
    pub fn cohort(&self, tier: &TierName) -> Option<&Cohort> {
        self.cohorts.iter().find(|c| &c.tier == tier)
    }
}

/// Records of one successfully read tier, split by role
#[derive(Default)]
struct Admitted {
    pending: Vec<MembershipRecord>,
    settled: Vec<MembershipRecord>,
}

/// Loads a [`Snapshot`] from a membership store
pub struct SnapshotLoader<'a> {
    store: &'a dyn MembershipStore,
    ladder: &'a TierLadder,
    concurrency: usize,
}

impl<'a> SnapshotLoader<'a> {
    pub fn new(store: &'a dyn MembershipStore, ladder: &'a TierLadder) -> Self {
        Self {
            store,
            ladder,
            concurrency: DEFAULT_LOAD_CONCURRENCY,
        }
    }

    /// Limit how many cohorts are read at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Read every cohort for the close of `closing_cycle`
    pub async fn load(&self, closing_cycle: CycleAnchor) -> Snapshot {
        let mut snapshot = Snapshot {
            closing_cycle,
            cohorts: Vec::new(),
            failures: Vec::new(),
            already_closed: 0,
            taken_at: Utc::now(),
        };

        let tiers = match self.store.list_distinct_tiers().await {
            Ok(tiers) => order_tiers(self.ladder, tiers),
            Err(e) => {
                warn!(error = %e, "Failed to list league tiers; nothing to close");
                snapshot.failures.push(CycleFailure::run(FailureStage::ListTiers, e.to_string()));
                return snapshot;
            }
        };

        // Reads run concurrently; `buffered` keeps results in ladder order so
        // that the de-duplication below is deterministic.
        let loads: Vec<_> = stream::iter(tiers)
            .map(|tier| async move {
                let result = self.store.load_cohort(&tier).await;
                (tier, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut seen = HashSet::new();
        let mut pending: Vec<(TierName, Vec<MembershipRecord>)> = Vec::new();
        let mut settled: BTreeMap<TierName, Vec<MembershipRecord>> = BTreeMap::new();
        let mut unreadable: BTreeSet<TierName> = BTreeSet::new();

        for (tier, result) in loads {
            match result {
                Ok(records) => {
                    let admitted = self.admit(&tier, records, closing_cycle, &mut seen, &mut snapshot.already_closed);
                    debug!(
                        tier = %tier,
                        pending = admitted.pending.len(),
                        settled_elsewhere = admitted.settled.len(),
                        "Loaded cohort"
                    );
                    for record in admitted.settled {
                        settled.entry(record.tier.clone()).or_default().push(record);
                    }
                    if !admitted.pending.is_empty() {
                        pending.push((tier, admitted.pending));
                    }
                }
                Err(e) => {
                    warn!(tier = %tier, error = %e, "Failed to load cohort; skipping tier this run");
                    let reason = format!("cohort load failed: {}", e);
                    match self.store.cohort_member_ids(&tier).await {
                        Ok(ids) => {
                            for user_id in ids.into_iter().filter(|id| seen.insert(*id)) {
                                snapshot.failures.push(CycleFailure::member(
                                    user_id,
                                    tier.clone(),
                                    FailureStage::LoadCohort,
                                    reason.clone(),
                                ));
                            }
                        }
                        Err(list_err) => {
                            warn!(tier = %tier, error = %list_err, "Could not list members of failed cohort");
                            snapshot.failures.push(CycleFailure::cohort(
                                tier.clone(),
                                FailureStage::LoadCohort,
                                format!("{}; member listing failed: {}", reason, list_err),
                            ));
                        }
                    }
                    unreadable.insert(tier);
                }
            }
        }

        for (tier, members) in pending {
            if let Some(blocker) = self.unreadable_neighbour(&tier, &unreadable) {
                warn!(tier = %tier, neighbour = %blocker, "Neighbouring tier unreadable; deferring cohort");
                let reason = format!("neighbouring tier {} could not be read", blocker);
                snapshot.failures.extend(members.iter().map(|m| {
                    CycleFailure::member(m.user_id, tier.clone(), FailureStage::LoadCohort, reason.clone())
                }));
                continue;
            }

            let closed = settled.remove(&tier).unwrap_or_default();
            if !closed.is_empty() {
                info!(tier = %tier, pending = members.len(), settled = closed.len(), "Resuming partially closed cohort");
            }
            snapshot.cohorts.push(Cohort::with_settled(tier, members, closed));
        }

        info!(
            cycle = %closing_cycle,
            cohorts = snapshot.cohorts.len(),
            members = snapshot.member_count(),
            already_closed = snapshot.already_closed,
            load_failures = snapshot.failures.len(),
            "League snapshot taken"
        );

        snapshot
    }

    /// Sort one cohort's raw records into members this close owns and
    /// members it already settled
    fn admit(
        &self,
        tier: &TierName,
        records: Vec<MembershipRecord>,
        closing_cycle: CycleAnchor,
        seen: &mut HashSet<UserId>,
        already_closed: &mut usize,
    ) -> Admitted {
        let mut admitted = Admitted::default();

        for record in records {
            if &record.tier != tier {
                warn!(user_id = %record.user_id, requested = %tier, actual = %record.tier, "Record moved tiers during load; dropped from cohort");
                continue;
            }
            if !seen.insert(record.user_id) {
                warn!(user_id = %record.user_id, tier = %tier, "Member already seen in another cohort; dropped");
                continue;
            }
            if record.cycle.id > closing_cycle.id {
                *already_closed += 1;
                if let Some(view) = settled_view(&record, closing_cycle) {
                    admitted.settled.push(view);
                }
                continue;
            }
            admitted.pending.push(record);
        }

        admitted
    }

    /// A ladder neighbour of `tier` whose cohort could not be read
    fn unreadable_neighbour<'t>(&self, tier: &TierName, unreadable: &'t BTreeSet<TierName>) -> Option<&'t TierName> {
        [self.ladder.previous_tier(tier), self.ladder.next_tier(tier)]
            .into_iter()
            .flatten()
            .find_map(|n| unreadable.get(n))
    }
}
