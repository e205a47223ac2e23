//! # Transition Calculator
//!
//! Turns a frozen cohort into per-member outcomes: the member's rank, zone,
//! next tier, updated lifetime counters, the record update to write back,
//! and the single notification they receive.
//!
//! Planning is a pure function of `(snapshot, config)`. Running it twice on
//! the same snapshot yields the same transitions.
//!
//! ## Notification priority
//!
//! Exactly one notification per member, the first that applies:
//!
//! 1. First place: champion message
//! 2. Top three: podium message
//! 3. Promoted: promotion message naming the new tier
//! 4. Demoted: demotion message naming the new tier
//! 5. Otherwise: monthly results with the member's rank

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CycleConfig;
use crate::failure::{CycleFailure, FailureStage};
use crate::snapshot::{Cohort, Snapshot};
use crate::zone::{classify_zone, Zone};
use crate::{LeagueError, LeagueResult};
use tradequest_types::{
    CycleAnchor, LifetimeCounters, MembershipRecord, MembershipUpdate, Notification,
    NotificationKind, TierName, UserId, UNRANKED,
};

// ============================================================================
// Transition
// ============================================================================

/// Computed outcome for one member at cycle close
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub user_id: UserId,
    pub previous_tier: TierName,
    pub new_tier: TierName,
    pub zone: Zone,
    /// 1-based rank within the cohort
    pub rank: usize,
    pub cohort_size: usize,
    pub period_score: u64,
    pub was_promoted: bool,
    pub was_demoted: bool,
    pub is_top_three: bool,
    pub is_first_place: bool,
}

impl Transition {
    /// Notification kind this transition earns
    pub fn notification_kind(&self) -> NotificationKind {
        if self.is_first_place {
            NotificationKind::Champion
        } else if self.is_top_three {
            NotificationKind::Podium
        } else if self.was_promoted {
            NotificationKind::Promotion
        } else if self.was_demoted {
            NotificationKind::Demotion
        } else {
            NotificationKind::MonthlyResults
        }
    }
}

/// Everything the committer needs for one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedUpdate {
    pub transition: Transition,
    pub update: MembershipUpdate,
    pub notification: Notification,
}

/// Plan for one cohort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortPlan {
    pub tier: TierName,
    pub cohort_size: usize,
    /// Members whose transition could be computed, in rank order
    pub updates: Vec<PlannedUpdate>,
    /// Members left unchanged because their transition could not be computed
    pub failures: Vec<CycleFailure>,
}

impl CohortPlan {
    pub fn promotions(&self) -> usize {
        self.updates.iter().filter(|u| u.transition.was_promoted).count()
    }

    pub fn demotions(&self) -> usize {
        self.updates.iter().filter(|u| u.transition.was_demoted).count()
    }
}

/// Plan for a whole cycle close
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclePlan {
    pub closing_cycle: CycleAnchor,
    pub next_cycle: CycleAnchor,
    pub cohorts: Vec<CohortPlan>,
    /// Failures carried over from the snapshot (unreadable cohorts)
    pub load_failures: Vec<CycleFailure>,
    pub already_closed: usize,
}

impl CyclePlan {
    /// All transitions, cohort by cohort in rank order
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.cohorts
            .iter()
            .flat_map(|c| c.updates.iter().map(|u| &u.transition))
    }

    /// All notifications that would be queued
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.cohorts
            .iter()
            .flat_map(|c| c.updates.iter().map(|u| &u.notification))
    }

    /// Load and transition failures
    pub fn failures(&self) -> impl Iterator<Item = &CycleFailure> {
        self.load_failures
            .iter()
            .chain(self.cohorts.iter().flat_map(|c| c.failures.iter()))
    }

    pub fn promotions(&self) -> usize {
        self.cohorts.iter().map(CohortPlan::promotions).sum()
    }

    pub fn demotions(&self) -> usize {
        self.cohorts.iter().map(CohortPlan::demotions).sum()
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Plan a whole cycle close from a snapshot
pub fn plan_cycle(snapshot: &Snapshot, config: &CycleConfig) -> LeagueResult<CyclePlan> {
    let next_cycle = snapshot.closing_cycle.next()?;

    let cohorts = snapshot
        .cohorts
        .iter()
        .map(|cohort| plan_cohort(cohort, config, next_cycle))
        .collect();

    Ok(CyclePlan {
        closing_cycle: snapshot.closing_cycle,
        next_cycle,
        cohorts,
        load_failures: snapshot.failures.clone(),
        already_closed: snapshot.already_closed,
    })
}

/// Plan one cohort. Members whose tier is not on the ladder are reported as
/// failures and left out of the updates; their siblings keep their ranks.
/// Settled members count towards ranks and cohort size but get no update.
pub fn plan_cohort(cohort: &Cohort, config: &CycleConfig, next_cycle: CycleAnchor) -> CohortPlan {
    let cohort_size = cohort.len();
    let mut updates = Vec::with_capacity(cohort.pending_len());
    let mut failures = Vec::new();

    for (rank, record) in cohort.ranked() {
        if cohort.is_settled(&record.user_id) {
            continue;
        }
        match plan_member(record, rank, cohort_size, config, next_cycle) {
            Ok(planned) => {
                debug!(
                    user_id = %record.user_id,
                    tier = %record.tier,
                    rank,
                    zone = ?planned.transition.zone,
                    new_tier = %planned.transition.new_tier,
                    "Planned transition"
                );
                updates.push(planned);
            }
            Err(e) => {
                warn!(user_id = %record.user_id, tier = %record.tier, error = %e, "Cannot compute transition; member left unchanged");
                failures.push(CycleFailure::member(
                    record.user_id,
                    record.tier.clone(),
                    FailureStage::Transition,
                    e.to_string(),
                ));
            }
        }
    }

    CohortPlan {
        tier: cohort.tier.clone(),
        cohort_size,
        updates,
        failures,
    }
}

/// Compute the transition, record update and notification for one member
pub fn plan_member(
    record: &MembershipRecord,
    rank: usize,
    cohort_size: usize,
    config: &CycleConfig,
    next_cycle: CycleAnchor,
) -> LeagueResult<PlannedUpdate> {
    let ladder = &config.ladder;
    let zone = classify_zone(config, &record.tier, rank, cohort_size)?;

    let new_tier = match zone {
        Zone::Promotion => ladder.next_tier(&record.tier),
        Zone::Demotion => ladder.previous_tier(&record.tier),
        Zone::Safe => None,
    }
    .unwrap_or(&record.tier)
    .clone();

    // A stale highest tier the ladder no longer knows is a configuration
    // error for this member, same as an unknown current tier.
    if !ladder.contains(&record.highest_tier) {
        return Err(LeagueError::UnknownTier(record.highest_tier.clone()));
    }
    let highest_tier = ladder.higher_of(&record.highest_tier, &new_tier)?.clone();

    let transition = Transition {
        user_id: record.user_id,
        previous_tier: record.tier.clone(),
        was_promoted: zone == Zone::Promotion,
        was_demoted: zone == Zone::Demotion,
        is_top_three: rank <= 3,
        is_first_place: rank == 1,
        new_tier,
        zone,
        rank,
        cohort_size,
        period_score: record.period_score,
    };

    let update = MembershipUpdate {
        expected_cycle_id: record.cycle.id,
        tier: transition.new_tier.clone(),
        period_score: 0,
        cohort_rank: UNRANKED,
        last_cycle_rank: Some(u32::try_from(rank).unwrap_or(u32::MAX)),
        last_cycle_tier: record.tier.clone(),
        last_cycle_score: record.period_score,
        highest_tier,
        counters: bump_counters(record.counters, &transition),
        cycle: next_cycle,
    };

    let notification = compose_notification(&transition, config);

    Ok(PlannedUpdate {
        transition,
        update,
        notification,
    })
}

fn bump_counters(counters: LifetimeCounters, t: &Transition) -> LifetimeCounters {
    let inc = |value: u32, cond: bool| if cond { value.saturating_add(1) } else { value };
    LifetimeCounters {
        total_promotions: inc(counters.total_promotions, t.was_promoted),
        total_demotions: inc(counters.total_demotions, t.was_demoted),
        total_top_three_finishes: inc(counters.total_top_three_finishes, t.is_top_three),
        total_first_place_finishes: inc(counters.total_first_place_finishes, t.is_first_place),
        total_cycles_participated: inc(counters.total_cycles_participated, true),
    }
}

// ============================================================================
// Notification content
// ============================================================================

/// Build the single notification a member receives for this close
pub fn compose_notification(t: &Transition, config: &CycleConfig) -> Notification {
    let kind = t.notification_kind();
    let moved = if t.was_promoted {
        format!(" You've been promoted to the {} League.", t.new_tier)
    } else {
        String::new()
    };

    let (title, body) = match kind {
        NotificationKind::Champion => (
            format!("{} League Champion!", t.previous_tier),
            format!(
                "You finished #1 of {} traders in the {} League this month.{}",
                t.cohort_size, t.previous_tier, moved
            ),
        ),
        NotificationKind::Podium => (
            "Podium finish!".to_string(),
            format!(
                "You finished #{} of {} in the {} League this month.{}",
                t.rank, t.cohort_size, t.previous_tier, moved
            ),
        ),
        NotificationKind::Promotion => (
            format!("Promoted to {}!", t.new_tier),
            format!(
                "You finished #{} in the {} League and move up to the {} League.",
                t.rank, t.previous_tier, t.new_tier
            ),
        ),
        NotificationKind::Demotion => (
            format!("Moved to the {} League", t.new_tier),
            format!(
                "You finished #{} of {} in the {} League. Keep trading to climb back up from the {} League.",
                t.rank, t.cohort_size, t.previous_tier, t.new_tier
            ),
        ),
        NotificationKind::MonthlyResults => (
            "Monthly league results".to_string(),
            format!(
                "You finished #{} of {} in the {} League. A new season starts now.",
                t.rank, t.cohort_size, t.previous_tier
            ),
        ),
    };

    Notification::new(t.user_id, kind, title, body, config.deep_link.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn cycle() -> CycleAnchor {
        CycleAnchor::from_id(2026 * 12 + 9).unwrap()
    }

    fn member(n: u128, tier: &str, score: u64) -> MembershipRecord {
        let mut r = MembershipRecord::join(UserId::from_uuid(Uuid::from_u128(n)), TierName::from(tier), cycle());
        r.period_score = score;
        r
    }

    fn gold_cohort(size: u128) -> Cohort {
        Cohort::new(
            TierName::from("Gold"),
            (1..=size).map(|n| member(n, "Gold", 1_000 - n as u64)).collect(),
        )
    }

    #[test]
    fn test_twelve_member_gold_cohort() {
        let config = CycleConfig::default().with_zones(10, 5);
        let plan = plan_cohort(&gold_cohort(12), &config, cycle().next().unwrap());

        assert!(plan.failures.is_empty());
        assert_eq!(plan.updates.len(), 12);

        for planned in &plan.updates[..10] {
            assert_eq!(planned.transition.new_tier, TierName::from("Platinum"));
            assert!(planned.transition.was_promoted);
        }
        for planned in &plan.updates[10..] {
            assert_eq!(planned.transition.new_tier, TierName::from("Silver"));
            assert!(planned.transition.was_demoted);
        }

        let first = &plan.updates[0];
        assert!(first.transition.is_first_place);
        assert_eq!(first.notification.kind, NotificationKind::Champion);
        assert_eq!(plan.promotions(), 10);
        assert_eq!(plan.demotions(), 2);
    }

    #[test]
    fn test_update_resets_cycle_state() {
        let config = CycleConfig::default();
        let next = cycle().next().unwrap();
        let plan = plan_cohort(&gold_cohort(3), &config, next);

        for (i, planned) in plan.updates.iter().enumerate() {
            assert_eq!(planned.update.period_score, 0);
            assert_eq!(planned.update.cohort_rank, UNRANKED);
            assert_eq!(planned.update.last_cycle_rank, Some(i as u32 + 1));
            assert_eq!(planned.update.cycle, next);
            assert_eq!(planned.update.expected_cycle_id, cycle().id);
            assert_eq!(planned.update.counters.total_cycles_participated, 1);
        }
    }

    #[test]
    fn test_counters_follow_outcome() {
        let config = CycleConfig::default().with_zones(1, 1);
        let plan = plan_cohort(&gold_cohort(4), &config, cycle().next().unwrap());

        let first = &plan.updates[0].update.counters;
        assert_eq!(first.total_promotions, 1);
        assert_eq!(first.total_first_place_finishes, 1);
        assert_eq!(first.total_top_three_finishes, 1);

        let third = &plan.updates[2].update.counters;
        assert_eq!(third.total_promotions, 0);
        assert_eq!(third.total_top_three_finishes, 1);
        assert_eq!(third.total_first_place_finishes, 0);

        let last = &plan.updates[3].update.counters;
        assert_eq!(last.total_demotions, 1);
        assert_eq!(last.total_top_three_finishes, 0);
    }

    #[test]
    fn test_highest_tier_never_regresses() {
        let config = CycleConfig::default().with_zones(0, 1);
        let mut record = member(1, "Gold", 0);
        record.highest_tier = TierName::from("Diamond");
        let cohort = Cohort::new(TierName::from("Gold"), vec![member(2, "Gold", 10), record]);

        let plan = plan_cohort(&cohort, &config, cycle().next().unwrap());
        let demoted = &plan.updates[1];
        assert_eq!(demoted.transition.new_tier, TierName::from("Silver"));
        assert_eq!(demoted.update.highest_tier, TierName::from("Diamond"));
    }

    #[test]
    fn test_highest_tier_raised_on_promotion() {
        let config = CycleConfig::default();
        let plan = plan_cohort(&gold_cohort(1), &config, cycle().next().unwrap());
        assert_eq!(plan.updates[0].update.highest_tier, TierName::from("Platinum"));
    }

    #[test]
    fn test_top_of_ladder_stays_put() {
        let config = CycleConfig::default();
        let top = config.ladder.highest().to_string();
        let cohort = Cohort::new(TierName::from(top.as_str()), vec![member(1, &top, 10)]);

        let plan = plan_cohort(&cohort, &config, cycle().next().unwrap());
        let t = &plan.updates[0].transition;
        assert_eq!(t.new_tier, TierName::from(top.as_str()));
        assert!(!t.was_promoted);
        assert_eq!(plan.updates[0].update.counters.total_promotions, 0);
        assert_eq!(plan.updates[0].notification.kind, NotificationKind::Champion);
    }

    #[test]
    fn test_notification_priority() {
        let config = CycleConfig::default().with_zones(5, 2);
        let plan = plan_cohort(&gold_cohort(10), &config, cycle().next().unwrap());
        let kinds: Vec<NotificationKind> = plan.updates.iter().map(|u| u.notification.kind).collect();

        assert_eq!(
            kinds,
            vec![
                NotificationKind::Champion,
                NotificationKind::Podium,
                NotificationKind::Podium,
                NotificationKind::Promotion,
                NotificationKind::Promotion,
                NotificationKind::MonthlyResults,
                NotificationKind::MonthlyResults,
                NotificationKind::MonthlyResults,
                NotificationKind::Demotion,
                NotificationKind::Demotion,
            ]
        );

        let promoted = &plan.updates[3].notification;
        assert!(promoted.title.contains("Platinum"));
        assert_eq!(promoted.deep_link.as_deref(), Some("/leagues"));

        let demoted = &plan.updates[9].notification;
        assert!(demoted.body.contains("Silver"));

        let generic = &plan.updates[5].notification;
        assert!(generic.body.contains("#6 of 10"));
    }

    #[test]
    fn test_unknown_tier_fails_only_that_member() {
        let config = CycleConfig::default();
        let mut stale = member(2, "Gold", 50);
        stale.highest_tier = TierName::from("Obsidian");
        let cohort = Cohort::new(TierName::from("Gold"), vec![member(1, "Gold", 100), stale, member(3, "Gold", 10)]);

        let plan = plan_cohort(&cohort, &config, cycle().next().unwrap());
        assert_eq!(plan.updates.len(), 2);
        assert_eq!(plan.failures.len(), 1);
        assert_eq!(plan.failures[0].stage, FailureStage::Transition);

        // Siblings keep the ranks they hold in the full cohort.
        assert_eq!(plan.updates[1].transition.rank, 3);
    }

    #[test]
    fn test_replanning_is_deterministic() {
        let config = CycleConfig::default();
        let cohort = gold_cohort(15);
        let next = cycle().next().unwrap();

        let a = plan_cohort(&cohort, &config, next);
        let b = plan_cohort(&cohort, &config, next);
        let ta: Vec<_> = a.updates.iter().map(|u| (&u.transition, &u.update)).collect();
        let tb: Vec<_> = b.updates.iter().map(|u| (&u.transition, &u.update)).collect();
        assert_eq!(ta, tb);
    }

    #[test]
    fn test_settled_members_are_ranked_but_not_planned() {
        let config = CycleConfig::default().with_zones(10, 5);
        let members: Vec<MembershipRecord> = (1..=12).map(|n| member(n, "Gold", 1_000 - n as u64)).collect();
        let (closed, remaining) = members.split_at(11);
        let cohort = Cohort::with_settled(TierName::from("Gold"), remaining.to_vec(), closed.to_vec());

        let plan = plan_cohort(&cohort, &config, cycle().next().unwrap());
        assert_eq!(plan.cohort_size, 12);
        assert_eq!(plan.updates.len(), 1);

        let last = &plan.updates[0];
        assert_eq!(last.transition.rank, 12);
        assert_eq!(last.transition.new_tier, TierName::from("Silver"));
        assert_eq!(last.notification.kind, NotificationKind::Demotion);
        assert_eq!(last.update.last_cycle_tier, TierName::from("Gold"));
        assert_eq!(last.update.last_cycle_score, 988);
    }
}
