//! League membership records
//!
//! One record exists per user. It is created when the user first joins the
//! league system, mutated continuously during a cycle by XP awards (which only
//! touch `period_score`), and rewritten once per cycle close.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CycleAnchor, TierName, UserId};

/// Cohort rank placeholder used between cycle closes.
///
/// Ranks are only meaningful at the moment a cycle closes; in between, the
/// stored rank is this worst-case value.
pub const UNRANKED: u32 = 999;

/// Lifetime counters carried across cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeCounters {
    /// Number of cycle closes that moved the member up a tier
    pub total_promotions: u32,
    /// Number of cycle closes that moved the member down a tier
    pub total_demotions: u32,
    /// Number of cycles finished at rank 1-3
    pub total_top_three_finishes: u32,
    /// Number of cycles finished at rank 1
    pub total_first_place_finishes: u32,
    /// Number of cycle closes the member took part in
    pub total_cycles_participated: u32,
}

/// A member's league state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    /// Member
    pub user_id: UserId,
    /// Tier the member currently competes in
    pub tier: TierName,
    /// Points accumulated during the current cycle
    pub period_score: u64,
    /// Rank within the cohort; `UNRANKED` between closes
    pub cohort_rank: u32,
    /// Final rank of the most recently closed cycle
    pub last_cycle_rank: Option<u32>,
    /// Tier the member competed in during the most recently closed cycle
    #[serde(default)]
    pub last_cycle_tier: Option<TierName>,
    /// Final score of the most recently closed cycle
    #[serde(default)]
    pub last_cycle_score: Option<u64>,
    /// Highest tier ever reached; never decreases
    pub highest_tier: TierName,
    /// Lifetime counters
    pub counters: LifetimeCounters,
    /// Cycle the current `period_score` belongs to
    pub cycle: CycleAnchor,
    /// When the member joined
    pub joined_at: DateTime<Utc>,
    /// Last write
    pub updated_at: DateTime<Utc>,
}

impl MembershipRecord {
    /// Initial record for a user joining at `lowest_tier` during `cycle`
    pub fn join(user_id: UserId, lowest_tier: TierName, cycle: CycleAnchor) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            tier: lowest_tier.clone(),
            period_score: 0,
            cohort_rank: UNRANKED,
            last_cycle_rank: None,
            last_cycle_tier: None,
            last_cycle_score: None,
            highest_tier: lowest_tier,
            counters: LifetimeCounters::default(),
            cycle,
            joined_at: now,
            updated_at: now,
        }
    }

    /// Add points earned during the current cycle
    pub fn award_points(&mut self, points: u64) {
        self.period_score = self.period_score.saturating_add(points);
        self.updated_at = Utc::now();
    }

    /// Apply a cycle-close update to this record
    pub fn apply(&mut self, update: &MembershipUpdate) {
        self.tier = update.tier.clone();
        self.period_score = update.period_score;
        self.cohort_rank = update.cohort_rank;
        self.last_cycle_rank = update.last_cycle_rank;
        self.last_cycle_tier = Some(update.last_cycle_tier.clone());
        self.last_cycle_score = Some(update.last_cycle_score);
        self.highest_tier = update.highest_tier.clone();
        self.counters = update.counters;
        self.cycle = update.cycle;
        self.updated_at = Utc::now();
    }
}

/// Fields written back to a membership record at cycle close
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipUpdate {
    /// Cycle id observed when the snapshot was taken. The write only applies
    /// while the stored record still carries this cycle id.
    pub expected_cycle_id: i64,
    /// Tier for the next cycle
    pub tier: TierName,
    /// Score for the next cycle (always 0)
    pub period_score: u64,
    /// Rank placeholder for the next cycle
    pub cohort_rank: u32,
    /// Final rank of the cycle just closed
    pub last_cycle_rank: Option<u32>,
    /// Tier the member closed the cycle in
    pub last_cycle_tier: TierName,
    /// Score the member closed the cycle with
    pub last_cycle_score: u64,
    /// Highest tier reached, including this close
    pub highest_tier: TierName,
    /// Counters including this close
    pub counters: LifetimeCounters,
    /// Anchor of the next cycle
    pub cycle: CycleAnchor,
}
