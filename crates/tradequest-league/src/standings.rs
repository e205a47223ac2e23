//! Live league table
//!
//! What a member sees between closes: their rank, their score, and the zone
//! they would land in if the cycle closed right now. Projections come from
//! the same classifier the close uses.

use serde::{Deserialize, Serialize};

use crate::config::CycleConfig;
use crate::snapshot::Cohort;
use crate::store::MembershipStore;
use crate::zone::{classify_zone, Zone};
use crate::LeagueResult;
use tradequest_types::{TierName, UserId};

/// One row of the league table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub period_score: u64,
    pub projected_zone: Zone,
    pub points_behind_leader: u64,
}

/// League table for a cohort
pub fn standings(cohort: &Cohort, config: &CycleConfig) -> LeagueResult<Vec<StandingEntry>> {
    let size = cohort.len();
    let leader = cohort.members().first().map(|m| m.period_score).unwrap_or(0);

    cohort
        .ranked()
        .map(|(rank, member)| {
            Ok(StandingEntry {
                rank,
                user_id: member.user_id,
                period_score: member.period_score,
                projected_zone: classify_zone(config, &cohort.tier, rank, size)?,
                points_behind_leader: leader.saturating_sub(member.period_score),
            })
        })
        .collect()
}

/// Read a tier's cohort from the store and rank it
pub async fn load_standings(
    store: &dyn MembershipStore,
    tier: &TierName,
    config: &CycleConfig,
) -> LeagueResult<Vec<StandingEntry>> {
    let mut records = store.load_cohort(tier).await?;
    records.retain(|r| &r.tier == tier);
    standings(&Cohort::new(tier.clone(), records), config)
}
