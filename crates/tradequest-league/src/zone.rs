//! # Zone Classifier
//!
//! Decides whether a rank within a cohort lands in the promotion zone, the
//! demotion zone, or neither. Promotion is checked first, so in cohorts small
//! enough for the two zones to overlap, the overlapping ranks are promoted.

use serde::{Deserialize, Serialize};

use crate::config::CycleConfig;
use crate::{LeagueError, LeagueResult};
use tradequest_types::TierName;

/// Outcome zone for one member at cycle close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Promotion,
    Demotion,
    Safe,
}

impl Zone {
    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Promotion => "Promotion zone",
            Self::Demotion => "Demotion zone",
            Self::Safe => "Safe",
        }
    }
}

/// Classify a 1-based `rank` in a cohort of `cohort_size` members of `tier`.
///
/// Members at the top of the ladder cannot be promoted and members at the
/// bottom cannot be demoted; both stay `Safe`. Cohorts no larger than the
/// demotion zone never demote anyone.
pub fn classify_zone(
    config: &CycleConfig,
    tier: &TierName,
    rank: usize,
    cohort_size: usize,
) -> LeagueResult<Zone> {
    if !config.ladder.contains(tier) {
        return Err(LeagueError::UnknownTier(tier.clone()));
    }

    if rank <= config.promotion_zone {
        return Ok(if config.ladder.next_tier(tier).is_some() {
            Zone::Promotion
        } else {
            Zone::Safe
        });
    }

    if cohort_size > config.demotion_zone && rank > cohort_size - config.demotion_zone {
        return Ok(if config.ladder.previous_tier(tier).is_some() {
            Zone::Demotion
        } else {
            Zone::Safe
        });
    }

    Ok(Zone::Safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CycleConfig {
        CycleConfig::default().with_zones(10, 5)
    }

    fn gold() -> TierName {
        TierName::from("Gold")
    }

    #[test]
    fn test_promotion_boundary_in_large_cohort() {
        let config = config();
        assert_eq!(classify_zone(&config, &gold(), 10, 50).unwrap(), Zone::Promotion);
        assert_eq!(classify_zone(&config, &gold(), 11, 50).unwrap(), Zone::Safe);
        assert_eq!(classify_zone(&config, &gold(), 45, 50).unwrap(), Zone::Safe);
        assert_eq!(classify_zone(&config, &gold(), 46, 50).unwrap(), Zone::Demotion);
        assert_eq!(classify_zone(&config, &gold(), 50, 50).unwrap(), Zone::Demotion);
    }

    #[test]
    fn test_promotion_wins_over_demotion_when_zones_overlap() {
        let config = config();
        // Cohort of 12: demotion zone is ranks 8-12, promotion zone 1-10.
        for rank in 8..=10 {
            assert_eq!(classify_zone(&config, &gold(), rank, 12).unwrap(), Zone::Promotion);
        }
        assert_eq!(classify_zone(&config, &gold(), 11, 12).unwrap(), Zone::Demotion);
        assert_eq!(classify_zone(&config, &gold(), 12, 12).unwrap(), Zone::Demotion);
    }

    #[test]
    fn test_small_cohort_never_demotes() {
        let config = config().with_zones(1, 5);
        for rank in 1..=5 {
            assert_ne!(classify_zone(&config, &gold(), rank, 5).unwrap(), Zone::Demotion);
        }
        assert_eq!(classify_zone(&config, &gold(), 6, 6).unwrap(), Zone::Demotion);
    }

    #[test]
    fn test_ladder_edges_stay_safe() {
        let config = config();
        let top = config.ladder.highest().clone();
        let bottom = config.ladder.lowest().clone();
        assert_eq!(classify_zone(&config, &top, 1, 50).unwrap(), Zone::Safe);
        assert_eq!(classify_zone(&config, &bottom, 50, 50).unwrap(), Zone::Safe);
        assert_eq!(classify_zone(&config, &bottom, 1, 50).unwrap(), Zone::Promotion);
        assert_eq!(classify_zone(&config, &top, 50, 50).unwrap(), Zone::Demotion);
    }

    #[test]
    fn test_unknown_tier_is_an_error() {
        let result = classify_zone(&config(), &TierName::from("Wood"), 1, 10);
        assert!(matches!(result, Err(LeagueError::UnknownTier(_))));
    }
}
