//! Cycle configuration
//!
//! Every threshold used by the zone classifier and the transition calculator
//! lives here; nothing downstream hardcodes a zone size or a tier name.

use serde::{Deserialize, Serialize};

use crate::ladder::TierLadder;
use crate::{LeagueError, LeagueResult};

/// Default number of top ranks promoted each cycle
pub const DEFAULT_PROMOTION_ZONE: usize = 10;

/// Default number of bottom ranks demoted each cycle
pub const DEFAULT_DEMOTION_ZONE: usize = 5;

/// Default in-app route for league notifications
pub const DEFAULT_DEEP_LINK: &str = "/leagues";

/// League cycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Ordered tiers, lowest first
    #[serde(default)]
    pub ladder: TierLadder,
    /// Ranks `1..=promotion_zone` are promoted
    #[serde(default = "default_promotion_zone")]
    pub promotion_zone: usize,
    /// The last `demotion_zone` ranks are demoted, but only in cohorts larger
    /// than `demotion_zone`
    #[serde(default = "default_demotion_zone")]
    pub demotion_zone: usize,
    /// Route attached to every league notification
    #[serde(default = "default_deep_link")]
    pub deep_link: Option<String>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            ladder: TierLadder::default(),
            promotion_zone: DEFAULT_PROMOTION_ZONE,
            demotion_zone: DEFAULT_DEMOTION_ZONE,
            deep_link: default_deep_link(),
        }
    }
}

impl CycleConfig {
    /// Config with the given ladder and default zones
    pub fn with_ladder(ladder: TierLadder) -> Self {
        Self {
            ladder,
            ..Default::default()
        }
    }

    /// Override the zone sizes
    pub fn with_zones(mut self, promotion_zone: usize, demotion_zone: usize) -> Self {
        self.promotion_zone = promotion_zone;
        self.demotion_zone = demotion_zone;
        self
    }

    /// Override the notification deep link
    pub fn with_deep_link(mut self, deep_link: Option<String>) -> Self {
        self.deep_link = deep_link;
        self
    }

    /// Check the thresholds make sense together
    pub fn validate(&self) -> LeagueResult<()> {
        if self.promotion_zone == 0 && self.demotion_zone == 0 {
            return Err(LeagueError::InvalidConfig(
                "promotion_zone and demotion_zone are both 0; no member would ever move".to_string(),
            ));
        }
        if let Some(link) = &self.deep_link {
            if link.trim().is_empty() {
                return Err(LeagueError::InvalidConfig("deep_link is set but empty".to_string()));
            }
        }
        Ok(())
    }
}

fn default_promotion_zone() -> usize {
    DEFAULT_PROMOTION_ZONE
}

fn default_demotion_zone() -> usize {
    DEFAULT_DEMOTION_ZONE
}

fn default_deep_link() -> Option<String> {
    Some(DEFAULT_DEEP_LINK.to_string())
}
