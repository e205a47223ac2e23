//! # Tier Ladder
//!
//! The fixed, ordered list of league tiers from lowest to highest. All
//! "is this tier above that one" questions go through the ladder so that
//! index lookups are not scattered through the engine.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{LeagueError, LeagueResult};
use tradequest_types::TierName;

/// Default tiers, lowest first
pub const DEFAULT_TIERS: [&str; 8] = [
    "Bronze",
    "Silver",
    "Gold",
    "Platinum",
    "Diamond",
    "Master",
    "Grandmaster",
    "Champion",
];

/// Ordered tier ladder with O(1) neighbour lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TierName>", into = "Vec<TierName>")]
pub struct TierLadder {
    tiers: Vec<TierName>,
    index: HashMap<TierName, usize>,
}

impl TierLadder {
    /// Build a ladder from tiers ordered lowest first.
    ///
    /// Fails when the list is empty or names a tier twice.
    pub fn new(tiers: Vec<TierName>) -> LeagueResult<Self> {
        if tiers.is_empty() {
            return Err(LeagueError::InvalidLadder("ladder has no tiers".to_string()));
        }

        let mut index = HashMap::with_capacity(tiers.len());
        for (i, tier) in tiers.iter().enumerate() {
            if tier.as_str().trim().is_empty() {
                return Err(LeagueError::InvalidLadder(format!("tier at position {} has an empty name", i)));
            }
            if index.insert(tier.clone(), i).is_some() {
                return Err(LeagueError::InvalidLadder(format!("duplicate tier '{}'", tier)));
            }
        }

        Ok(Self { tiers, index })
    }

    /// Build a ladder from plain names
    pub fn from_names<I, S>(names: I) -> LeagueResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|n| TierName::new(n)).collect())
    }

    /// Position of a tier, 0 = lowest
    pub fn index_of(&self, tier: &TierName) -> Option<usize> {
        self.index.get(tier).copied()
    }

    /// Whether the ladder knows this tier
    pub fn contains(&self, tier: &TierName) -> bool {
        self.index.contains_key(tier)
    }

    /// Tier directly above, `None` at the top or for unknown tiers
    pub fn next_tier(&self, tier: &TierName) -> Option<&TierName> {
        self.index_of(tier).and_then(|i| self.tiers.get(i + 1))
    }

    /// Tier directly below, `None` at the bottom or for unknown tiers
    pub fn previous_tier(&self, tier: &TierName) -> Option<&TierName> {
        self.index_of(tier)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.tiers.get(i))
    }

    /// Tier new members join at
    pub fn lowest(&self) -> &TierName {
        // Non-empty by construction.
        &self.tiers[0]
    }

    /// Top of the ladder
    pub fn highest(&self) -> &TierName {
        &self.tiers[self.tiers.len() - 1]
    }

    /// Compare two tiers by ladder position
    pub fn compare(&self, a: &TierName, b: &TierName) -> LeagueResult<Ordering> {
        let ia = self.index_of(a).ok_or_else(|| LeagueError::UnknownTier(a.clone()))?;
        let ib = self.index_of(b).ok_or_else(|| LeagueError::UnknownTier(b.clone()))?;
        Ok(ia.cmp(&ib))
    }

    /// The higher-ranked of two tiers
    pub fn higher_of<'a>(&self, a: &'a TierName, b: &'a TierName) -> LeagueResult<&'a TierName> {
        Ok(match self.compare(a, b)? {
            Ordering::Less => b,
            _ => a,
        })
    }

    /// Number of tiers
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Always false for a constructed ladder
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Tiers, lowest first
    pub fn iter(&self) -> impl Iterator<Item = &TierName> {
        self.tiers.iter()
    }
}

impl Default for TierLadder {
    fn default() -> Self {
        let tiers = DEFAULT_TIERS.iter().map(|t| TierName::from(*t)).collect::<Vec<_>>();
        let index = tiers.iter().cloned().enumerate().map(|(i, t)| (t, i)).collect();
        Self { tiers, index }
    }
}

impl TryFrom<Vec<TierName>> for TierLadder {
    type Error = LeagueError;

    fn try_from(tiers: Vec<TierName>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<TierLadder> for Vec<TierName> {
    fn from(ladder: TierLadder) -> Self {
        ladder.tiers
    }
}
