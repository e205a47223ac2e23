//! League tier names

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a league tier (a rung on the tier ladder).
///
/// Ordering between tiers is defined by the ladder, not by the name; the
/// derived `Ord` is alphabetical and only used for deterministic listing of
/// names the ladder does not know.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierName(String);

impl TierName {
    /// Create a tier name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TierName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TierName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for TierName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
