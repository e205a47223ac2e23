//! Per-member failure reports
//!
//! A cycle close never aborts on a single bad record. Every problem is turned
//! into a [`CycleFailure`] carrying enough context to retry or alert.

use serde::{Deserialize, Serialize};
use std::fmt;

use tradequest_types::{TierName, UserId};

/// Step of the cycle close that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Listing the tiers present in the store
    ListTiers,
    /// Loading a whole cohort
    LoadCohort,
    /// Computing a member's transition (configuration error)
    Transition,
    /// Writing the member's updated record
    UpdateRecord,
    /// Queueing the member's notification
    EnqueueNotification,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ListTiers => "list_tiers",
            Self::LoadCohort => "load_cohort",
            Self::Transition => "transition",
            Self::UpdateRecord => "update_record",
            Self::EnqueueNotification => "enqueue_notification",
        };
        f.write_str(name)
    }
}

/// One failure recorded during a cycle close
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleFailure {
    /// Affected member; `None` when the failure could not be attributed
    pub user_id: Option<UserId>,
    /// Cohort the member was in
    pub tier: Option<TierName>,
    pub stage: FailureStage,
    pub reason: String,
}

impl CycleFailure {
    /// Failure attributed to a member
    pub fn member(user_id: UserId, tier: TierName, stage: FailureStage, reason: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            tier: Some(tier),
            stage,
            reason: reason.into(),
        }
    }

    /// Failure affecting a whole cohort whose members could not be listed
    pub fn cohort(tier: TierName, stage: FailureStage, reason: impl Into<String>) -> Self {
        Self {
            user_id: None,
            tier: Some(tier),
            stage,
            reason: reason.into(),
        }
    }

    /// Failure affecting the whole run
    pub fn run(stage: FailureStage, reason: impl Into<String>) -> Self {
        Self {
            user_id: None,
            tier: None,
            stage,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.user_id, &self.tier) {
            (Some(user), Some(tier)) => write!(f, "[{}] {} in {}: {}", self.stage, user, tier, self.reason),
            (Some(user), None) => write!(f, "[{}] {}: {}", self.stage, user, self.reason),
            (None, Some(tier)) => write!(f, "[{}] cohort {}: {}", self.stage, tier, self.reason),
            (None, None) => write!(f, "[{}] {}", self.stage, self.reason),
        }
    }
}
