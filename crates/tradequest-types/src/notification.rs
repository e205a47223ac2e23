//! Notifications emitted to members at cycle close

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;
use crate::{NotificationId, UserId};

/// Kind of league notification, in descending priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Finished first in the cohort
    Champion,
    /// Finished in the top three
    Podium,
    /// Moved up a tier
    Promotion,
    /// Moved down a tier
    Demotion,
    /// Generic monthly results
    MonthlyResults,
}

impl NotificationKind {
    /// Stable storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Champion => "champion",
            Self::Podium => "podium",
            Self::Promotion => "promotion",
            Self::Demotion => "demotion",
            Self::MonthlyResults => "monthly_results",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "champion" => Ok(Self::Champion),
            "podium" => Ok(Self::Podium),
            "promotion" => Ok(Self::Promotion),
            "demotion" => Ok(Self::Demotion),
            "monthly_results" => Ok(Self::MonthlyResults),
            other => Err(TypesError::UnknownNotificationKind(other.to_string())),
        }
    }
}

/// A notification queued for delivery to a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// In-app route opened when the notification is tapped
    pub deep_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a notification
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        deep_link: Option<String>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            kind,
            title: title.into(),
            body: body.into(),
            deep_link,
            created_at: Utc::now(),
        }
    }
}
