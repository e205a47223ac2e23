//! Database models (row types) and their conversion into domain values

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{DbError, DbResult};
use tradequest_types::{
    CycleAnchor, LifetimeCounters, MembershipRecord, Notification, NotificationId, NotificationKind, TierName,
    UserId,
};

// ============================================================================
// League Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbLeagueMembership {
    pub user_id: String,
    pub tier: String,
    pub period_score: i64,
    pub cohort_rank: i64,
    pub last_cycle_rank: Option<i64>,
    pub last_cycle_tier: Option<String>,
    pub last_cycle_score: Option<i64>,
    pub highest_tier: String,
    pub total_promotions: i64,
    pub total_demotions: i64,
    pub total_top_three_finishes: i64,
    pub total_first_place_finishes: i64,
    pub total_cycles_participated: i64,
    pub cycle_id: i64,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbLeagueMembership> for MembershipRecord {
    type Error = DbError;

    fn try_from(row: DbLeagueMembership) -> DbResult<Self> {
        Ok(MembershipRecord {
            user_id: UserId::from_uuid(Uuid::parse_str(&row.user_id)?),
            tier: TierName::new(row.tier),
            period_score: non_negative("period_score", row.period_score)?,
            cohort_rank: non_negative("cohort_rank", row.cohort_rank)?,
            last_cycle_rank: row
                .last_cycle_rank
                .map(|r| non_negative("last_cycle_rank", r))
                .transpose()?,
            last_cycle_tier: row.last_cycle_tier.map(TierName::new),
            last_cycle_score: row
                .last_cycle_score
                .map(|s| non_negative("last_cycle_score", s))
                .transpose()?,
            highest_tier: TierName::new(row.highest_tier),
            counters: LifetimeCounters {
                total_promotions: non_negative("total_promotions", row.total_promotions)?,
                total_demotions: non_negative("total_demotions", row.total_demotions)?,
                total_top_three_finishes: non_negative("total_top_three_finishes", row.total_top_three_finishes)?,
                total_first_place_finishes: non_negative("total_first_place_finishes", row.total_first_place_finishes)?,
                total_cycles_participated: non_negative("total_cycles_participated", row.total_cycles_participated)?,
            },
            cycle: CycleAnchor::from_id(row.cycle_id)?,
            joined_at: row.joined_at,
            updated_at: row.updated_at,
        })
    }
}

fn non_negative<T: TryFrom<i64>>(column: &str, value: i64) -> DbResult<T> {
    T::try_from(value).map_err(|_| DbError::CorruptRow(format!("{} out of range: {}", column, value)))
}

/// Stored form of a user id (hyphenated, lowercase; sorts like the uuid bytes)
pub(crate) fn user_key(user_id: &UserId) -> String {
    user_id.as_uuid().to_string()
}

/// Clamp an unsigned counter into an SQLite integer
pub(crate) fn to_sql_int<T: TryInto<i64>>(value: T) -> i64 {
    value.try_into().unwrap_or(i64::MAX)
}

// ============================================================================
// Notification Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbNotification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub deep_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl DbNotification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

impl TryFrom<DbNotification> for Notification {
    type Error = DbError;

    fn try_from(row: DbNotification) -> DbResult<Self> {
        Ok(Notification {
            id: NotificationId::from_uuid(Uuid::parse_str(&row.id)?),
            user_id: UserId::from_uuid(Uuid::parse_str(&row.user_id)?),
            kind: row.kind.parse::<NotificationKind>()?,
            title: row.title,
            body: row.body,
            deep_link: row.deep_link,
            created_at: row.created_at,
        })
    }
}
