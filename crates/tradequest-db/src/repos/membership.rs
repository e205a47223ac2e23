//! League membership repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use crate::models::{to_sql_int, user_key};
use crate::{DbError, DbLeagueMembership, DbResult};
use tradequest_league::{MembershipStore, StoreResult};
use tradequest_types::{CycleAnchor, MembershipRecord, MembershipUpdate, TierName, UserId, UNRANKED};

#[derive(Clone)]
pub struct MembershipRepo {
    pool: SqlitePool,
}

impl MembershipRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Member Operations
    // =========================================================================

    /// Enrol a user at `tier` for `cycle`. Joining twice keeps the first row.
    pub async fn join(&self, user_id: &UserId, tier: &TierName, cycle: CycleAnchor) -> DbResult<MembershipRecord> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO league_memberships (user_id, tier, period_score, cohort_rank, highest_tier,
                cycle_id, joined_at, updated_at)
            VALUES (?1, ?2, 0, ?3, ?2, ?4, ?5, ?5)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_key(user_id))
        .bind(tier.as_str())
        .bind(i64::from(UNRANKED))
        .bind(cycle.id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find(user_id)
            .await?
            .ok_or_else(|| DbError::NotFound(user_id.to_string()))
    }

    pub async fn find(&self, user_id: &UserId) -> DbResult<Option<MembershipRecord>> {
        let row = sqlx::query_as::<_, DbLeagueMembership>("SELECT * FROM league_memberships WHERE user_id = ?1")
            .bind(user_key(user_id))
            .fetch_optional(&self.pool)
            .await?;
        row.map(MembershipRecord::try_from).transpose()
    }

    /// Add XP earned during the current cycle; returns the new score.
    /// Scores saturate instead of overflowing.
    pub async fn award_points(&self, user_id: &UserId, points: u64) -> DbResult<u64> {
        let score: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE league_memberships
            SET period_score = CASE
                    WHEN period_score > 9223372036854775807 - ?2 THEN 9223372036854775807
                    ELSE period_score + ?2
                END,
                updated_at = ?3
            WHERE user_id = ?1
            RETURNING period_score
            "#,
        )
        .bind(user_key(user_id))
        .bind(to_sql_int(points))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        let score = score.ok_or_else(|| DbError::NotFound(user_id.to_string()))?;
        u64::try_from(score).map_err(|_| DbError::CorruptRow(format!("negative score for {}", user_id)))
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM league_memberships")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Cohort Operations
    // =========================================================================

    pub async fn list_distinct_tiers(&self) -> DbResult<Vec<TierName>> {
        let tiers: Vec<String> = sqlx::query_scalar("SELECT DISTINCT tier FROM league_memberships ORDER BY tier")
            .fetch_all(&self.pool)
            .await?;
        Ok(tiers.into_iter().map(TierName::new).collect())
    }

    /// Every member of `tier`, best score first. Rows that cannot be decoded
    /// are logged and left out so the rest of the cohort can still close.
    pub async fn load_cohort(&self, tier: &TierName) -> DbResult<Vec<MembershipRecord>> {
        let rows = sqlx::query_as::<_, DbLeagueMembership>(
            "SELECT * FROM league_memberships WHERE tier = ?1 ORDER BY period_score DESC, user_id ASC",
        )
        .bind(tier.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let user_id = row.user_id.clone();
            match MembershipRecord::try_from(row) {
                Ok(record) => records.push(record),
                Err(e) => warn!(user_id = %user_id, tier = %tier, error = %e, "Skipping undecodable membership row"),
            }
        }
        Ok(records)
    }

    pub async fn member_ids_in_tier(&self, tier: &TierName) -> DbResult<Vec<UserId>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT user_id FROM league_memberships WHERE tier = ?1 ORDER BY user_id")
                .bind(tier.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(ids
            .iter()
            .filter_map(|id| match Uuid::parse_str(id) {
                Ok(uuid) => Some(UserId::from_uuid(uuid)),
                Err(e) => {
                    warn!(user_id = %id, tier = %tier, error = %e, "Skipping undecodable member id");
                    None
                }
            })
            .collect())
    }

    /// Write a cycle-close update. Only applies while the row is still at
    /// `update.expected_cycle_id`.
    pub async fn apply_update(&self, user_id: &UserId, update: &MembershipUpdate) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE league_memberships
            SET tier = ?3,
                period_score = ?4,
                cohort_rank = ?5,
                last_cycle_rank = ?6,
                highest_tier = ?7,
                total_promotions = ?8,
                total_demotions = ?9,
                total_top_three_finishes = ?10,
                total_first_place_finishes = ?11,
                total_cycles_participated = ?12,
                cycle_id = ?13,
                updated_at = ?14,
                last_cycle_tier = ?15,
                last_cycle_score = ?16
            WHERE user_id = ?1 AND cycle_id = ?2
            "#,
        )
        .bind(user_key(user_id))
        .bind(update.expected_cycle_id)
        .bind(update.tier.as_str())
        .bind(to_sql_int(update.period_score))
        .bind(i64::from(update.cohort_rank))
        .bind(update.last_cycle_rank.map(i64::from))
        .bind(update.highest_tier.as_str())
        .bind(i64::from(update.counters.total_promotions))
        .bind(i64::from(update.counters.total_demotions))
        .bind(i64::from(update.counters.total_top_three_finishes))
        .bind(i64::from(update.counters.total_first_place_finishes))
        .bind(i64::from(update.counters.total_cycles_participated))
        .bind(update.cycle.id)
        .bind(Utc::now())
        .bind(update.last_cycle_tier.as_str())
        .bind(to_sql_int(update.last_cycle_score))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.find(user_id).await? {
            Some(current) => Err(DbError::Conflict(format!(
                "{} is at cycle {}, expected {}",
                user_id, current.cycle.id, update.expected_cycle_id
            ))),
            None => Err(DbError::NotFound(user_id.to_string())),
        }
    }
}

#[async_trait]
impl MembershipStore for MembershipRepo {
    async fn list_distinct_tiers(&self) -> StoreResult<Vec<TierName>> {
        Ok(MembershipRepo::list_distinct_tiers(self).await?)
    }

    async fn load_cohort(&self, tier: &TierName) -> StoreResult<Vec<MembershipRecord>> {
        Ok(MembershipRepo::load_cohort(self, tier).await?)
    }

    async fn cohort_member_ids(&self, tier: &TierName) -> StoreResult<Vec<UserId>> {
        Ok(self.member_ids_in_tier(tier).await?)
    }

    async fn update_record(&self, user_id: &UserId, update: &MembershipUpdate) -> StoreResult<()> {
        Ok(self.apply_update(user_id, update).await?)
    }
}
