//! Notification outbox repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::user_key;
use crate::{DbNotification, DbResult};
use tradequest_league::{NotificationSink, StoreResult};
use tradequest_types::{Notification, NotificationId, UserId};

#[derive(Clone)]
pub struct NotificationRepo {
    pool: SqlitePool,
}

impl NotificationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, notification: &Notification) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, body, deep_link, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(notification.id.as_uuid().to_string())
        .bind(user_key(&notification.user_id))
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.deep_link)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent notifications for a user
    pub async fn list_for_user(&self, user_id: &UserId, limit: i64) -> DbResult<Vec<DbNotification>> {
        let rows = sqlx::query_as::<_, DbNotification>(
            "SELECT * FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )
        .bind(user_key(user_id))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_for_user(&self, user_id: &UserId, unread_only: bool) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND (?2 = 0 OR read_at IS NULL)",
        )
        .bind(user_key(user_id))
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Mark a notification read. Returns false if it was unknown or already read.
    pub async fn mark_read(&self, id: &NotificationId) -> DbResult<bool> {
        let result = sqlx::query("UPDATE notifications SET read_at = ?2 WHERE id = ?1 AND read_at IS NULL")
            .bind(id.as_uuid().to_string())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NotificationSink for NotificationRepo {
    async fn enqueue(&self, notification: &Notification) -> StoreResult<()> {
        Ok(NotificationRepo::enqueue(self, notification).await?)
    }
}
