use shared::{MarkReadRequest, MarkReadResponse, Notification, NotificationListResponse};
use sqlx::Row;
use tracing::info;

use crate::clock::SharedClock;
use crate::db::DbConnection;
use crate::domain::models::{new_id, NotificationKind};
use crate::error::{DomainError, DomainResult};

/// Append-only per-child message feed. Rows are never mutated after insert
/// except for the read flag.
#[derive(Clone)]
pub struct NotificationService {
    db: DbConnection,
    clock: SharedClock,
}

impl NotificationService {
    pub fn new(db: DbConnection, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    /// Append one notification to a child's feed.
    pub async fn notify(
        &self,
        child_id: &str,
        kind: NotificationKind,
        message: &str,
    ) -> DomainResult<()> {
        let id = new_id("N_");
        sqlx::query(
            "INSERT INTO notifications (id, child_id, message, type, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(child_id)
        .bind(message)
        .bind(kind.as_str())
        .bind(self.clock.now().to_rfc3339())
        .execute(self.db.pool())
        .await?;

        info!("Notification {} ({}) for child {}", id, kind.as_str(), child_id);
        Ok(())
    }

    /// Newest-first feed for one child, optionally unread-only.
    pub async fn list(
        &self,
        child_id: &str,
        limit: Option<u32>,
        unread_only: bool,
    ) -> DomainResult<NotificationListResponse> {
        let limit = limit.unwrap_or(20).min(100);

        let query = if unread_only {
            "SELECT id, message, type, read, created_at FROM notifications \
             WHERE child_id = ? AND read = 0 ORDER BY created_at DESC, id DESC LIMIT ?"
        } else {
            "SELECT id, message, type, read, created_at FROM notifications \
             WHERE child_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
        };

        let rows = sqlx::query(query)
            .bind(child_id)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await?;

        let notifications = rows
            .iter()
            .map(|row| Notification {
                id: row.get("id"),
                message: row.get("message"),
                kind: row.get("type"),
                read: row.get("read"),
                created_at: row.get("created_at"),
            })
            .collect();

        let unread_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE child_id = ? AND read = 0")
                .bind(child_id)
                .fetch_one(self.db.pool())
                .await?;

        Ok(NotificationListResponse {
            notifications,
            unread_count,
        })
    }

    /// Mark the given ids (scoped to the child) or the whole feed as read.
    pub async fn mark_read(
        &self,
        child_id: &str,
        request: MarkReadRequest,
    ) -> DomainResult<MarkReadResponse> {
        if request.mark_all {
            let result =
                sqlx::query("UPDATE notifications SET read = 1 WHERE child_id = ? AND read = 0")
                    .bind(child_id)
                    .execute(self.db.pool())
                    .await?;
            return Ok(MarkReadResponse {
                marked: result.rows_affected(),
            });
        }

        if request.ids.is_empty() {
            return Err(DomainError::InvalidInput(
                "Notification ids are required".to_string(),
            ));
        }

        let placeholders = vec!["?"; request.ids.len()].join(", ");
        let sql = format!(
            "UPDATE notifications SET read = 1 WHERE child_id = ? AND id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(child_id);
        for id in &request.ids {
            query = query.bind(id);
        }
        let result = query.execute(self.db.pool()).await?;

        Ok(MarkReadResponse {
            marked: result.rows_affected(),
        })
    }
}
