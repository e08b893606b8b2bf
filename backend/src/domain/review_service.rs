use chrono::NaiveDate;
use shared::{ApprovalListResponse, PendingApproval, ReviewRequest, ReviewResponse};
use sqlx::Row;
use tracing::info;

use crate::clock::SharedClock;
use crate::db::DbConnection;
use crate::domain::models::{InstanceStatus, NotificationKind, ReviewAction};
use crate::domain::notification_service::NotificationService;
use crate::error::{DomainError, DomainResult};

/// Parent-side review of submitted check-ins.
#[derive(Clone)]
pub struct ReviewService {
    db: DbConnection,
    clock: SharedClock,
    notifications: NotificationService,
}

impl ReviewService {
    pub fn new(db: DbConnection, clock: SharedClock, notifications: NotificationService) -> Self {
        Self {
            db,
            clock,
            notifications,
        }
    }

    /// Submitted instances across the parent's children for one date
    /// (today when no date is given).
    pub async fn list_pending(
        &self,
        parent_id: &str,
        date: Option<NaiveDate>,
    ) -> DomainResult<ApprovalListResponse> {
        let date = date.unwrap_or_else(|| self.clock.today());

        let rows = sqlx::query(
            r#"
            SELECT
                ci.id,
                ci.status,
                ci.submitted_at,
                ci.notes,
                ch.id AS chore_id,
                ch.title AS chore_title,
                ch.points,
                ch.is_required,
                c.id AS child_id,
                c.display_name AS child_name
            FROM chore_instances ci
            JOIN chores ch ON ch.id = ci.chore_id
            JOIN children c ON c.id = ci.child_id
            WHERE ch.parent_id = ? AND ci.status = 'submitted' AND ci.date = ?
            ORDER BY c.display_name ASC, ch.is_required DESC, ch.title ASC
            "#,
        )
        .bind(parent_id)
        .bind(date.to_string())
        .fetch_all(self.db.pool())
        .await?;

        let approvals: Vec<PendingApproval> = rows
            .iter()
            .map(|row| PendingApproval {
                id: row.get("id"),
                chore_id: row.get("chore_id"),
                child_id: row.get("child_id"),
                date,
                status: row.get("status"),
                submitted_at: row.get("submitted_at"),
                notes: row.get("notes"),
                child_name: row.get("child_name"),
                chore_title: row.get("chore_title"),
                points: row.get("points"),
                is_required: row.get("is_required"),
            })
            .collect();

        Ok(ApprovalListResponse { date, approvals })
    }

    /// Apply a review verdict to one submitted instance.
    ///
    /// Only `submitted` rows can be reviewed; anything else is an invalid
    /// state, including a second verdict on the same instance. The owning
    /// child gets a notification describing the outcome.
    pub async fn review(
        &self,
        parent_id: &str,
        request: ReviewRequest,
    ) -> DomainResult<ReviewResponse> {
        let action = ReviewAction::parse(&request.action).ok_or_else(|| {
            DomainError::InvalidInput(format!(
                "Unknown review action '{}'; expected approved, rejected or excused",
                request.action
            ))
        })?;

        // Ownership check rides on the join: another parent's instance looks absent.
        let row = sqlx::query(
            r#"
            SELECT ci.status, ci.child_id, ch.title, ch.points
            FROM chore_instances ci
            JOIN chores ch ON ch.id = ci.chore_id
            WHERE ci.id = ? AND ch.parent_id = ?
            "#,
        )
        .bind(&request.instance_id)
        .bind(parent_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| DomainError::NotFound("Chore instance not found".to_string()))?;

        let status: String = row.get("status");
        if InstanceStatus::parse(&status) != Some(InstanceStatus::Submitted) {
            return Err(DomainError::InvalidState(format!(
                "Cannot {} a chore that is not submitted (current status: {})",
                action.as_str(),
                status
            )));
        }

        let child_id: String = row.get("child_id");
        let title: String = row.get("title");
        let points: i64 = row.get("points");

        sqlx::query(
            r#"
            UPDATE chore_instances SET
                status = ?,
                reviewed_at = ?,
                reviewed_by = ?,
                notes = CASE WHEN ? != '' THEN ? ELSE notes END
            WHERE id = ?
            "#,
        )
        .bind(action.as_str())
        .bind(self.clock.now().to_rfc3339())
        .bind(parent_id)
        .bind(request.notes.as_deref().unwrap_or(""))
        .bind(request.notes.as_deref().unwrap_or(""))
        .bind(&request.instance_id)
        .execute(self.db.pool())
        .await?;

        info!(
            "Instance {} reviewed as {} by parent {}",
            request.instance_id,
            action.as_str(),
            parent_id
        );

        let (kind, message) = match action {
            ReviewAction::Approved => (
                NotificationKind::Success,
                format!("\"{}\" was approved. +{} points!", title, points),
            ),
            ReviewAction::Rejected => {
                let mut message = format!("\"{}\" was not approved this time.", title);
                if let Some(notes) = request.notes.as_deref().filter(|n| !n.is_empty()) {
                    message.push_str(&format!(" Note: {}", notes));
                }
                (NotificationKind::Info, message)
            }
            ReviewAction::Excused => (
                NotificationKind::Info,
                format!("You were excused from \"{}\" today.", title),
            ),
        };
        self.notifications.notify(&child_id, kind, &message).await?;

        Ok(ReviewResponse {
            instance_id: request.instance_id,
            new_status: action.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::test_support::{
        instance_status, latest_notification, seed_child, seed_chore, seed_instance, seed_parent,
        test_db,
    };
    use std::sync::Arc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    async fn setup_test() -> (ReviewService, DbConnection) {
        let db = test_db().await;
        seed_parent(&db, "P_1").await;
        seed_child(&db, "C_1", "P_1", "Ada").await;
        seed_chore(&db, "CH_1", "P_1", "Dishes", 20, true, true).await;
        let clock: SharedClock = Arc::new(FixedClock::on_day(day()));
        let notifications = NotificationService::new(db.clone(), clock.clone());
        (ReviewService::new(db.clone(), clock, notifications), db)
    }

    fn verdict(instance_id: &str, action: &str) -> ReviewRequest {
        ReviewRequest {
            instance_id: instance_id.to_string(),
            action: action.to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_approve_updates_status_and_notifies() {
        let (service, db) = setup_test().await;
        seed_instance(&db, "CI_1", "CH_1", "C_1", day(), "submitted").await;

        let response = service.review("P_1", verdict("CI_1", "approved")).await.unwrap();
        assert_eq!(response.new_status, "approved");
        assert_eq!(
            instance_status(&db, "CH_1", "C_1", day()).await.as_deref(),
            Some("approved")
        );

        let (message, kind) = latest_notification(&db, "C_1").await.unwrap();
        assert_eq!(kind, "success");
        assert!(message.contains("+20 points"), "got: {}", message);
    }

    #[tokio::test]
    async fn test_reject_appends_notes_to_notification() {
        let (service, db) = setup_test().await;
        seed_instance(&db, "CI_1", "CH_1", "C_1", day(), "submitted").await;

        let request = ReviewRequest {
            instance_id: "CI_1".to_string(),
            action: "rejected".to_string(),
            notes: Some("Sink still full".to_string()),
        };
        service.review("P_1", request).await.unwrap();

        let (message, kind) = latest_notification(&db, "C_1").await.unwrap();
        assert_eq!(kind, "info");
        assert!(message.contains("Sink still full"), "got: {}", message);
    }

    #[tokio::test]
    async fn test_excuse_notifies_child() {
        let (service, db) = setup_test().await;
        seed_instance(&db, "CI_1", "CH_1", "C_1", day(), "submitted").await;

        let response = service.review("P_1", verdict("CI_1", "excused")).await.unwrap();
        assert_eq!(response.new_status, "excused");

        let (message, kind) = latest_notification(&db, "C_1").await.unwrap();
        assert_eq!(kind, "info");
        assert!(message.contains("excused"), "got: {}", message);
    }

    #[tokio::test]
    async fn test_second_verdict_is_invalid_state() {
        let (service, db) = setup_test().await;
        seed_instance(&db, "CI_1", "CH_1", "C_1", day(), "submitted").await;

        service.review("P_1", verdict("CI_1", "approved")).await.unwrap();
        let second = service.review("P_1", verdict("CI_1", "rejected")).await;

        match second {
            Err(DomainError::InvalidState(message)) => {
                assert!(message.contains("approved"), "got: {}", message)
            }
            other => panic!("expected InvalidState, got {:?}", other),
        }
        assert_eq!(
            instance_status(&db, "CH_1", "C_1", day()).await.as_deref(),
            Some("approved")
        );
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected() {
        let (service, db) = setup_test().await;
        seed_instance(&db, "CI_1", "CH_1", "C_1", day(), "submitted").await;

        let result = service.review("P_1", verdict("CI_1", "maybe")).await;
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_other_parents_instance_is_not_found() {
        let (service, db) = setup_test().await;
        seed_parent(&db, "P_2").await;
        seed_child(&db, "C_2", "P_2", "Ben").await;
        seed_chore(&db, "CH_2", "P_2", "Laundry", 10, false, true).await;
        seed_instance(&db, "CI_9", "CH_2", "C_2", day(), "submitted").await;

        let result = service.review("P_1", verdict("CI_9", "approved")).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_pending_filters_and_orders() {
        let (service, db) = setup_test().await;
        seed_child(&db, "C_2", "P_1", "Ben").await;
        seed_chore(&db, "CH_2", "P_1", "Bonus reading", 5, false, true).await;

        seed_instance(&db, "CI_1", "CH_2", "C_1", day(), "submitted").await;
        seed_instance(&db, "CI_2", "CH_1", "C_1", day(), "submitted").await;
        seed_instance(&db, "CI_3", "CH_1", "C_2", day(), "approved").await;
        let other_day = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        seed_instance(&db, "CI_4", "CH_1", "C_2", other_day, "submitted").await;

        // Defaults to today; already-reviewed and other-day rows are excluded.
        let today = service.list_pending("P_1", None).await.unwrap();
        assert_eq!(today.date, day());
        assert_eq!(today.approvals.len(), 2);
        // Required chore before the optional one for the same child.
        assert_eq!(today.approvals[0].id, "CI_2");
        assert_eq!(today.approvals[1].id, "CI_1");

        let yesterday = service.list_pending("P_1", Some(other_day)).await.unwrap();
        assert_eq!(yesterday.approvals.len(), 1);
        assert_eq!(yesterday.approvals[0].id, "CI_4");
        assert_eq!(yesterday.approvals[0].child_name, "Ben");
    }
}
