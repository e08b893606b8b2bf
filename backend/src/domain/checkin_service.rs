use shared::{CheckInRequest, CheckInResponse, ChildChoresResponse, ChoreToday, TodayStats};
use sqlx::Row;
use tracing::info;

use crate::clock::SharedClock;
use crate::db::DbConnection;
use crate::domain::models::{new_id, InstanceStatus};
use crate::error::{DomainError, DomainResult};

/// The chore instance ledger: one row per (chore, child, day).
#[derive(Clone)]
pub struct CheckInService {
    db: DbConnection,
    clock: SharedClock,
}

impl CheckInService {
    pub fn new(db: DbConnection, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    /// Record a child's check-in on a chore for the current day.
    ///
    /// The day's row is upserted to `submitted`. A row already `approved` or
    /// `submitted` rejects the check-in with a conflict; `rejected` and
    /// `excused` rows are overwritten so the child can try again.
    pub async fn record_check_in(
        &self,
        child_id: &str,
        request: CheckInRequest,
    ) -> DomainResult<CheckInResponse> {
        info!("Check-in by child {} on chore {}", child_id, request.chore_id);

        let parent_id: Option<String> =
            sqlx::query_scalar("SELECT parent_id FROM children WHERE id = ?")
                .bind(child_id)
                .fetch_optional(self.db.pool())
                .await?;
        let parent_id =
            parent_id.ok_or_else(|| DomainError::NotFound("Child not found".to_string()))?;

        let chore = sqlx::query(
            "SELECT id, title, points FROM chores WHERE id = ? AND parent_id = ? AND active = 1",
        )
        .bind(&request.chore_id)
        .bind(&parent_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| DomainError::NotFound("Chore not found".to_string()))?;

        let date = self.clock.today();

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT status FROM chore_instances WHERE chore_id = ? AND child_id = ? AND date = ?",
        )
        .bind(&request.chore_id)
        .bind(child_id)
        .bind(date.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        match existing.as_deref().and_then(InstanceStatus::parse) {
            Some(InstanceStatus::Approved) => {
                return Err(DomainError::Conflict(
                    "This chore is already approved for today".to_string(),
                ));
            }
            Some(InstanceStatus::Submitted) => {
                return Err(DomainError::Conflict(
                    "This chore is already pending approval for today".to_string(),
                ));
            }
            // rejected / excused (or no row at all): fall through to the upsert
            _ => {}
        }

        let notes = request.notes.unwrap_or_default();
        sqlx::query(
            r#"
            INSERT INTO chore_instances (id, chore_id, child_id, date, status, submitted_at, notes)
            VALUES (?, ?, ?, ?, 'submitted', ?, NULLIF(?, ''))
            ON CONFLICT (chore_id, child_id, date) DO UPDATE SET
                status = 'submitted',
                submitted_at = excluded.submitted_at,
                notes = CASE WHEN ? != '' THEN ? ELSE notes END
            "#,
        )
        .bind(new_id("CI_"))
        .bind(&request.chore_id)
        .bind(child_id)
        .bind(date.to_string())
        .bind(self.clock.now().to_rfc3339())
        .bind(&notes)
        .bind(&notes)
        .bind(&notes)
        .execute(self.db.pool())
        .await?;

        Ok(CheckInResponse {
            date,
            status: InstanceStatus::Submitted.as_str().to_string(),
            chore_id: chore.get("id"),
            chore_title: chore.get("title"),
            points: chore.get("points"),
        })
    }

    /// All active chores of the child's parent joined with today's status,
    /// required chores first, then by title.
    pub async fn list_for_child_today(&self, child_id: &str) -> DomainResult<ChildChoresResponse> {
        let parent_id: Option<String> =
            sqlx::query_scalar("SELECT parent_id FROM children WHERE id = ?")
                .bind(child_id)
                .fetch_optional(self.db.pool())
                .await?;
        let parent_id =
            parent_id.ok_or_else(|| DomainError::NotFound("Child not found".to_string()))?;

        let date = self.clock.today();

        let rows = sqlx::query(
            r#"
            SELECT
                ch.id,
                ch.title,
                ch.description,
                ch.points,
                ch.is_required,
                (
                    SELECT ci.status
                    FROM chore_instances ci
                    WHERE ci.chore_id = ch.id
                      AND ci.child_id = ?
                      AND ci.date = ?
                    LIMIT 1
                ) AS today_status
            FROM chores ch
            WHERE ch.parent_id = ? AND ch.active = 1
            ORDER BY ch.is_required DESC, ch.title ASC
            "#,
        )
        .bind(child_id)
        .bind(date.to_string())
        .bind(&parent_id)
        .fetch_all(self.db.pool())
        .await?;

        let chores: Vec<ChoreToday> = rows
            .iter()
            .map(|row| ChoreToday {
                id: row.get("id"),
                title: row.get("title"),
                description: row.get("description"),
                points: row.get("points"),
                is_required: row.get("is_required"),
                today_status: row.get("today_status"),
            })
            .collect();

        let total = chores.len();
        let completed = chores
            .iter()
            .filter(|c| c.today_status.as_deref() == Some("approved"))
            .count();
        let pending = chores
            .iter()
            .filter(|c| c.today_status.as_deref() == Some("submitted"))
            .count();
        let total_points = chores.iter().map(|c| c.points).sum();
        let earned_points = chores
            .iter()
            .filter(|c| c.today_status.as_deref() == Some("approved"))
            .map(|c| c.points)
            .sum();

        Ok(ChildChoresResponse {
            date,
            chores,
            stats: TodayStats {
                total,
                completed,
                pending,
                remaining: total - completed - pending,
                total_points,
                earned_points,
            },
        })
    }
}
