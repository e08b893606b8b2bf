use chrono::{DateTime, Utc};
use shared::{
    PaydayChildResult, PaydayFailure, PaydayResponse, UpdateRuleRequest, WeekWindow, WeeklyRule,
};
use sqlx::Row;
use tracing::{error, info};

use crate::db::DbConnection;
use crate::domain::models::{new_id, NotificationKind};
use crate::domain::notification_service::NotificationService;
use crate::domain::week::week_window;
use crate::error::{DomainError, DomainResult};

const DEFAULT_CAP_POINTS: i64 = 100;

/// Weekly settlement: eligibility gate on required chores, capped payout
/// over approved points, one notification per child per run.
#[derive(Clone)]
pub struct PaydayService {
    db: DbConnection,
    notifications: NotificationService,
}

impl PaydayService {
    pub fn new(db: DbConnection, notifications: NotificationService) -> Self {
        Self { db, notifications }
    }

    /// Fetch the parent's weekly rule, inserting the defaults on first use.
    pub async fn get_or_create_rule(&self, parent_id: &str) -> DomainResult<WeeklyRule> {
        sqlx::query(
            "INSERT OR IGNORE INTO weekly_rules (id, parent_id, weekly_cap_points, strict_mode) VALUES (?, ?, ?, 1)",
        )
        .bind(new_id("WR_"))
        .bind(parent_id)
        .bind(DEFAULT_CAP_POINTS)
        .execute(self.db.pool())
        .await?;

        let row = sqlx::query(
            "SELECT weekly_cap_points, strict_mode FROM weekly_rules WHERE parent_id = ?",
        )
        .bind(parent_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(WeeklyRule {
            weekly_cap_points: row.get("weekly_cap_points"),
            strict_mode: row.get("strict_mode"),
        })
    }

    pub async fn update_rule(
        &self,
        parent_id: &str,
        request: UpdateRuleRequest,
    ) -> DomainResult<WeeklyRule> {
        if let Some(cap) = request.weekly_cap_points {
            if cap < 0 {
                return Err(DomainError::InvalidInput(
                    "Weekly cap must be zero or positive".to_string(),
                ));
            }
        }

        let current = self.get_or_create_rule(parent_id).await?;
        let cap = request.weekly_cap_points.unwrap_or(current.weekly_cap_points);
        let strict = request.strict_mode.unwrap_or(current.strict_mode);

        sqlx::query(
            "UPDATE weekly_rules SET weekly_cap_points = ?, strict_mode = ? WHERE parent_id = ?",
        )
        .bind(cap)
        .bind(strict)
        .bind(parent_id)
        .execute(self.db.pool())
        .await?;

        Ok(WeeklyRule {
            weekly_cap_points: cap,
            strict_mode: strict,
        })
    }

    /// Run the settlement for every child of the parent over the week
    /// containing `reference`.
    ///
    /// Children settle independently: an error for one child lands in
    /// `failures` and the run continues. Re-running recomputes from the
    /// ledger, so results are stable (duplicate notifications aside).
    pub async fn run(
        &self,
        parent_id: &str,
        reference: DateTime<Utc>,
    ) -> DomainResult<PaydayResponse> {
        let rule = self.get_or_create_rule(parent_id).await?;
        let window = week_window(reference.date_naive());

        info!(
            "Payday run for parent {} over {}..{} (cap {})",
            parent_id, window.start, window.end, rule.weekly_cap_points
        );

        let children: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, display_name FROM children WHERE parent_id = ? ORDER BY display_name ASC",
        )
        .bind(parent_id)
        .fetch_all(self.db.pool())
        .await?;

        let required: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, title FROM chores WHERE parent_id = ? AND active = 1 AND is_required = 1",
        )
        .bind(parent_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut results = Vec::new();
        let mut failures = Vec::new();

        for (child_id, name) in children {
            match self
                .settle_child(&child_id, &name, &required, &window, rule.weekly_cap_points)
                .await
            {
                Ok(result) => results.push(result),
                Err(err) => {
                    error!("Payday settlement failed for child {}: {}", child_id, err);
                    failures.push(PaydayFailure {
                        child_id,
                        name,
                        error: "Settlement failed for this child".to_string(),
                    });
                }
            }
        }

        Ok(PaydayResponse {
            window,
            cap_points: rule.weekly_cap_points,
            results,
            failures,
        })
    }

    async fn settle_child(
        &self,
        child_id: &str,
        name: &str,
        required: &[(String, String)],
        window: &WeekWindow,
        cap: i64,
    ) -> DomainResult<PaydayChildResult> {
        let start = window.start.to_string();
        let end = window.end.to_string();

        let mut missing_chores = Vec::new();
        for (chore_id, title) in required {
            let done: Option<i64> = sqlx::query_scalar(
                r#"
                SELECT 1 FROM chore_instances
                WHERE chore_id = ? AND child_id = ?
                  AND date BETWEEN ? AND ?
                  AND status IN ('approved', 'excused')
                LIMIT 1
                "#,
            )
            .bind(chore_id)
            .bind(child_id)
            .bind(&start)
            .bind(&end)
            .fetch_optional(self.db.pool())
            .await?;

            if done.is_none() {
                let title = if title.is_empty() {
                    "Unknown".to_string()
                } else {
                    title.clone()
                };
                missing_chores.push(title);
            }
        }

        let raw_points: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ch.points), 0)
            FROM chore_instances ci
            JOIN chores ch ON ch.id = ci.chore_id
            WHERE ci.child_id = ?
              AND ci.date BETWEEN ? AND ?
              AND ci.status = 'approved'
            "#,
        )
        .bind(child_id)
        .bind(&start)
        .bind(&end)
        .fetch_one(self.db.pool())
        .await?;

        let eligible = missing_chores.is_empty();
        let points = if eligible { raw_points.min(cap) } else { 0 };

        if eligible {
            let message = format!(
                "Payday! You earned {} points for {} to {}.",
                points, window.start, window.end
            );
            self.notifications
                .notify(child_id, NotificationKind::Payday, &message)
                .await?;
        } else {
            let message = format!(
                "No payout this week. Missing required chores: {}",
                missing_chores.join(", ")
            );
            self.notifications
                .notify(child_id, NotificationKind::Warning, &message)
                .await?;
        }

        Ok(PaydayChildResult {
            child_id: child_id.to_string(),
            name: name.to_string(),
            eligible,
            points,
            raw_points,
            missing_chores,
        })
    }
}
