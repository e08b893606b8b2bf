use shared::{Chore, ChoreListResponse, CreateChoreRequest, UpdateChoreRequest};
use sqlx::Row;
use tracing::info;

use crate::clock::SharedClock;
use crate::db::DbConnection;
use crate::domain::models::new_id;
use crate::error::{DomainError, DomainResult};

/// Chore catalog, scoped per parent.
#[derive(Clone)]
pub struct ChoreService {
    db: DbConnection,
    clock: SharedClock,
}

impl ChoreService {
    pub fn new(db: DbConnection, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    pub async fn create(
        &self,
        parent_id: &str,
        request: CreateChoreRequest,
    ) -> DomainResult<Chore> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(DomainError::InvalidInput("Title is required".to_string()));
        }
        if request.points < 0 {
            return Err(DomainError::InvalidInput(
                "Points must be zero or positive".to_string(),
            ));
        }

        let id = new_id("CH_");
        let created_at = self.clock.now().to_rfc3339();
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        sqlx::query(
            r#"
            INSERT INTO chores (id, parent_id, title, description, points, is_required, active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(&id)
        .bind(parent_id)
        .bind(title)
        .bind(&description)
        .bind(request.points)
        .bind(request.is_required)
        .bind(&created_at)
        .execute(self.db.pool())
        .await?;

        info!("Chore {} created for parent {}", id, parent_id);

        Ok(Chore {
            id,
            title: title.to_string(),
            description,
            points: request.points,
            is_required: request.is_required,
            active: true,
            created_at,
        })
    }

    /// All of the parent's chores, active and retired, required first.
    pub async fn list(&self, parent_id: &str) -> DomainResult<ChoreListResponse> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, points, is_required, active, created_at
            FROM chores
            WHERE parent_id = ?
            ORDER BY is_required DESC, created_at DESC
            "#,
        )
        .bind(parent_id)
        .fetch_all(self.db.pool())
        .await?;

        let chores = rows.iter().map(chore_from_row).collect();
        Ok(ChoreListResponse { chores })
    }

    pub async fn get(&self, parent_id: &str, chore_id: &str) -> DomainResult<Chore> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, points, is_required, active, created_at
            FROM chores
            WHERE id = ? AND parent_id = ?
            "#,
        )
        .bind(chore_id)
        .bind(parent_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| DomainError::NotFound("Chore not found".to_string()))?;

        Ok(chore_from_row(&row))
    }

    /// Merge the given fields into the chore. An empty-string description
    /// clears it; absent fields stay as they are.
    pub async fn update(
        &self,
        parent_id: &str,
        chore_id: &str,
        request: UpdateChoreRequest,
    ) -> DomainResult<Chore> {
        let mut chore = self.get(parent_id, chore_id).await?;

        if let Some(title) = request.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(DomainError::InvalidInput("Title is required".to_string()));
            }
            chore.title = title;
        }
        if let Some(description) = request.description {
            let description = description.trim().to_string();
            chore.description = if description.is_empty() {
                None
            } else {
                Some(description)
            };
        }
        if let Some(points) = request.points {
            if points < 0 {
                return Err(DomainError::InvalidInput(
                    "Points must be zero or positive".to_string(),
                ));
            }
            chore.points = points;
        }
        if let Some(is_required) = request.is_required {
            chore.is_required = is_required;
        }
        if let Some(active) = request.active {
            chore.active = active;
        }

        sqlx::query(
            r#"
            UPDATE chores SET title = ?, description = ?, points = ?, is_required = ?, active = ?
            WHERE id = ? AND parent_id = ?
            "#,
        )
        .bind(&chore.title)
        .bind(&chore.description)
        .bind(chore.points)
        .bind(chore.is_required)
        .bind(chore.active)
        .bind(chore_id)
        .bind(parent_id)
        .execute(self.db.pool())
        .await?;

        Ok(chore)
    }

    /// Delete a chore and, via the schema cascade, its ledger rows.
    pub async fn delete(&self, parent_id: &str, chore_id: &str) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM chores WHERE id = ? AND parent_id = ?")
            .bind(chore_id)
            .bind(parent_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("Chore not found".to_string()));
        }

        info!("Chore {} deleted for parent {}", chore_id, parent_id);
        Ok(())
    }
}

fn chore_from_row(row: &sqlx::sqlite::SqliteRow) -> Chore {
    Chore {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        points: row.get("points"),
        is_required: row.get("is_required"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    }
}
