use shared::{Child, ChildListResponse, CreateChildRequest, UpdateChildRequest};
use sqlx::Row;
use tracing::{info, warn};

use crate::clock::SharedClock;
use crate::db::DbConnection;
use crate::domain::models::{generate_child_code, new_id};
use crate::error::{DomainError, DomainResult};

/// Child accounts, scoped per parent. Each child carries a short unique
/// login code handed out by the parent.
#[derive(Clone)]
pub struct ChildService {
    db: DbConnection,
    clock: SharedClock,
}

impl ChildService {
    pub fn new(db: DbConnection, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    pub async fn create(
        &self,
        parent_id: &str,
        request: CreateChildRequest,
    ) -> DomainResult<Child> {
        let display_name = request.display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::InvalidInput("Name is required".to_string()));
        }

        let id = new_id("C_");
        let created_at = self.clock.now().to_rfc3339();
        let child_code = self.insert_with_fresh_code(&id, parent_id, display_name, &created_at).await?;

        info!("Child {} created for parent {}", id, parent_id);

        Ok(Child {
            id,
            display_name: display_name.to_string(),
            child_code,
            pin_enabled: false,
            created_at,
        })
    }

    // The code space is large enough that collisions are freak events, but
    // the UNIQUE constraint can still fire; retry with a fresh code.
    async fn insert_with_fresh_code(
        &self,
        id: &str,
        parent_id: &str,
        display_name: &str,
        created_at: &str,
    ) -> DomainResult<String> {
        for attempt in 0..10 {
            let code = generate_child_code();
            let inserted = sqlx::query(
                r#"
                INSERT INTO children (id, parent_id, display_name, child_code, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(parent_id)
            .bind(display_name)
            .bind(&code)
            .bind(created_at)
            .execute(self.db.pool())
            .await;

            match inserted {
                Ok(_) => return Ok(code),
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    warn!("Child code collision on attempt {}, retrying", attempt + 1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(DomainError::Conflict(
            "Could not allocate a unique child code".to_string(),
        ))
    }

    pub async fn list(&self, parent_id: &str) -> DomainResult<ChildListResponse> {
        let rows = sqlx::query(
            r#"
            SELECT id, display_name, child_code, pin_enabled, created_at
            FROM children
            WHERE parent_id = ?
            ORDER BY display_name ASC
            "#,
        )
        .bind(parent_id)
        .fetch_all(self.db.pool())
        .await?;

        let children = rows.iter().map(child_from_row).collect();
        Ok(ChildListResponse { children })
    }

    pub async fn get(&self, parent_id: &str, child_id: &str) -> DomainResult<Child> {
        let row = sqlx::query(
            r#"
            SELECT id, display_name, child_code, pin_enabled, created_at
            FROM children
            WHERE id = ? AND parent_id = ?
            "#,
        )
        .bind(child_id)
        .bind(parent_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| DomainError::NotFound("Child not found".to_string()))?;

        Ok(child_from_row(&row))
    }

    /// Rename the child and/or hand out a fresh login code.
    pub async fn update(
        &self,
        parent_id: &str,
        child_id: &str,
        request: UpdateChildRequest,
    ) -> DomainResult<Child> {
        let mut child = self.get(parent_id, child_id).await?;

        if let Some(display_name) = request.display_name {
            let display_name = display_name.trim().to_string();
            if display_name.is_empty() {
                return Err(DomainError::InvalidInput("Name is required".to_string()));
            }
            child.display_name = display_name;
        }
        if request.regenerate_code {
            child.child_code = generate_child_code();
        }

        sqlx::query(
            "UPDATE children SET display_name = ?, child_code = ? WHERE id = ? AND parent_id = ?",
        )
        .bind(&child.display_name)
        .bind(&child.child_code)
        .bind(child_id)
        .bind(parent_id)
        .execute(self.db.pool())
        .await?;

        Ok(child)
    }

    /// Delete a child; the schema cascades remove their ledger rows and
    /// notifications, and any live session stops resolving.
    pub async fn delete(&self, parent_id: &str, child_id: &str) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM children WHERE id = ? AND parent_id = ?")
            .bind(child_id)
            .bind(parent_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("Child not found".to_string()));
        }

        info!("Child {} deleted for parent {}", child_id, parent_id);
        Ok(())
    }
}

fn child_from_row(row: &sqlx::sqlite::SqliteRow) -> Child {
    Child {
        id: row.get("id"),
        display_name: row.get("display_name"),
        child_code: row.get("child_code"),
        pin_enabled: row.get("pin_enabled"),
        created_at: row.get("created_at"),
    }
}
