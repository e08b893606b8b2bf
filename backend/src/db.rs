use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// DbConnection manages the sqlite pool and owns schema setup.
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating if necessary) the database at `url` and set up the schema.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            // Cascade deletes from chores/children rely on this pragma.
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Initialize a test database with a unique in-memory name.
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().simple().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Set up the required database schema.
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS parents (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT,
                display_name TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS children (
                id TEXT PRIMARY KEY,
                parent_id TEXT NOT NULL REFERENCES parents(id) ON DELETE CASCADE,
                display_name TEXT NOT NULL,
                child_code TEXT NOT NULL UNIQUE,
                pin_hash TEXT,
                pin_enabled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS chores (
                id TEXT PRIMARY KEY,
                parent_id TEXT NOT NULL REFERENCES parents(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT,
                points INTEGER NOT NULL DEFAULT 0,
                is_required INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS chore_instances (
                id TEXT PRIMARY KEY,
                chore_id TEXT NOT NULL REFERENCES chores(id) ON DELETE CASCADE,
                child_id TEXT NOT NULL REFERENCES children(id) ON DELETE CASCADE,
                date TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'submitted',
                submitted_at TEXT,
                reviewed_at TEXT,
                reviewed_by TEXT,
                notes TEXT,
                UNIQUE (chore_id, child_id, date)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS weekly_rules (
                id TEXT PRIMARY KEY,
                parent_id TEXT NOT NULL UNIQUE REFERENCES parents(id) ON DELETE CASCADE,
                weekly_cap_points INTEGER NOT NULL DEFAULT 100,
                strict_mode INTEGER NOT NULL DEFAULT 1,
                payday_day INTEGER NOT NULL DEFAULT 5,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                child_id TEXT NOT NULL REFERENCES children(id) ON DELETE CASCADE,
                message TEXT NOT NULL,
                type TEXT NOT NULL DEFAULT 'info',
                read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                user_type TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(pool).await?;
        }

        Ok(())
    }

    /// Get the underlying sqlite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
