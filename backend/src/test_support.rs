//! Seeding helpers shared by the service test modules.

use chrono::{DateTime, NaiveDate, Utc};

use crate::db::DbConnection;

pub async fn test_db() -> DbConnection {
    DbConnection::init_test()
        .await
        .expect("Failed to create test database")
}

pub async fn seed_parent(db: &DbConnection, id: &str) {
    sqlx::query("INSERT INTO parents (id, email, display_name) VALUES (?, ?, ?)")
        .bind(id)
        .bind(format!("{}@example.com", id.to_lowercase()))
        .bind("Test Parent")
        .execute(db.pool())
        .await
        .expect("Failed to seed parent");
}

pub async fn seed_child(db: &DbConnection, id: &str, parent_id: &str, name: &str) {
    sqlx::query(
        "INSERT INTO children (id, parent_id, display_name, child_code) VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(parent_id)
    .bind(name)
    .bind(format!("CODE{}", id))
    .execute(db.pool())
    .await
    .expect("Failed to seed child");
}

pub async fn seed_chore(
    db: &DbConnection,
    id: &str,
    parent_id: &str,
    title: &str,
    points: i64,
    is_required: bool,
    active: bool,
) {
    sqlx::query(
        "INSERT INTO chores (id, parent_id, title, points, is_required, active) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(parent_id)
    .bind(title)
    .bind(points)
    .bind(is_required)
    .bind(active)
    .execute(db.pool())
    .await
    .expect("Failed to seed chore");
}

pub async fn seed_instance(
    db: &DbConnection,
    id: &str,
    chore_id: &str,
    child_id: &str,
    date: NaiveDate,
    status: &str,
) {
    sqlx::query(
        "INSERT INTO chore_instances (id, chore_id, child_id, date, status) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(chore_id)
    .bind(child_id)
    .bind(date.to_string())
    .bind(status)
    .execute(db.pool())
    .await
    .expect("Failed to seed chore instance");
}

pub async fn seed_session(
    db: &DbConnection,
    id: &str,
    user_id: &str,
    user_type: &str,
    expires_at: DateTime<Utc>,
) {
    sqlx::query("INSERT INTO sessions (id, user_id, user_type, expires_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(user_id)
        .bind(user_type)
        .bind(expires_at.to_rfc3339())
        .execute(db.pool())
        .await
        .expect("Failed to seed session");
}

pub async fn instance_status(
    db: &DbConnection,
    chore_id: &str,
    child_id: &str,
    date: NaiveDate,
) -> Option<String> {
    sqlx::query_scalar(
        "SELECT status FROM chore_instances WHERE chore_id = ? AND child_id = ? AND date = ?",
    )
    .bind(chore_id)
    .bind(child_id)
    .bind(date.to_string())
    .fetch_optional(db.pool())
    .await
    .expect("Failed to query instance status")
}

pub async fn instance_count(db: &DbConnection, chore_id: &str, child_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM chore_instances WHERE chore_id = ? AND child_id = ?")
        .bind(chore_id)
        .bind(child_id)
        .fetch_one(db.pool())
        .await
        .expect("Failed to count instances")
}

pub async fn notification_count(db: &DbConnection, child_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE child_id = ?")
        .bind(child_id)
        .fetch_one(db.pool())
        .await
        .expect("Failed to count notifications")
}

/// Most recent (message, type) pair for the child, if any.
pub async fn latest_notification(db: &DbConnection, child_id: &str) -> Option<(String, String)> {
    sqlx::query_as(
        "SELECT message, type FROM notifications WHERE child_id = ? ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(child_id)
    .fetch_optional(db.pool())
    .await
    .expect("Failed to fetch latest notification")
}
