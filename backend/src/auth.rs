//! Identity context resolution.
//!
//! The domain never sees credentials; it consumes an already-authenticated
//! identity resolved from the `session` cookie against the sessions table.
//! Session issuance (signup, login, PIN checks) belongs to surrounding
//! infrastructure and is not implemented here.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::clock::SharedClock;
use crate::db::DbConnection;
use crate::error::{DomainError, DomainResult};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
pub struct ParentIdentity {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChildIdentity {
    pub id: String,
    pub parent_id: String,
    pub display_name: String,
}

/// Authenticated caller, either role.
#[derive(Debug, Clone)]
pub enum Identity {
    Parent(ParentIdentity),
    Child(ChildIdentity),
}

/// Extract the session id from the Cookie header, if any.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|part| {
        let mut pieces = part.trim().splitn(2, '=');
        match (pieces.next(), pieces.next()) {
            (Some(name), Some(value)) if name == SESSION_COOKIE && !value.is_empty() => {
                Some(value.to_string())
            }
            _ => None,
        }
    })
}

/// Look up a session and load the user behind it.
///
/// Expired sessions are deleted on sight and reported as absent, as are
/// sessions whose user row has since been removed.
pub async fn resolve_session(
    db: &DbConnection,
    session_id: &str,
    now: DateTime<Utc>,
) -> DomainResult<Option<Identity>> {
    let Some(session) =
        sqlx::query("SELECT user_id, user_type, expires_at FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(db.pool())
            .await?
    else {
        return Ok(None);
    };

    let user_id: String = session.get("user_id");
    let user_type: String = session.get("user_type");
    let expires_at: String = session.get("expires_at");

    let expired = DateTime::parse_from_rfc3339(&expires_at)
        .map(|t| t.with_timezone(&Utc) <= now)
        .unwrap_or(true);
    if expired {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(db.pool())
            .await?;
        return Ok(None);
    }

    match user_type.as_str() {
        "parent" => {
            let row = sqlx::query("SELECT id, display_name FROM parents WHERE id = ?")
                .bind(&user_id)
                .fetch_optional(db.pool())
                .await?;
            Ok(row.map(|r| {
                Identity::Parent(ParentIdentity {
                    id: r.get("id"),
                    display_name: r.get("display_name"),
                })
            }))
        }
        "child" => {
            let row = sqlx::query("SELECT id, parent_id, display_name FROM children WHERE id = ?")
                .bind(&user_id)
                .fetch_optional(db.pool())
                .await?;
            Ok(row.map(|r| {
                Identity::Child(ChildIdentity {
                    id: r.get("id"),
                    parent_id: r.get("parent_id"),
                    display_name: r.get("display_name"),
                })
            }))
        }
        _ => Ok(None),
    }
}

async fn identity_from_parts<S>(parts: &Parts, state: &S) -> Result<Identity, DomainError>
where
    S: Send + Sync,
    DbConnection: FromRef<S>,
    SharedClock: FromRef<S>,
{
    let session_id = session_id_from_headers(&parts.headers)
        .ok_or_else(|| DomainError::Unauthorized("Not authenticated".to_string()))?;

    let db = DbConnection::from_ref(state);
    let clock = SharedClock::from_ref(state);

    resolve_session(&db, &session_id, clock.now())
        .await?
        .ok_or_else(|| DomainError::Unauthorized("Invalid or expired session".to_string()))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    DbConnection: FromRef<S>,
    SharedClock: FromRef<S>,
{
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        identity_from_parts(parts, state).await
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ParentIdentity
where
    S: Send + Sync,
    DbConnection: FromRef<S>,
    SharedClock: FromRef<S>,
{
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match identity_from_parts(parts, state).await? {
            Identity::Parent(parent) => Ok(parent),
            Identity::Child(_) => Err(DomainError::Forbidden(
                "Parent access required".to_string(),
            )),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ChildIdentity
where
    S: Send + Sync,
    DbConnection: FromRef<S>,
    SharedClock: FromRef<S>,
{
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match identity_from_parts(parts, state).await? {
            Identity::Child(child) => Ok(child),
            Identity::Parent(_) => Err(DomainError::Forbidden(
                "Child access required".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_child, seed_parent, seed_session, test_db};
    use axum::http::HeaderValue;
    use chrono::Duration;

    #[test]
    fn test_session_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc123; lang=en"),
        );
        assert_eq!(session_id_from_headers(&headers).as_deref(), Some("abc123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_id_from_headers(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_id_from_headers(&headers), None);
    }

    #[tokio::test]
    async fn test_resolve_parent_session() {
        let db = test_db().await;
        seed_parent(&db, "P_1").await;
        let now = Utc::now();
        seed_session(&db, "S_1", "P_1", "parent", now + Duration::days(1)).await;

        let identity = resolve_session(&db, "S_1", now).await.unwrap();
        match identity {
            Some(Identity::Parent(parent)) => assert_eq!(parent.id, "P_1"),
            other => panic!("expected parent identity, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_child_session_carries_parent_id() {
        let db = test_db().await;
        seed_parent(&db, "P_1").await;
        seed_child(&db, "C_1", "P_1", "Ada").await;
        let now = Utc::now();
        seed_session(&db, "S_1", "C_1", "child", now + Duration::days(1)).await;

        let identity = resolve_session(&db, "S_1", now).await.unwrap();
        match identity {
            Some(Identity::Child(child)) => {
                assert_eq!(child.id, "C_1");
                assert_eq!(child.parent_id, "P_1");
                assert_eq!(child.display_name, "Ada");
            }
            other => panic!("expected child identity, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_expired_session_is_deleted() {
        let db = test_db().await;
        seed_parent(&db, "P_1").await;
        let now = Utc::now();
        seed_session(&db, "S_1", "P_1", "parent", now - Duration::hours(1)).await;

        let identity = resolve_session(&db, "S_1", now).await.unwrap();
        assert!(identity.is_none());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(remaining, 0, "expired session row should be cleaned up");
    }

    #[tokio::test]
    async fn test_unknown_session_resolves_to_none() {
        let db = test_db().await;
        let identity = resolve_session(&db, "S_missing", Utc::now()).await.unwrap();
        assert!(identity.is_none());
    }
}
