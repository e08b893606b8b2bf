//! HTTP surface. Handlers stay thin: resolve the caller, delegate to a
//! domain service, wrap the result.

use axum::extract::{FromRef, Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use shared::{
    CheckInRequest, CreateChildRequest, CreateChoreRequest, MarkReadRequest, MeResponse,
    ReviewRequest, UpdateChildRequest, UpdateChoreRequest, UpdateRuleRequest,
};
use tracing::info;

use crate::auth::{session_id_from_headers, ChildIdentity, Identity, ParentIdentity};
use crate::clock::SharedClock;
use crate::db::DbConnection;
use crate::domain::{
    CheckInService, ChildService, ChoreService, NotificationService, PaydayService, ReviewService,
};
use crate::error::DomainError;

#[derive(Clone)]
pub struct AppState {
    pub db: DbConnection,
    pub clock: SharedClock,
    pub chores: ChoreService,
    pub children: ChildService,
    pub checkins: CheckInService,
    pub reviews: ReviewService,
    pub payday: PaydayService,
    pub notifications: NotificationService,
}

impl AppState {
    pub fn new(db: DbConnection, clock: SharedClock) -> Self {
        let notifications = NotificationService::new(db.clone(), clock.clone());
        Self {
            chores: ChoreService::new(db.clone(), clock.clone()),
            children: ChildService::new(db.clone(), clock.clone()),
            checkins: CheckInService::new(db.clone(), clock.clone()),
            reviews: ReviewService::new(db.clone(), clock.clone(), notifications.clone()),
            payday: PaydayService::new(db.clone(), notifications.clone()),
            notifications,
            db,
            clock,
        }
    }
}

// The identity extractors pull these out of whatever state the router runs with.
impl FromRef<AppState> for DbConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for SharedClock {
    fn from_ref(state: &AppState) -> Self {
        state.clock.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/parent/chores", get(list_chores).post(create_chore))
        .route(
            "/api/parent/chores/:id",
            get(get_chore).put(update_chore).delete(delete_chore),
        )
        .route("/api/parent/children", get(list_children).post(create_child))
        .route(
            "/api/parent/children/:id",
            get(get_child).put(update_child).delete(delete_child),
        )
        .route("/api/parent/approvals", get(list_approvals).post(review))
        .route("/api/parent/payday", post(run_payday))
        .route("/api/parent/rules", get(get_rules).put(update_rules))
        .route("/api/child/chores", get(child_chores).post(check_in))
        .route("/api/child/notifications", get(list_notifications))
        .route("/api/child/notifications/read", post(mark_notifications_read))
        .with_state(state)
}

async fn ping(State(state): State<AppState>) -> Result<Json<serde_json::Value>, DomainError> {
    let tables: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'")
            .fetch_one(state.db.pool())
            .await?;

    Ok(Json(json!({
        "ok": true,
        "tables": tables,
        "timestamp": state.clock.now().to_rfc3339(),
    })))
}

async fn me(identity: Identity) -> Json<MeResponse> {
    let response = match identity {
        Identity::Parent(parent) => MeResponse {
            user_type: "parent".to_string(),
            id: parent.id,
            display_name: parent.display_name,
            parent_id: None,
        },
        Identity::Child(child) => MeResponse {
            user_type: "child".to_string(),
            id: child.id,
            display_name: Some(child.display_name),
            parent_id: Some(child.parent_id),
        },
    };
    Json(response)
}

/// Drop the caller's session row, if any, and clear the cookie either way.
async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Response, DomainError> {
    if let Some(session_id) = session_id_from_headers(&headers) {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(&session_id)
            .execute(state.db.pool())
            .await?;
        info!("Session {} logged out", session_id);
    }

    let mut response = Json(json!({ "ok": true })).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; Max-Age=0"),
    );
    Ok(response)
}

async fn list_chores(
    State(state): State<AppState>,
    parent: ParentIdentity,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.chores.list(&parent.id).await?))
}

async fn create_chore(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Json(request): Json<CreateChoreRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let chore = state.chores.create(&parent.id, request).await?;
    Ok((StatusCode::CREATED, Json(chore)))
}

async fn get_chore(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.chores.get(&parent.id, &id).await?))
}

async fn update_chore(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Path(id): Path<String>,
    Json(request): Json<UpdateChoreRequest>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.chores.update(&parent.id, &id, request).await?))
}

async fn delete_chore(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    state.chores.delete(&parent.id, &id).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn list_children(
    State(state): State<AppState>,
    parent: ParentIdentity,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.children.list(&parent.id).await?))
}

async fn create_child(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Json(request): Json<CreateChildRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let child = state.children.create(&parent.id, request).await?;
    Ok((StatusCode::CREATED, Json(child)))
}

async fn get_child(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.children.get(&parent.id, &id).await?))
}

async fn update_child(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Path(id): Path<String>,
    Json(request): Json<UpdateChildRequest>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.children.update(&parent.id, &id, request).await?))
}

async fn delete_child(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DomainError> {
    state.children.delete(&parent.id, &id).await?;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
struct ApprovalsQuery {
    date: Option<NaiveDate>,
}

async fn list_approvals(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Query(query): Query<ApprovalsQuery>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.reviews.list_pending(&parent.id, query.date).await?))
}

async fn review(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Json(request): Json<ReviewRequest>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.reviews.review(&parent.id, request).await?))
}

async fn run_payday(
    State(state): State<AppState>,
    parent: ParentIdentity,
) -> Result<impl IntoResponse, DomainError> {
    let reference = state.clock.now();
    Ok(Json(state.payday.run(&parent.id, reference).await?))
}

async fn get_rules(
    State(state): State<AppState>,
    parent: ParentIdentity,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.payday.get_or_create_rule(&parent.id).await?))
}

async fn update_rules(
    State(state): State<AppState>,
    parent: ParentIdentity,
    Json(request): Json<UpdateRuleRequest>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.payday.update_rule(&parent.id, request).await?))
}

async fn child_chores(
    State(state): State<AppState>,
    child: ChildIdentity,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.checkins.list_for_child_today(&child.id).await?))
}

async fn check_in(
    State(state): State<AppState>,
    child: ChildIdentity,
    Json(request): Json<CheckInRequest>,
) -> Result<impl IntoResponse, DomainError> {
    let response = state.checkins.record_check_in(&child.id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize)]
struct NotificationsQuery {
    limit: Option<u32>,
    #[serde(default)]
    unread: bool,
}

async fn list_notifications(
    State(state): State<AppState>,
    child: ChildIdentity,
    Query(query): Query<NotificationsQuery>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(
        state
            .notifications
            .list(&child.id, query.limit, query.unread)
            .await?,
    ))
}

async fn mark_notifications_read(
    State(state): State<AppState>,
    child: ChildIdentity,
    Json(request): Json<MarkReadRequest>,
) -> Result<impl IntoResponse, DomainError> {
    Ok(Json(state.notifications.mark_read(&child.id, request).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::test_support::{seed_child, seed_chore, seed_parent, test_db};
    use std::sync::Arc;

    async fn test_state() -> AppState {
        let db = test_db().await;
        let clock: SharedClock = Arc::new(FixedClock::on_day(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        ));
        AppState::new(db, clock)
    }

    #[tokio::test]
    async fn test_ping_counts_tables() {
        let state = test_state().await;
        let Json(body) = ping(State(state)).await.unwrap();
        assert_eq!(body["ok"], true);
        assert!(body["tables"].as_i64().unwrap() >= 7);
    }

    #[tokio::test]
    async fn test_me_reports_child_identity() {
        let response = me(Identity::Child(crate::auth::ChildIdentity {
            id: "C_1".to_string(),
            parent_id: "P_1".to_string(),
            display_name: "Ada".to_string(),
        }))
        .await;
        assert_eq!(response.0.user_type, "child");
        assert_eq!(response.0.parent_id.as_deref(), Some("P_1"));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let state = test_state().await;
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=S_1"));

        let response = logout(State(state), headers).await.unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_identity_extractors_enforce_session_and_role() {
        use axum::extract::FromRequestParts;
        use crate::test_support::seed_session;

        let state = test_state().await;
        seed_parent(&state.db, "P_1").await;
        seed_session(
            &state.db,
            "S_1",
            "P_1",
            "parent",
            chrono::Utc::now() + chrono::Duration::days(1),
        )
        .await;

        // No cookie at all.
        let (mut parts, _) = axum::http::Request::builder()
            .body(())
            .unwrap()
            .into_parts();
        let err = ParentIdentity::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unauthorized");

        // Valid parent session resolves.
        let (mut parts, _) = axum::http::Request::builder()
            .header(header::COOKIE, "session=S_1")
            .body(())
            .unwrap()
            .into_parts();
        let parent = ParentIdentity::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(parent.id, "P_1");

        // A parent session on a child-only extractor is a role mismatch.
        let (mut parts, _) = axum::http::Request::builder()
            .header(header::COOKIE, "session=S_1")
            .body(())
            .unwrap()
            .into_parts();
        let err = ChildIdentity::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[tokio::test]
    async fn test_check_in_returns_created() {
        let state = test_state().await;
        seed_parent(&state.db, "P_1").await;
        seed_child(&state.db, "C_1", "P_1", "Ada").await;
        seed_chore(&state.db, "CH_1", "P_1", "Dishes", 20, true, true).await;

        let child = ChildIdentity {
            id: "C_1".to_string(),
            parent_id: "P_1".to_string(),
            display_name: "Ada".to_string(),
        };
        let response = check_in(
            State(state),
            child,
            Json(CheckInRequest {
                chore_id: "CH_1".to_string(),
                notes: None,
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
