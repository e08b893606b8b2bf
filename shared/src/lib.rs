use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Error envelope returned for every failed request.
/// `kind` is the machine-checkable error class, `error` the human message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    pub kind: String,
}

/// A chore definition owned by one parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chore {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Points awarded when an instance of this chore is approved
    pub points: i64,
    /// Required chores gate weekly payout eligibility
    pub is_required: bool,
    /// Inactive chores are hidden from check-in and settlement
    pub active: bool,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChoreRequest {
    pub title: String,
    pub description: Option<String>,
    pub points: i64,
    #[serde(default)]
    pub is_required: bool,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateChoreRequest {
    pub title: Option<String>,
    /// An empty string clears the description
    pub description: Option<String>,
    pub points: Option<i64>,
    pub is_required: Option<bool>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoreListResponse {
    pub chores: Vec<Chore>,
}

/// A child account belonging to one parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: String,
    pub display_name: String,
    /// Short human-entry login code, unique across the system
    pub child_code: String,
    pub pin_enabled: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChildRequest {
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateChildRequest {
    pub display_name: Option<String>,
    /// When true a fresh child code is generated
    #[serde(default)]
    pub regenerate_code: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildListResponse {
    pub children: Vec<Child>,
}

/// Child check-in on a chore for the current day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub chore_id: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub date: NaiveDate,
    /// Always "submitted" on success
    pub status: String,
    pub chore_id: String,
    pub chore_title: String,
    pub points: i64,
}

/// One chore joined with its instance status for today (if any).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoreToday {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub points: i64,
    pub is_required: bool,
    /// None when the child has not checked in today
    pub today_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub remaining: usize,
    pub total_points: i64,
    pub earned_points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildChoresResponse {
    pub date: NaiveDate,
    pub chores: Vec<ChoreToday>,
    pub stats: TodayStats,
}

/// A submitted chore instance awaiting parent review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub id: String,
    pub chore_id: String,
    pub child_id: String,
    pub date: NaiveDate,
    pub status: String,
    pub submitted_at: Option<String>,
    pub notes: Option<String>,
    pub child_name: String,
    pub chore_title: String,
    pub points: i64,
    pub is_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalListResponse {
    pub date: NaiveDate,
    pub approvals: Vec<PendingApproval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub instance_id: String,
    /// One of "approved", "rejected", "excused"
    pub action: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub instance_id: String,
    pub new_status: String,
}

/// Saturday..Friday span a settlement run aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Per-child settlement outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaydayChildResult {
    pub child_id: String,
    pub name: String,
    pub eligible: bool,
    /// Capped payout; zero when ineligible
    pub points: i64,
    /// Uncapped approved-point total for the window
    pub raw_points: i64,
    /// Titles of required chores with no qualifying instance
    pub missing_chores: Vec<String>,
}

/// A child whose settlement could not be completed this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaydayFailure {
    pub child_id: String,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaydayResponse {
    pub window: WeekWindow,
    pub cap_points: i64,
    pub results: Vec<PaydayChildResult>,
    pub failures: Vec<PaydayFailure>,
}

/// Weekly settlement rule for one parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRule {
    pub weekly_cap_points: i64,
    pub strict_mode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRuleRequest {
    pub weekly_cap_points: Option<i64>,
    pub strict_mode: Option<bool>,
}

/// One entry of a child's notification feed. Append-only apart from `read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    /// Message class: "success", "info", "warning" or "payday"
    #[serde(rename = "type")]
    pub kind: String,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkReadRequest {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub mark_all: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub marked: u64,
}

/// Current authenticated identity, as resolved from the session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeResponse {
    pub user_type: String,
    pub id: String,
    pub display_name: Option<String>,
    /// Present only for child sessions
    pub parent_id: Option<String>,
}
