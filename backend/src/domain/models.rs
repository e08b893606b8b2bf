use std::fmt;

use uuid::Uuid;

/// Lifecycle state of one (chore, child, day) ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Submitted,
    Approved,
    Rejected,
    Excused,
}

impl InstanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Submitted => "submitted",
            InstanceStatus::Approved => "approved",
            InstanceStatus::Rejected => "rejected",
            InstanceStatus::Excused => "excused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(InstanceStatus::Submitted),
            "approved" => Some(InstanceStatus::Approved),
            "rejected" => Some(InstanceStatus::Rejected),
            "excused" => Some(InstanceStatus::Excused),
            _ => None,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parent decision on a submitted instance. Terminal for that day;
/// re-entry happens only through a fresh check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approved,
    Rejected,
    Excused,
}

impl ReviewAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewAction::Approved => "approved",
            ReviewAction::Rejected => "rejected",
            ReviewAction::Excused => "excused",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "approved" => Some(ReviewAction::Approved),
            "rejected" => Some(ReviewAction::Rejected),
            "excused" => Some(ReviewAction::Excused),
            _ => None,
        }
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message class on a notification feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Payday,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
            NotificationKind::Payday => "payday",
        }
    }
}

/// Generate a short prefixed identifier, e.g. "CI_3f9a2c81d04e".
pub fn new_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &hex[..12])
}

/// Alphabet for child login codes; drops 0/O/I/L/1 to avoid ambiguity.
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate an 8-character child login code.
pub fn generate_child_code() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(8)
        .map(|b| CODE_CHARS[*b as usize % CODE_CHARS.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            InstanceStatus::Submitted,
            InstanceStatus::Approved,
            InstanceStatus::Rejected,
            InstanceStatus::Excused,
        ] {
            assert_eq!(InstanceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InstanceStatus::parse("pending"), None);
    }

    #[test]
    fn test_review_action_parse() {
        assert_eq!(ReviewAction::parse("approved"), Some(ReviewAction::Approved));
        assert_eq!(ReviewAction::parse("rejected"), Some(ReviewAction::Rejected));
        assert_eq!(ReviewAction::parse("excused"), Some(ReviewAction::Excused));
        assert_eq!(ReviewAction::parse("submitted"), None);
        assert_eq!(ReviewAction::parse("APPROVED"), None);
    }

    #[test]
    fn test_new_id_shape() {
        let id = new_id("CI_");
        assert!(id.starts_with("CI_"));
        assert_eq!(id.len(), 3 + 12);
    }

    #[test]
    fn test_child_code_alphabet() {
        for _ in 0..50 {
            let code = generate_child_code();
            assert_eq!(code.len(), 8);
            for ch in code.bytes() {
                assert!(CODE_CHARS.contains(&ch), "unexpected char {}", ch as char);
            }
        }
    }
}
