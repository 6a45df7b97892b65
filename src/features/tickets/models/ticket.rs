use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;

/// Ticket status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Paused,
    Complete,
    Canceled,
}

impl TicketStatus {
    pub const OPEN: [TicketStatus; 2] = [TicketStatus::Active, TicketStatus::Paused];
    pub const CLOSED: [TicketStatus; 2] = [TicketStatus::Complete, TicketStatus::Canceled];

    /// Status group used by the completed/open list filters
    pub fn group(completed: bool) -> [TicketStatus; 2] {
        if completed {
            Self::CLOSED
        } else {
            Self::OPEN
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Complete | TicketStatus::Canceled)
    }

    /// Active and Paused may move to any status (including staying put);
    /// Complete and Canceled are terminal.
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        match self {
            TicketStatus::Active | TicketStatus::Paused => true,
            TicketStatus::Complete | TicketStatus::Canceled => *self == next,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Active => write!(f, "active"),
            TicketStatus::Paused => write!(f, "paused"),
            TicketStatus::Complete => write!(f, "complete"),
            TicketStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "ticket_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Parse a predicted priority label. Matching ignores case and surrounding
    /// whitespace; anything unrecognised is `Low`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            _ => Priority::Low,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// Database model for ticket
#[derive(Debug, Clone, FromRow)]
pub struct Ticket {
    pub ticket_id: String,
    pub user_id: String,
    pub ticket_title: String,
    pub ticket_description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category_id: Option<i32>,
    pub product_id: String,
    pub assigned: bool,
    pub is_deleted: bool,
    pub issue_date: DateTime<Utc>,
    pub update_date: Option<DateTime<Utc>>,
    pub complete_date: Option<DateTime<Utc>>,
    pub update_user_id: Option<String>,
}

/// Input for creating a ticket
#[derive(Debug, Clone)]
pub struct CreateTicket {
    pub user_id: String,
    pub title: String,
    pub description: String,
    /// Falls back to the DEFAULT product when absent or blank
    pub product_id: Option<String>,
}

/// Full-row edit of a ticket's user-editable fields
#[derive(Debug, Clone)]
pub struct UpdateTicket {
    pub ticket_id: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category_id: Option<i32>,
    pub update_user_id: String,
}

/// Ticket row joined with display names, used by list views
#[derive(Debug, Clone, FromRow)]
pub struct TicketListItem {
    #[sqlx(flatten)]
    pub ticket: Ticket,
    pub category_name: Option<String>,
    pub product_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_statuses_can_move_anywhere() {
        for from in TicketStatus::OPEN {
            for to in [
                TicketStatus::Active,
                TicketStatus::Paused,
                TicketStatus::Complete,
                TicketStatus::Canceled,
            ] {
                assert!(from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_terminal_statuses_are_final() {
        for from in TicketStatus::CLOSED {
            assert!(from.is_terminal());
            assert!(!from.can_transition_to(TicketStatus::Active));
            assert!(!from.can_transition_to(TicketStatus::Paused));
        }
        assert!(!TicketStatus::Complete.can_transition_to(TicketStatus::Canceled));
        assert!(!TicketStatus::Active.is_terminal());
    }

    #[test]
    fn test_status_group() {
        assert_eq!(
            TicketStatus::group(false),
            [TicketStatus::Active, TicketStatus::Paused]
        );
        assert_eq!(
            TicketStatus::group(true),
            [TicketStatus::Complete, TicketStatus::Canceled]
        );
    }

    #[test]
    fn test_priority_from_label() {
        assert_eq!(Priority::from_label("High"), Priority::High);
        assert_eq!(Priority::from_label(" MEDIUM "), Priority::Medium);
        assert_eq!(Priority::from_label("low"), Priority::Low);
        assert_eq!(Priority::from_label("urgent"), Priority::Low);
        assert_eq!(Priority::from_label(""), Priority::Low);
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&TicketStatus::Canceled).unwrap(),
            "\"canceled\""
        );
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
    }
}
