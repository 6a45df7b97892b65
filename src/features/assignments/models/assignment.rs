use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Result of an auto-assignment attempt. Only `Assigned` changes state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Assigned { user_id: String },
    AlreadyAssigned,
    /// The ticket has no category yet
    Unclassified,
    /// Nobody is registered for the ticket's category
    NoEligibleTechnician,
}

impl AssignmentOutcome {
    pub fn message(&self) -> String {
        match self {
            AssignmentOutcome::Assigned { user_id } => format!("Assigned to {}", user_id),
            AssignmentOutcome::AlreadyAssigned => "Ticket is already assigned".to_string(),
            AssignmentOutcome::Unclassified => {
                "Ticket has no category; it stays unassigned".to_string()
            }
            AssignmentOutcome::NoEligibleTechnician => {
                "No technician covers the ticket's category".to_string()
            }
        }
    }
}

/// Technician and the number of open tickets assigned to them
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TechnicianLoad {
    pub user_id: String,
    pub open_tickets: i64,
}

/// Candidate for manual assignment
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct AssignableUser {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    pub open_tickets: i64,
}
