use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::categories::dtos::CategoryResponseDto;
use crate::features::comments::dtos::CommentResponseDto;
use crate::features::products::models::ProductOption;
use crate::features::tickets::models::{
    Assignee, Priority, Ticket, TicketCompletion, TicketListItem, TicketStatus,
};

/// Response DTO for ticket
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketResponseDto {
    pub ticket_id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category_id: Option<i32>,
    pub product_id: String,
    pub assigned: bool,
    pub issue_date: DateTime<Utc>,
    pub update_date: Option<DateTime<Utc>>,
    pub complete_date: Option<DateTime<Utc>>,
    pub update_user_id: Option<String>,
}

impl From<Ticket> for TicketResponseDto {
    fn from(t: Ticket) -> Self {
        Self {
            ticket_id: t.ticket_id,
            user_id: t.user_id,
            title: t.ticket_title,
            description: t.ticket_description,
            status: t.status,
            priority: t.priority,
            category_id: t.category_id,
            product_id: t.product_id,
            assigned: t.assigned,
            issue_date: t.issue_date,
            update_date: t.update_date,
            complete_date: t.complete_date,
            update_user_id: t.update_user_id,
        }
    }
}

/// List row for ticket tables
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketSummaryDto {
    pub ticket_id: String,
    pub user_id: String,
    pub title: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub assigned: bool,
    pub category_name: Option<String>,
    pub product_id: String,
    pub product_name: Option<String>,
    pub issue_date: DateTime<Utc>,
    pub update_date: Option<DateTime<Utc>>,
}

impl From<TicketListItem> for TicketSummaryDto {
    fn from(item: TicketListItem) -> Self {
        let t = item.ticket;
        Self {
            ticket_id: t.ticket_id,
            user_id: t.user_id,
            title: t.ticket_title,
            status: t.status,
            priority: t.priority,
            assigned: t.assigned,
            category_name: item.category_name,
            product_id: t.product_id,
            product_name: item.product_name,
            issue_date: t.issue_date,
            update_date: t.update_date,
        }
    }
}

/// Ticket page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketDetailsDto {
    pub ticket: TicketResponseDto,
    pub category: Option<CategoryResponseDto>,
    pub product: Option<ProductOption>,
    pub assignees: Vec<Assignee>,
    pub comments: Vec<CommentResponseDto>,
    /// Whether the requesting user filed the ticket
    pub is_owner: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketCompletionResponseDto {
    pub completion_id: i32,
    pub ticket_id: String,
    pub user_id: String,
    pub question: Option<String>,
    pub answer: String,
    pub category_id: Option<i32>,
    pub difficulty: Priority,
    pub completion_date: DateTime<Utc>,
}

impl From<TicketCompletion> for TicketCompletionResponseDto {
    fn from(c: TicketCompletion) -> Self {
        Self {
            completion_id: c.completion_id,
            ticket_id: c.ticket_id,
            user_id: c.user_id,
            question: c.question,
            answer: c.answer,
            category_id: c.category_id,
            difficulty: c.difficulty,
            completion_date: c.completion_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketCompletionDetailsDto {
    pub completion: TicketCompletionResponseDto,
    pub ticket: TicketDetailsDto,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTicketDto {
    #[validate(length(min = 6, max = 70, message = "Title must be 6-70 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 400, message = "Description must be 1-400 characters"))]
    pub description: String,
    /// Product the ticket is filed against; omit for the default product
    pub product_id: Option<String>,
}

/// Full edit of a ticket's editable fields
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTicketDto {
    #[validate(length(min = 6, max = 70, message = "Title must be 6-70 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 400, message = "Description must be 1-400 characters"))]
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCompletionDto {
    /// Defaults to the ticket description
    #[validate(length(max = 400, message = "Question must be at most 400 characters"))]
    pub question: Option<String>,
    #[validate(length(min = 1, max = 400, message = "Answer must be 1-400 characters"))]
    pub answer: String,
    /// Defaults to the ticket category
    pub category_id: Option<i32>,
    pub difficulty: Priority,
}

/// Query params for ticket lists
#[derive(Debug, Deserialize, IntoParams)]
pub struct TicketListQuery {
    /// Show completed/canceled tickets instead of open ones. Default: false
    #[serde(default)]
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ticket_validation() {
        let valid = CreateTicketDto {
            title: "VPN drops hourly".to_string(),
            description: "Connection resets every hour".to_string(),
            product_id: None,
        };
        assert!(valid.validate().is_ok());

        let short_title = CreateTicketDto {
            title: "VPN".to_string(),
            ..valid.clone()
        };
        assert!(short_title.validate().is_err());

        let long_title = CreateTicketDto {
            title: "x".repeat(71),
            ..valid.clone()
        };
        assert!(long_title.validate().is_err());

        let empty_description = CreateTicketDto {
            description: String::new(),
            ..valid
        };
        assert!(empty_description.validate().is_err());
    }

    #[test]
    fn test_update_ticket_accepts_lowercase_enums() {
        let dto: UpdateTicketDto = serde_json::from_value(serde_json::json!({
            "title": "Printer jams on tray 2",
            "description": "Paper jams every few pages",
            "status": "paused",
            "priority": "high",
            "category_id": 4
        }))
        .unwrap();

        assert_eq!(dto.status, TicketStatus::Paused);
        assert_eq!(dto.priority, Priority::High);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_completion_answer_required() {
        let dto = CreateCompletionDto {
            question: None,
            answer: String::new(),
            category_id: None,
            difficulty: Priority::Low,
        };
        assert!(dto.validate().is_err());
    }
}
