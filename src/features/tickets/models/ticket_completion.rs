use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::Priority;

/// Resolution record, one per completed ticket
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct TicketCompletion {
    pub completion_id: i32,
    pub ticket_id: String,
    pub user_id: String,
    pub question: Option<String>,
    pub answer: String,
    pub category_id: Option<i32>,
    pub difficulty: Priority,
    pub completion_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTicketCompletion {
    pub ticket_id: String,
    pub user_id: String,
    pub question: Option<String>,
    pub answer: String,
    pub category_id: Option<i32>,
    pub difficulty: Priority,
}
