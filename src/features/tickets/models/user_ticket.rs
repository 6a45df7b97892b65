use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Technician assigned to a ticket, with their specialty
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Assignee {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
}
