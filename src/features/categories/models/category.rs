use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Reference data shared by technicians (specialty) and tickets (classification)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct HelpDeskCategory {
    pub category_id: i32,
    pub category_name: String,
}
