use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::categories::models::HelpDeskCategory;

/// Response DTO for a help desk category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: i32,
    pub name: String,
}

impl From<HelpDeskCategory> for CategoryResponseDto {
    fn from(c: HelpDeskCategory) -> Self {
        Self {
            id: c.category_id,
            name: c.category_name,
        }
    }
}
