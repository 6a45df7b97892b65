use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::users::models::AppUser;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponseDto {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Specialty category; set for technicians only
    pub category_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AppUser> for UserResponseDto {
    fn from(u: AppUser) -> Self {
        Self {
            user_id: u.user_id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            category_id: u.category_id,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// `null` removes the user's technician specialty
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SetCategoryDto {
    pub category_id: Option<i32>,
}
