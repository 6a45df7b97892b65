use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Local profile of an identity-provider user. A user with a category is a
/// technician for that category.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct AppUser {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub category_id: Option<i32>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields taken from the access token
#[derive(Debug, Clone)]
pub struct SyncAppUser {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}
