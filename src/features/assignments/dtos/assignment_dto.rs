use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AssignUserDto {
    #[validate(length(min = 1, message = "User ID is required"))]
    pub user_id: String,
}

/// Query params for assignment candidates
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AssignableUsersQuery {
    /// Category whose technicians are listed first
    pub category_id: Option<i32>,
}
