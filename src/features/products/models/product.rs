use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Database model for product
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    pub product_description: Option<String>,
    pub user_id: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub update_user_id: Option<String>,
    pub update_date: Option<DateTime<Utc>>,
    pub is_displayed: bool,
    pub is_deleted: bool,
}

#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub product_name: String,
    pub product_description: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProduct {
    pub product_id: String,
    pub product_name: String,
    pub product_description: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub update_user_id: String,
}

/// Id/name pair for product pickers
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct ProductOption {
    pub product_id: String,
    pub product_name: String,
}
