use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::products::models::Product;
use crate::features::products::services::ProductDetails;
use crate::features::tickets::dtos::TicketSummaryDto;

/// Response DTO for product
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponseDto {
    pub product_id: String,
    pub product_name: String,
    pub product_description: Option<String>,
    pub user_id: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub update_user_id: Option<String>,
    pub update_date: Option<DateTime<Utc>>,
}

impl From<Product> for ProductResponseDto {
    fn from(p: Product) -> Self {
        Self {
            product_id: p.product_id,
            product_name: p.product_name,
            product_description: p.product_description,
            user_id: p.user_id,
            release_date: p.release_date,
            update_user_id: p.update_user_id,
            update_date: p.update_date,
        }
    }
}

/// Product page: the product, its ticket code and its tickets
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductDetailsDto {
    pub product: ProductResponseDto,
    pub code: Option<String>,
    /// Sequence number the next ticket will receive
    pub next_sequence: Option<i32>,
    /// Whether the requesting user created the product
    pub is_owner: bool,
    pub tickets: Vec<TicketSummaryDto>,
}

impl ProductDetailsDto {
    pub fn new(details: ProductDetails, requester_id: &str) -> Self {
        let is_owner = details.product.user_id.as_deref() == Some(requester_id);
        Self {
            code: details.code.as_ref().map(|c| c.code.clone()),
            next_sequence: details.code.as_ref().map(|c| c.count),
            is_owner,
            product: details.product.into(),
            tickets: details.tickets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response returned after creating a product
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductCreatedDto {
    pub product: ProductResponseDto,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductDto {
    #[validate(length(min = 6, max = 60, message = "Product name must be 6-60 characters"))]
    pub product_name: String,
    #[validate(length(max = 400, message = "Product description must be at most 400 characters"))]
    pub product_description: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProductDto {
    #[validate(length(min = 6, max = 60, message = "Product name must be 6-60 characters"))]
    pub product_name: String,
    #[validate(length(max = 400, message = "Product description must be at most 400 characters"))]
    pub product_description: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
}

/// Query params for the product page
#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductDetailsQuery {
    /// Show completed/canceled tickets instead of open ones. Default: false
    #[serde(default)]
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_product_validation() {
        let valid = CreateProductDto {
            product_name: "Payroll Portal".to_string(),
            product_description: None,
            release_date: None,
        };
        assert!(valid.validate().is_ok());

        let short = CreateProductDto {
            product_name: "ERP".to_string(),
            ..valid.clone()
        };
        assert!(short.validate().is_err());

        let long_description = CreateProductDto {
            product_description: Some("x".repeat(401)),
            ..valid
        };
        assert!(long_description.validate().is_err());
    }
}
