use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::RequireAdmin;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::products::dtos::{
    CreateProductDto, ProductCreatedDto, ProductDetailsDto, ProductDetailsQuery,
    ProductResponseDto, UpdateProductDto,
};
use crate::features::products::models::{CreateProduct, ProductOption, UpdateProduct};
use crate::features::products::services::ProductService;
use crate::shared::types::ApiResponse;

/// List displayed products, newest release first
#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "List of products", body = ApiResponse<Vec<ProductResponseDto>>),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn list_products(
    _user: AuthenticatedUser,
    State(service): State<Arc<ProductService>>,
) -> Result<Json<ApiResponse<Vec<ProductResponseDto>>>> {
    let products = service.list_products().await?;
    let items = products.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::list(items)))
}

/// Product id/name pairs for pickers
#[utoipa::path(
    get,
    path = "/api/products/options",
    responses(
        (status = 200, description = "Product options", body = ApiResponse<Vec<ProductOption>>),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn list_product_options(
    _user: AuthenticatedUser,
    State(service): State<Arc<ProductService>>,
) -> Result<Json<ApiResponse<Vec<ProductOption>>>> {
    let options = service.list_product_options().await?;
    Ok(Json(ApiResponse::list(options)))
}

/// Product details with its open or completed tickets
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = String, Path, description = "Product ID"),
        ProductDetailsQuery
    ),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<ProductDetailsDto>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn get_product(
    user: AuthenticatedUser,
    State(service): State<Arc<ProductService>>,
    Path(id): Path<String>,
    AppQuery(query): AppQuery<ProductDetailsQuery>,
) -> Result<Json<ApiResponse<ProductDetailsDto>>> {
    let details = service.get_product_details(&id, query.completed).await?;
    let dto = ProductDetailsDto::new(details, &user.user_id);
    Ok(Json(ApiResponse::success(Some(dto), None, None)))
}

/// Create a product and its ticket code (Admin only)
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductDto,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductCreatedDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin access required"),
        (status = 409, description = "Could not generate a unique product code")
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn create_product(
    RequireAdmin(user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    AppJson(dto): AppJson<CreateProductDto>,
) -> Result<(StatusCode, Json<ApiResponse<ProductCreatedDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (product, code) = service
        .create_product(CreateProduct {
            product_name: dto.product_name,
            product_description: dto.product_description,
            release_date: dto.release_date,
            user_id: user.user_id,
        })
        .await?;

    let created = ProductCreatedDto {
        product: product.into(),
        code: code.code,
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(created), None, None)),
    ))
}

/// Update a product (Admin only)
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = String, Path, description = "Product ID")
    ),
    request_body = UpdateProductDto,
    responses(
        (status = 200, description = "Product updated, or unchanged", body = ApiResponse<ProductResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
pub async fn update_product(
    RequireAdmin(user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<UpdateProductDto>,
) -> Result<Json<ApiResponse<ProductResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // 404 before attempting the update
    service.get_product_edit(&id).await?;

    let changed = service
        .update_product(UpdateProduct {
            product_id: id.clone(),
            product_name: dto.product_name,
            product_description: dto.product_description,
            release_date: dto.release_date,
            update_user_id: user.user_id,
        })
        .await?;

    let product = service.get_product_edit(&id).await?;
    let message = (!changed).then(|| "No changes detected".to_string());

    Ok(Json(ApiResponse::success(Some(product.into()), message, None)))
}
