use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::auth::guards::{RequireAdmin, RequireTechnician};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::tickets::models::Assignee;
use crate::features::users::dtos::{SetCategoryDto, UserResponseDto};
use crate::features::users::models::SyncAppUser;
use crate::features::users::services::UserService;
use crate::shared::types::ApiResponse;

fn sync_input(user: AuthenticatedUser) -> SyncAppUser {
    SyncAppUser {
        user_id: user.user_id,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
    }
}

/// The caller's local profile. Created from the token on first access.
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<UserResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(
    user: AuthenticatedUser,
    State(service): State<Arc<UserService>>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    let profile = if service.is_existing_user(&user.user_id).await? {
        service.get_user(&user.user_id).await?
    } else {
        service.sync_user(sync_input(user)).await?
    };
    Ok(Json(ApiResponse::success(Some(profile.into()), None, None)))
}

/// Create or refresh the caller's profile from their access token
#[utoipa::path(
    put,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Profile synced", body = ApiResponse<UserResponseDto>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn sync_me(
    user: AuthenticatedUser,
    State(service): State<Arc<UserService>>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    let profile = service.sync_user(sync_input(user)).await?;

    Ok(Json(ApiResponse::success(
        Some(profile.into()),
        Some("Profile synced".to_string()),
        None,
    )))
}

#[utoipa::path(
    get,
    path = "/api/users/technicians",
    responses(
        (status = 200, description = "Technicians with their categories", body = ApiResponse<Vec<Assignee>>),
        (status = 403, description = "Technician access required")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_technicians(
    RequireTechnician(_user): RequireTechnician,
    State(service): State<Arc<UserService>>,
) -> Result<Json<ApiResponse<Vec<Assignee>>>> {
    let technicians = service.list_technicians().await?;
    Ok(Json(ApiResponse::list(technicians)))
}

/// Set or clear a user's technician category (Admin only)
#[utoipa::path(
    put,
    path = "/api/users/{id}/category",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    request_body = SetCategoryDto,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<UserResponseDto>),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "User or category not found")
    ),
    tag = "users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_category(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<UserService>>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<SetCategoryDto>,
) -> Result<Json<ApiResponse<UserResponseDto>>> {
    let user = service.set_category(&id, dto.category_id).await?;
    Ok(Json(ApiResponse::success(Some(user.into()), None, None)))
}

#[cfg(test)]
mod tests {
    use crate::features::auth::model::Role;
    use crate::features::users::routes;
    use crate::features::users::services::UserService;
    use crate::shared::test_helpers::{lazy_pool, with_auth};
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;

    fn server(role: Role) -> TestServer {
        let service = Arc::new(UserService::new(lazy_pool()));
        TestServer::new(with_auth(routes::routes(service), role)).unwrap()
    }

    #[tokio::test]
    async fn test_set_category_requires_admin() {
        let response = server(Role::Technician)
            .put("/api/users/tech-a/category")
            .json(&json!({ "category_id": 1 }))
            .await;
        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_list_technicians_requires_technician() {
        let response = server(Role::EndUser).get("/api/users/technicians").await;
        response.assert_status_forbidden();
    }
}
