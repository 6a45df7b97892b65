use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::assignments::dtos::{AssignUserDto, AssignableUsersQuery};
use crate::features::assignments::models::{AssignableUser, AssignmentOutcome};
use crate::features::assignments::services::AssignmentService;
use crate::features::auth::guards::{RequireAdmin, RequireTechnician};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::tickets::models::Assignee;
use crate::shared::types::ApiResponse;
use crate::shared::validation::ensure_ticket_id;

/// Assign the least-loaded technician of the ticket's category (Admin only)
#[utoipa::path(
    post,
    path = "/api/tickets/{id}/auto-assign",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Assignment attempted", body = ApiResponse<AssignmentOutcome>),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn auto_assign(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AssignmentService>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AssignmentOutcome>>> {
    ensure_ticket_id(&id)?;
    let outcome = service.auto_assign(&id).await?;
    let message = outcome.message();
    Ok(Json(ApiResponse::success(Some(outcome), Some(message), None)))
}

/// Technicians who could be added to the ticket
#[utoipa::path(
    get,
    path = "/api/tickets/{id}/assignable-users",
    params(
        ("id" = String, Path, description = "Ticket ID"),
        AssignableUsersQuery
    ),
    responses(
        (status = 200, description = "Candidates", body = ApiResponse<Vec<AssignableUser>>),
        (status = 403, description = "Technician access required"),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn list_assignable_users(
    RequireTechnician(_user): RequireTechnician,
    State(service): State<Arc<AssignmentService>>,
    Path(id): Path<String>,
    AppQuery(query): AppQuery<AssignableUsersQuery>,
) -> Result<Json<ApiResponse<Vec<AssignableUser>>>> {
    ensure_ticket_id(&id)?;
    let users = service.get_assignable_users(&id, query.category_id).await?;
    Ok(Json(ApiResponse::list(users)))
}

/// Technicians working the ticket
#[utoipa::path(
    get,
    path = "/api/tickets/{id}/assignees",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Assignees", body = ApiResponse<Vec<Assignee>>),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn list_assignees(
    _user: AuthenticatedUser,
    State(service): State<Arc<AssignmentService>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Assignee>>>> {
    ensure_ticket_id(&id)?;
    let assignees = service.get_assignees(&id).await?;
    Ok(Json(ApiResponse::list(assignees)))
}

/// Add a technician to the ticket
#[utoipa::path(
    post,
    path = "/api/tickets/{id}/assignees",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    request_body = AssignUserDto,
    responses(
        (status = 200, description = "Assigned, or already assigned"),
        (status = 403, description = "Technician access required"),
        (status = 404, description = "Ticket or user not found")
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn assign_user(
    RequireTechnician(_user): RequireTechnician,
    State(service): State<Arc<AssignmentService>>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<AssignUserDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    ensure_ticket_id(&id)?;

    let message = if service.assign_user(&id, &dto.user_id).await? {
        format!("{} assigned to {}", dto.user_id, id)
    } else {
        format!("{} is already assigned to {}", dto.user_id, id)
    };

    Ok(Json(ApiResponse::success(None, Some(message), None)))
}

/// Remove a technician from the ticket
#[utoipa::path(
    delete,
    path = "/api/tickets/{id}/assignees/{user_id}",
    params(
        ("id" = String, Path, description = "Ticket ID"),
        ("user_id" = String, Path, description = "Assignee user ID")
    ),
    responses(
        (status = 200, description = "Unassigned"),
        (status = 403, description = "Technician access required"),
        (status = 404, description = "Ticket not found or user not assigned")
    ),
    security(("bearer_auth" = [])),
    tag = "assignments"
)]
pub async fn unassign_user(
    RequireTechnician(_user): RequireTechnician,
    State(service): State<Arc<AssignmentService>>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<()>>> {
    ensure_ticket_id(&id)?;

    if !service.unassign_user(&id, &user_id).await? {
        return Err(AppError::NotFound(format!(
            "{} is not assigned to {}",
            user_id, id
        )));
    }

    Ok(Json(ApiResponse::success(
        None,
        Some(format!("{} unassigned from {}", user_id, id)),
        None,
    )))
}

#[cfg(test)]
mod tests {
    use crate::features::assignments::routes;
    use crate::features::assignments::services::AssignmentService;
    use crate::features::auth::model::Role;
    use crate::features::tickets::services::TicketService;
    use crate::shared::test_helpers::{lazy_pool, with_auth};
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;

    fn server(role: Role) -> TestServer {
        let pool = lazy_pool();
        let tickets = Arc::new(TicketService::new(pool.clone()));
        let service = Arc::new(AssignmentService::new(pool, tickets));
        TestServer::new(with_auth(routes::routes(service), role)).unwrap()
    }

    #[tokio::test]
    async fn test_auto_assign_requires_admin() {
        let response = server(Role::Technician)
            .post("/api/tickets/DEFAULT-1/auto-assign")
            .await;
        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_end_user_cannot_assign() {
        let response = server(Role::EndUser)
            .post("/api/tickets/DEFAULT-1/assignees")
            .json(&json!({ "user_id": "tech-a" }))
            .await;
        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_end_user_cannot_unassign() {
        let response = server(Role::EndUser)
            .delete("/api/tickets/DEFAULT-1/assignees/tech-a")
            .await;
        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_assign_requires_user_id() {
        let response = server(Role::Technician)
            .post("/api/tickets/DEFAULT-1/assignees")
            .json(&json!({ "user_id": "" }))
            .await;
        response.assert_status_bad_request();
    }
}
