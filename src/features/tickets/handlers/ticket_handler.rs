use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::auth::guards::RequireTechnician;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::comments::services::CommentService;
use crate::features::predictions::services::PredictionQueueService;
use crate::features::tickets::dtos::{
    CreateCompletionDto, CreateTicketDto, TicketCompletionDetailsDto,
    TicketCompletionResponseDto, TicketDetailsDto, TicketListQuery, TicketResponseDto,
    TicketSummaryDto, UpdateTicketDto,
};
use crate::features::tickets::models::{
    CreateTicket, CreateTicketCompletion, TicketStatus, UpdateTicket,
};
use crate::features::tickets::services::{TicketDetails, TicketService};
use crate::shared::types::ApiResponse;
use crate::shared::validation::ensure_ticket_id;

/// State for ticket handlers
#[derive(Clone)]
pub struct TicketState {
    pub ticket_service: Arc<TicketService>,
    pub comment_service: Arc<CommentService>,
    pub queue_service: Arc<PredictionQueueService>,
}

async fn details_dto(
    state: &TicketState,
    details: TicketDetails,
    requester_id: &str,
) -> TicketDetailsDto {
    let comments = state
        .comment_service
        .with_download_urls(details.comments)
        .await;

    TicketDetailsDto {
        is_owner: details.ticket.user_id == requester_id,
        ticket: details.ticket.into(),
        category: details.category.map(Into::into),
        product: details.product,
        assignees: details.assignees,
        comments,
    }
}

/// Tickets visible to the caller: their own, those assigned to them, and
/// unassigned ones
#[utoipa::path(
    get,
    path = "/api/tickets",
    params(TicketListQuery),
    responses(
        (status = 200, description = "List of tickets", body = ApiResponse<Vec<TicketSummaryDto>>),
    ),
    security(("bearer_auth" = [])),
    tag = "tickets"
)]
pub async fn list_tickets(
    user: AuthenticatedUser,
    State(state): State<TicketState>,
    AppQuery(query): AppQuery<TicketListQuery>,
) -> Result<Json<ApiResponse<Vec<TicketSummaryDto>>>> {
    let tickets = state
        .ticket_service
        .get_tickets(&user.user_id, query.completed)
        .await?;
    let items = tickets.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::list(items)))
}

/// File a ticket. Classification and assignment happen asynchronously.
#[utoipa::path(
    post,
    path = "/api/tickets",
    request_body = CreateTicketDto,
    responses(
        (status = 201, description = "Ticket created", body = ApiResponse<TicketResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Product has no ticket code")
    ),
    security(("bearer_auth" = [])),
    tag = "tickets"
)]
pub async fn create_ticket(
    user: AuthenticatedUser,
    State(state): State<TicketState>,
    AppJson(dto): AppJson<CreateTicketDto>,
) -> Result<(StatusCode, Json<ApiResponse<TicketResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let ticket = state
        .ticket_service
        .create_ticket(CreateTicket {
            user_id: user.user_id.clone(),
            title: dto.title,
            description: dto.description,
            product_id: dto.product_id,
        })
        .await?;

    // The ticket stands even if classification can't be queued
    if let Err(e) = state
        .queue_service
        .enqueue(&ticket.ticket_id, &user.user_id, user.role)
        .await
    {
        tracing::warn!(
            "Ticket {} created but prediction was not queued: {}",
            ticket.ticket_id,
            e
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(ticket.into()), None, None)),
    ))
}

/// Ticket with category, product, assignees and comments
#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    params(
        ("id" = String, Path, description = "Ticket ID, e.g. DEFAULT-12")
    ),
    responses(
        (status = 200, description = "Ticket found", body = ApiResponse<TicketDetailsDto>),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearer_auth" = [])),
    tag = "tickets"
)]
pub async fn get_ticket(
    user: AuthenticatedUser,
    State(state): State<TicketState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TicketDetailsDto>>> {
    ensure_ticket_id(&id)?;
    let details = state.ticket_service.get_ticket_details(&id).await?;
    let dto = details_dto(&state, details, &user.user_id).await;
    Ok(Json(ApiResponse::success(Some(dto), None, None)))
}

/// Edit a ticket. Completing goes through the completion endpoint, and
/// closed tickets can't be edited.
#[utoipa::path(
    put,
    path = "/api/tickets/{id}",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    request_body = UpdateTicketDto,
    responses(
        (status = 200, description = "Ticket updated, or unchanged", body = ApiResponse<TicketResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Ticket not found"),
        (status = 409, description = "Ticket is closed")
    ),
    security(("bearer_auth" = [])),
    tag = "tickets"
)]
pub async fn update_ticket(
    user: AuthenticatedUser,
    State(state): State<TicketState>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<UpdateTicketDto>,
) -> Result<Json<ApiResponse<TicketResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if dto.status == TicketStatus::Complete {
        return Err(AppError::BadRequest(
            "Tickets are completed through the completion endpoint".to_string(),
        ));
    }

    ensure_ticket_id(&id)?;
    let current = state.ticket_service.get_ticket_edit(&id).await?;

    if current.status.is_terminal() || !current.status.can_transition_to(dto.status) {
        return Err(AppError::Conflict(format!(
            "Ticket {} is {} and can no longer be edited",
            id, current.status
        )));
    }

    let changed = state
        .ticket_service
        .update_ticket(UpdateTicket {
            ticket_id: id.clone(),
            title: dto.title,
            description: dto.description,
            status: dto.status,
            priority: dto.priority,
            category_id: dto.category_id,
            update_user_id: user.user_id,
        })
        .await?;

    let ticket = state.ticket_service.get_ticket_edit(&id).await?;
    let message = (!changed).then(|| "No changes detected".to_string());

    Ok(Json(ApiResponse::success(Some(ticket.into()), message, None)))
}

/// Soft-delete a ticket (Admin or the ticket's owner)
#[utoipa::path(
    delete,
    path = "/api/tickets/{id}",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Ticket deleted"),
        (status = 403, description = "Only the owner or an admin may delete"),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearer_auth" = [])),
    tag = "tickets"
)]
pub async fn delete_ticket(
    user: AuthenticatedUser,
    State(state): State<TicketState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    ensure_ticket_id(&id)?;
    let ticket = state.ticket_service.get_ticket_edit(&id).await?;

    if !user.is_admin() && ticket.user_id != user.user_id {
        return Err(AppError::Forbidden(
            "Only the ticket owner or an admin can delete it".to_string(),
        ));
    }

    if !state.ticket_service.delete_ticket(&id, &user.user_id).await? {
        return Err(AppError::NotFound(format!("Ticket {} not found", id)));
    }

    Ok(Json(ApiResponse::success(
        None,
        Some(format!("Ticket {} deleted", id)),
        None,
    )))
}

/// Resolve a ticket (Technician or Admin)
#[utoipa::path(
    post,
    path = "/api/tickets/{id}/completion",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    request_body = CreateCompletionDto,
    responses(
        (status = 201, description = "Ticket completed", body = ApiResponse<TicketCompletionResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Technician access required"),
        (status = 404, description = "Ticket not found"),
        (status = 409, description = "Ticket is already closed")
    ),
    security(("bearer_auth" = [])),
    tag = "tickets"
)]
pub async fn create_completion(
    RequireTechnician(user): RequireTechnician,
    State(state): State<TicketState>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<CreateCompletionDto>,
) -> Result<(StatusCode, Json<ApiResponse<TicketCompletionResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    ensure_ticket_id(&id)?;

    let completion = state
        .ticket_service
        .create_ticket_completion(CreateTicketCompletion {
            ticket_id: id,
            user_id: user.user_id,
            question: dto.question.filter(|q| !q.trim().is_empty()),
            answer: dto.answer,
            category_id: dto.category_id,
            difficulty: dto.difficulty,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(completion.into()), None, None)),
    ))
}

/// Resolution of a completed ticket, with the ticket it closed
#[utoipa::path(
    get,
    path = "/api/tickets/{id}/completion",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Completion found", body = ApiResponse<TicketCompletionDetailsDto>),
        (status = 404, description = "Ticket or completion not found")
    ),
    security(("bearer_auth" = [])),
    tag = "tickets"
)]
pub async fn get_completion(
    user: AuthenticatedUser,
    State(state): State<TicketState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TicketCompletionDetailsDto>>> {
    ensure_ticket_id(&id)?;
    let found = state
        .ticket_service
        .get_ticket_completion_details(&id)
        .await?;

    let dto = TicketCompletionDetailsDto {
        completion: found.completion.into(),
        ticket: details_dto(&state, found.details, &user.user_id).await,
    };

    Ok(Json(ApiResponse::success(Some(dto), None, None)))
}

#[cfg(test)]
mod tests {
    use super::TicketState;
    use crate::features::auth::model::Role;
    use crate::features::comments::services::CommentService;
    use crate::features::predictions::services::PredictionQueueService;
    use crate::features::tickets::routes;
    use crate::features::tickets::services::TicketService;
    use crate::shared::test_helpers::{lazy_pool, with_auth, MemoryStorage};
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn server(role: Role) -> TestServer {
        let pool = lazy_pool();
        let state = TicketState {
            ticket_service: Arc::new(TicketService::new(pool.clone())),
            comment_service: Arc::new(CommentService::new(
                pool.clone(),
                Arc::new(MemoryStorage::default()),
            )),
            queue_service: Arc::new(PredictionQueueService::new(
                pool,
                3,
                Duration::from_secs(300),
            )),
        };
        TestServer::new(with_auth(routes::routes(state), role)).unwrap()
    }

    #[tokio::test]
    async fn test_create_ticket_validates_title() {
        let response = server(Role::EndUser)
            .post("/api/tickets")
            .json(&json!({ "title": "VPN", "description": "Drops hourly" }))
            .await;

        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_update_cannot_complete_ticket() {
        let response = server(Role::Technician)
            .put("/api/tickets/DEFAULT-1")
            .json(&json!({
                "title": "VPN drops hourly",
                "description": "Connection resets",
                "status": "complete",
                "priority": "low"
            }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_completion_requires_technician() {
        let response = server(Role::EndUser)
            .post("/api/tickets/DEFAULT-1/completion")
            .json(&json!({ "answer": "Rebooted the router", "difficulty": "low" }))
            .await;

        response.assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_malformed_ticket_id_is_not_found() {
        let response = server(Role::Admin).get("/api/tickets/lowercase-1").await;
        response.assert_status_not_found();
    }
}
