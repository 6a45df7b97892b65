use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::features::assignments::handlers;
use crate::features::assignments::services::AssignmentService;

pub fn routes(service: Arc<AssignmentService>) -> Router {
    Router::new()
        .route("/api/tickets/{id}/auto-assign", post(handlers::auto_assign))
        .route(
            "/api/tickets/{id}/assignable-users",
            get(handlers::list_assignable_users),
        )
        .route(
            "/api/tickets/{id}/assignees",
            get(handlers::list_assignees).post(handlers::assign_user),
        )
        .route(
            "/api/tickets/{id}/assignees/{user_id}",
            delete(handlers::unassign_user),
        )
        .with_state(service)
}
