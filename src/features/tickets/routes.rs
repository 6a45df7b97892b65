use axum::{routing::get, Router};

use crate::features::tickets::handlers::{self, TicketState};

/// Create routes for the tickets feature
///
/// Note: This feature requires authentication
pub fn routes(state: TicketState) -> Router {
    Router::new()
        .route(
            "/api/tickets",
            get(handlers::list_tickets).post(handlers::create_ticket),
        )
        .route(
            "/api/tickets/{id}",
            get(handlers::get_ticket)
                .put(handlers::update_ticket)
                .delete(handlers::delete_ticket),
        )
        .route(
            "/api/tickets/{id}/completion",
            get(handlers::get_completion).post(handlers::create_completion),
        )
        .with_state(state)
}
