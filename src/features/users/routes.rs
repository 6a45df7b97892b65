use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};

use crate::features::users::handlers;
use crate::features::users::services::UserService;

pub fn routes(service: Arc<UserService>) -> Router {
    Router::new()
        .route("/api/users/me", get(handlers::get_me).put(handlers::sync_me))
        .route("/api/users/technicians", get(handlers::list_technicians))
        .route("/api/users/{id}/category", put(handlers::set_category))
        .with_state(service)
}
