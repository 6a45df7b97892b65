use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::features::comments::handlers;
use crate::features::comments::services::CommentService;
use crate::shared::constants::MAX_ATTACHMENT_SIZE;

/// Attachment plus room for the multipart framing and the text field
const COMMENT_BODY_LIMIT: usize = MAX_ATTACHMENT_SIZE + 64 * 1024;

pub fn routes(service: Arc<CommentService>) -> Router {
    Router::new()
        .route(
            "/api/tickets/{id}/comments",
            get(handlers::list_comments)
                .merge(post(handlers::create_comment).layer(DefaultBodyLimit::max(COMMENT_BODY_LIMIT))),
        )
        .with_state(service)
}
