use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::comments::dtos::{CommentResponseDto, CreateCommentDto};
use crate::features::comments::models::CommentWithAuthor;
use crate::features::comments::services::{attachment_extension, Attachment, CommentService};
use crate::shared::types::ApiResponse;
use crate::shared::validation::ensure_ticket_id;

/// List comments on a ticket
#[utoipa::path(
    get,
    path = "/api/tickets/{id}/comments",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Comments, oldest first", body = ApiResponse<Vec<CommentResponseDto>>),
        (status = 404, description = "Ticket not found")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn list_comments(
    _user: AuthenticatedUser,
    State(service): State<Arc<CommentService>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<CommentResponseDto>>>> {
    ensure_ticket_id(&id)?;
    let comments = service.list_comments(&id).await?;
    Ok(Json(ApiResponse::list(comments)))
}

/// Comment on a ticket, optionally with one attachment
#[utoipa::path(
    post,
    path = "/api/tickets/{id}/comments",
    params(
        ("id" = String, Path, description = "Ticket ID")
    ),
    request_body(
        content = CreateCommentDto,
        content_type = "multipart/form-data",
        description = "Comment text and optional file"
    ),
    responses(
        (status = 201, description = "Comment created", body = ApiResponse<CommentResponseDto>),
        (status = 400, description = "Invalid comment or attachment"),
        (status = 404, description = "Ticket not found"),
        (status = 502, description = "Attachment storage failed")
    ),
    security(("bearer_auth" = [])),
    tag = "comments"
)]
pub async fn create_comment(
    user: AuthenticatedUser,
    State(service): State<Arc<CommentService>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<CommentResponseDto>>)> {
    ensure_ticket_id(&id)?;

    let mut comment_text: Option<String> = None;
    let mut attachment: Option<Attachment> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "comment_text" => {
                comment_text = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read comment text: {}", e))
                })?);
            }
            "file" => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());
                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;

                // Browsers send an empty file part when nothing was picked
                if !data.is_empty() {
                    attachment = Some(Attachment {
                        file_name,
                        content_type,
                        data: data.to_vec(),
                    });
                }
            }
            _ => debug!("Ignoring unknown field: {}", field_name),
        }
    }

    let comment_text = comment_text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Comment text is required".to_string()))?;

    if let Some(a) = &attachment {
        attachment_extension(&a.file_name, a.data.len())?;
    }

    let comment = service
        .create_comment(&id, &user.user_id, &comment_text, attachment)
        .await?;

    let row = CommentWithAuthor {
        comment,
        first_name: user.first_name,
        last_name: user.last_name,
    };
    let mut created = service.with_download_urls(vec![row]).await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created.pop(), None, None)),
    ))
}

#[cfg(test)]
mod tests {
    use crate::features::auth::model::Role;
    use crate::features::comments::routes;
    use crate::features::comments::services::CommentService;
    use crate::shared::test_helpers::{lazy_pool, with_auth, MemoryStorage};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use std::sync::Arc;

    fn server() -> TestServer {
        let service = Arc::new(CommentService::new(
            lazy_pool(),
            Arc::new(MemoryStorage::default()),
        ));
        TestServer::new(with_auth(routes::routes(service), Role::EndUser)).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_disallowed_attachment() {
        let form = MultipartForm::new()
            .add_text("comment_text", "Installer attached")
            .add_part(
                "file",
                Part::bytes(b"MZ".to_vec())
                    .file_name("setup.exe")
                    .mime_type("application/octet-stream"),
            );

        let response = server()
            .post("/api/tickets/DEFAULT-1/comments")
            .multipart(form)
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_requires_comment_text() {
        let form = MultipartForm::new().add_text("comment_text", "   ");

        let response = server()
            .post("/api/tickets/DEFAULT-1/comments")
            .multipart(form)
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_malformed_ticket_id_is_not_found() {
        let response = server().get("/api/tickets/not-a-ticket/comments").await;
        response.assert_status_not_found();
    }
}
