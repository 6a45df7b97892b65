use std::path::Path;
use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::comments::dtos::CommentResponseDto;
use crate::features::comments::models::{Comment, CommentWithAuthor, CreateComment};
use crate::modules::storage::BlobStorage;
use crate::shared::constants::{ALLOWED_ATTACHMENT_EXTENSIONS, MAX_ATTACHMENT_SIZE};

/// Comment rows with the author's name; callers append WHERE/ORDER BY
pub(crate) const COMMENT_WITH_AUTHOR_SELECT: &str = r#"
    SELECT cm.comment_id, cm.ticket_id, cm.user_id, cm.comment_text, cm.create_date,
           cm.file_name, cm.file_type, cm.is_deleted,
           u.first_name, u.last_name
    FROM comments cm
    LEFT JOIN app_users u ON u.user_id = cm.user_id
"#;

/// File uploaded with a comment
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Check an attachment against the size limit and extension allow-list.
/// Returns the lowercase extension with its leading dot.
pub fn attachment_extension(file_name: &str, size: usize) -> Result<String> {
    if size == 0 {
        return Err(AppError::Validation("Attachment is empty".to_string()));
    }
    if size > MAX_ATTACHMENT_SIZE {
        return Err(AppError::Validation(format!(
            "File too large. Maximum size is {} bytes ({} MB)",
            MAX_ATTACHMENT_SIZE,
            MAX_ATTACHMENT_SIZE / 1024 / 1024
        )));
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();

    if !ALLOWED_ATTACHMENT_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::Validation(format!(
            "File type '{}' is not allowed. Allowed types: {}",
            extension,
            ALLOWED_ATTACHMENT_EXTENSIONS.join(", ")
        )));
    }

    Ok(extension)
}

/// Comments on tickets, with attachments kept in blob storage
pub struct CommentService {
    pool: PgPool,
    storage: Arc<dyn BlobStorage>,
}

impl CommentService {
    pub fn new(pool: PgPool, storage: Arc<dyn BlobStorage>) -> Self {
        Self { pool, storage }
    }

    async fn ensure_ticket(&self, ticket_id: &str) -> Result<()> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tickets WHERE ticket_id = $1 AND is_deleted = FALSE)",
        )
        .bind(ticket_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Ticket {} not found", ticket_id)))
        }
    }

    /// Comments on a ticket, oldest first, with download links for attachments
    pub async fn list_comments(&self, ticket_id: &str) -> Result<Vec<CommentResponseDto>> {
        self.ensure_ticket(ticket_id).await?;

        let comments = sqlx::query_as::<_, CommentWithAuthor>(&format!(
            r#"
            {COMMENT_WITH_AUTHOR_SELECT}
            WHERE cm.ticket_id = $1 AND cm.is_deleted = FALSE
            ORDER BY cm.create_date ASC
            "#
        ))
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list comments for ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        Ok(self.with_download_urls(comments).await)
    }

    /// Attach signed URLs. A URL that cannot be signed is left out rather
    /// than failing the whole list.
    pub async fn with_download_urls(
        &self,
        comments: Vec<CommentWithAuthor>,
    ) -> Vec<CommentResponseDto> {
        let mut responses = Vec::with_capacity(comments.len());

        for comment in comments {
            let url = match comment.comment.file_name.as_deref() {
                Some(name) => match self.storage.signed_url(name).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::warn!("Could not sign attachment {}: {}", name, e);
                        None
                    }
                },
                None => None,
            };
            responses.push(CommentResponseDto::new(comment, url));
        }

        responses
    }

    /// Store the attachment (if any) under a fresh name, then insert the comment.
    pub async fn create_comment(
        &self,
        ticket_id: &str,
        user_id: &str,
        comment_text: &str,
        attachment: Option<Attachment>,
    ) -> Result<Comment> {
        let comment_text = comment_text.trim();
        if comment_text.is_empty() || comment_text.chars().count() > 500 {
            return Err(AppError::Validation(
                "Comment must be 1-500 characters".to_string(),
            ));
        }

        let file = match &attachment {
            Some(a) => Some(attachment_extension(&a.file_name, a.data.len())?),
            None => None,
        };

        self.ensure_ticket(ticket_id).await?;

        let mut input = CreateComment {
            ticket_id: ticket_id.to_string(),
            user_id: user_id.to_string(),
            comment_text: comment_text.to_string(),
            file_name: None,
            file_type: None,
        };

        if let (Some(attachment), Some(extension)) = (attachment, file) {
            let blob_name = format!("{}{}", Uuid::new_v4(), extension);

            let stored = self
                .storage
                .upload(&blob_name, attachment.data, &attachment.content_type)
                .await?;
            if !stored {
                return Err(AppError::ExternalServiceError(format!(
                    "Attachment {} was not stored",
                    attachment.file_name
                )));
            }

            input.file_name = Some(blob_name);
            input.file_type = Some(extension);
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (ticket_id, user_id, comment_text, file_name, file_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING comment_id, ticket_id, user_id, comment_text, create_date,
                      file_name, file_type, is_deleted
            "#,
        )
        .bind(&input.ticket_id)
        .bind(&input.user_id)
        .bind(&input.comment_text)
        .bind(&input.file_name)
        .bind(&input.file_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create comment on ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        tracing::info!(
            "Comment created: id={}, ticket={}, attachment={:?}",
            comment.comment_id,
            ticket_id,
            comment.file_name
        );

        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::MemoryStorage;

    #[test]
    fn test_attachment_extension_allow_list() {
        assert_eq!(attachment_extension("report.PDF", 10).unwrap(), ".pdf");
        assert_eq!(attachment_extension("photo.jpeg", 10).unwrap(), ".jpeg");
        assert!(attachment_extension("setup.exe", 10).is_err());
        assert!(attachment_extension("no_extension", 10).is_err());
    }

    #[test]
    fn test_attachment_size_limit() {
        assert!(attachment_extension("log.txt", MAX_ATTACHMENT_SIZE).is_ok());
        assert!(attachment_extension("log.txt", MAX_ATTACHMENT_SIZE + 1).is_err());
        assert!(attachment_extension("log.txt", 0).is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_comment_with_attachment_is_signed(pool: PgPool) {
        crate::core::seed::seed_reference_data(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO tickets (ticket_id, user_id, ticket_title, ticket_description, product_id) VALUES ('DEFAULT-1', 'u1', 'Printer offline', 'No prints', 'DEFAULT')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let storage = Arc::new(MemoryStorage::default());
        let service = CommentService::new(pool, storage.clone());

        let comment = service
            .create_comment(
                "DEFAULT-1",
                "u1",
                "Log attached",
                Some(Attachment {
                    file_name: "spooler.TXT".to_string(),
                    content_type: "text/plain".to_string(),
                    data: b"error 0x1".to_vec(),
                }),
            )
            .await
            .unwrap();

        assert_eq!(comment.file_type.as_deref(), Some(".txt"));
        let blob = comment.file_name.clone().unwrap();
        assert!(storage.contains(&blob));

        let listed = service.list_comments("DEFAULT-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            listed[0].attachment_url.as_deref(),
            Some(format!("memory://{}", blob).as_str())
        );

        assert!(matches!(
            service.list_comments("DEFAULT-9").await,
            Err(AppError::NotFound(_))
        ));
    }
}
