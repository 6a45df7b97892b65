use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::comments::models::CommentWithAuthor;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponseDto {
    pub comment_id: i32,
    pub ticket_id: String,
    pub user_id: String,
    pub author_name: Option<String>,
    pub comment_text: String,
    pub create_date: DateTime<Utc>,
    pub file_type: Option<String>,
    /// Time-limited download link, present when the comment has an attachment
    pub attachment_url: Option<String>,
}

impl CommentResponseDto {
    pub fn new(row: CommentWithAuthor, attachment_url: Option<String>) -> Self {
        let author_name = match (row.first_name, row.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(name), None) | (None, Some(name)) => Some(name),
            (None, None) => None,
        };

        let c = row.comment;
        Self {
            comment_id: c.comment_id,
            ticket_id: c.ticket_id,
            user_id: c.user_id,
            author_name,
            comment_text: c.comment_text,
            create_date: c.create_date,
            file_type: c.file_type,
            attachment_url,
        }
    }
}

/// Multipart form for creating a comment
#[allow(dead_code)]
#[derive(Debug, ToSchema)]
pub struct CreateCommentDto {
    /// Comment text, 1-500 characters
    pub comment_text: String,
    /// Optional attachment (.jpeg, .jpg, .png, .zip, .txt, .pdf; max 8 MB)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: Option<String>,
}
