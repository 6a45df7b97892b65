use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for comment
#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub comment_id: i32,
    pub ticket_id: String,
    pub user_id: String,
    pub comment_text: String,
    pub create_date: DateTime<Utc>,
    /// Blob name of the attachment, if any
    pub file_name: Option<String>,
    /// Lowercase extension of the attachment, e.g. ".pdf"
    pub file_type: Option<String>,
    pub is_deleted: bool,
}

/// Comment joined with its author's name
#[derive(Debug, Clone, FromRow)]
pub struct CommentWithAuthor {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateComment {
    pub ticket_id: String,
    pub user_id: String,
    pub comment_text: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
}
