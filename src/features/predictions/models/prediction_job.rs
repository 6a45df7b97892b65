use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "prediction_job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PredictionJobStatus {
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for PredictionJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionJobStatus::Submitted => write!(f, "submitted"),
            PredictionJobStatus::Processing => write!(f, "processing"),
            PredictionJobStatus::Completed => write!(f, "completed"),
            PredictionJobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// "Ticket created" event waiting to be classified
#[derive(Debug, Clone, FromRow)]
pub struct PredictionJob {
    pub id: Uuid,
    pub ticket_id: String,
    /// Creator of the ticket
    pub user_id: String,
    /// Creator's role when the ticket was filed
    pub role: String,
    pub status: PredictionJobStatus,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
}
