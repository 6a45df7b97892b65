use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::Role;
use crate::features::predictions::models::{PredictionJob, PredictionJobStatus};

const JOB_COLUMNS: &str = r#"
    id, ticket_id, user_id, role, status, retry_count, error_message,
    submitted_at, last_attempt_at, processed_at
"#;

/// Status and retry count after a failed attempt: back to `Submitted` while
/// retries remain, `Failed` once `max_retries` attempts have failed
pub fn status_after_failure(retry_count: i32, max_retries: i32) -> (PredictionJobStatus, i32) {
    let attempts = retry_count + 1;
    if attempts >= max_retries {
        (PredictionJobStatus::Failed, attempts)
    } else {
        (PredictionJobStatus::Submitted, attempts)
    }
}

/// Postgres-backed queue of ticket-created events. Delivery is at-least-once:
/// a job claimed by a worker that dies is handed out again after its lease.
pub struct PredictionQueueService {
    pool: PgPool,
    max_retries: i32,
    lease: Duration,
}

impl PredictionQueueService {
    pub fn new(pool: PgPool, max_retries: i32, lease: Duration) -> Self {
        Self {
            pool,
            max_retries,
            lease,
        }
    }

    pub async fn enqueue(&self, ticket_id: &str, user_id: &str, role: Role) -> Result<PredictionJob> {
        let job = sqlx::query_as::<_, PredictionJob>(&format!(
            r#"
            INSERT INTO prediction_jobs (id, ticket_id, user_id, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(ticket_id)
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to enqueue prediction for {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        tracing::debug!("Prediction queued: job={}, ticket={}", job.id, ticket_id);
        Ok(job)
    }

    /// Claim up to `batch_size` jobs, oldest first. Concurrent workers never
    /// claim the same job while its lease holds.
    pub async fn claim_pending(&self, batch_size: i64) -> Result<Vec<PredictionJob>> {
        sqlx::query_as::<_, PredictionJob>(&format!(
            r#"
            UPDATE prediction_jobs
            SET status = 'processing', last_attempt_at = NOW()
            WHERE id IN (
                SELECT id FROM prediction_jobs
                WHERE status = 'submitted'
                   OR (status = 'processing'
                       AND last_attempt_at < NOW() - make_interval(secs => $2))
                ORDER BY submitted_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(batch_size)
        .bind(self.lease.as_secs_f64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to claim prediction jobs: {:?}", e);
            AppError::Database(e)
        })
    }

    pub async fn mark_completed(&self, job_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE prediction_jobs
            SET status = 'completed', error_message = NULL, processed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark job {} completed: {:?}", job_id, e);
            AppError::Database(e)
        })?;

        Ok(())
    }

    pub async fn mark_failed(&self, job: &PredictionJob, error_message: &str) -> Result<()> {
        let (status, retry_count) = status_after_failure(job.retry_count, self.max_retries);

        sqlx::query(
            r#"
            UPDATE prediction_jobs
            SET status = $2,
                error_message = $3,
                retry_count = $4,
                last_attempt_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job.id)
        .bind(status)
        .bind(error_message)
        .bind(retry_count)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark job {} as failed: {:?}", job.id, e);
            AppError::Database(e)
        })?;

        if status == PredictionJobStatus::Failed {
            tracing::warn!(
                "Prediction for ticket {} permanently failed after {} attempts",
                job.ticket_id,
                retry_count
            );
        } else {
            tracing::info!(
                "Prediction for ticket {} marked for retry ({}/{})",
                job.ticket_id,
                retry_count,
                self.max_retries
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_retry_until_limit() {
        assert_eq!(status_after_failure(0, 3), (PredictionJobStatus::Submitted, 1));
        assert_eq!(status_after_failure(1, 3), (PredictionJobStatus::Submitted, 2));
        assert_eq!(status_after_failure(2, 3), (PredictionJobStatus::Failed, 3));
    }

    #[test]
    fn test_single_attempt_fails_immediately() {
        assert_eq!(status_after_failure(0, 1), (PredictionJobStatus::Failed, 1));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_claimed_jobs_are_not_handed_out_twice(pool: PgPool) {
        let queue = PredictionQueueService::new(pool, 3, Duration::from_secs(300));
        for n in 1..=3 {
            queue
                .enqueue(&format!("DEFAULT-{}", n), "u1", Role::EndUser)
                .await
                .unwrap();
        }

        let first = queue.claim_pending(2).await.unwrap();
        let second = queue.claim_pending(10).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert!(first.iter().all(|j| j.status == PredictionJobStatus::Processing));
        assert!(queue.claim_pending(10).await.unwrap().is_empty());

        queue.mark_failed(&second[0], "timeout").await.unwrap();
        let retried = queue.claim_pending(10).await.unwrap();
        assert_eq!(retried.len(), 1);
        assert_eq!(retried[0].retry_count, 1);
        assert_eq!(retried[0].error_message.as_deref(), Some("timeout"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_expired_lease_is_reclaimed(pool: PgPool) {
        let queue = PredictionQueueService::new(pool, 3, Duration::ZERO);
        queue.enqueue("DEFAULT-1", "u1", Role::Technician).await.unwrap();

        let first = queue.claim_pending(10).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let again = queue.claim_pending(10).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id, first[0].id);
        assert_eq!(again[0].role, "Technician");
    }
}
