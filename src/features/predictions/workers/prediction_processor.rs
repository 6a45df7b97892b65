use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::Role;
use crate::features::categories::CategoryService;
use crate::features::predictions::clients::PredictionClient;
use crate::features::predictions::models::{PredictionInput, PredictionJob};
use crate::features::predictions::services::PredictionQueueService;
use crate::features::tickets::models::Priority;
use crate::features::tickets::services::TicketService;

/// Classifies new tickets and hands them to a technician, in the background
pub struct PredictionProcessor {
    queue: Arc<PredictionQueueService>,
    client: Arc<dyn PredictionClient>,
    tickets: Arc<TicketService>,
    categories: Arc<CategoryService>,
    poll_interval: Duration,
    batch_size: i64,
}

impl PredictionProcessor {
    pub fn new(
        queue: Arc<PredictionQueueService>,
        client: Arc<dyn PredictionClient>,
        tickets: Arc<TicketService>,
        categories: Arc<CategoryService>,
        poll_interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            queue,
            client,
            tickets,
            categories,
            poll_interval,
            batch_size,
        }
    }

    /// Run the processor in a background loop
    pub async fn run(&self) {
        tracing::info!(
            "Starting prediction processor worker (every {}s, batch {})",
            self.poll_interval.as_secs(),
            self.batch_size
        );

        let mut interval = interval(self.poll_interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.process_batch().await {
                tracing::error!("Error processing prediction batch: {:?}", e);
            }
        }
    }

    /// Claim and process one batch; returns how many jobs were claimed
    pub async fn process_batch(&self) -> Result<usize> {
        let jobs = self.queue.claim_pending(self.batch_size).await?;

        if jobs.is_empty() {
            return Ok(0);
        }

        tracing::info!("Processing {} prediction jobs", jobs.len());

        for job in &jobs {
            match self.process_job(job).await {
                Ok(()) => self.queue.mark_completed(job.id).await?,
                Err(e) => {
                    tracing::error!("Failed to process ticket {}: {:?}", job.ticket_id, e);
                    self.queue.mark_failed(job, &e.to_string()).await?;
                }
            }
        }

        Ok(jobs.len())
    }

    /// Errors leave the job for retry; every other outcome completes it
    async fn process_job(&self, job: &PredictionJob) -> Result<()> {
        tracing::info!("Processing ticket {}", job.ticket_id);

        let ticket = match self.tickets.get_ticket_edit(&job.ticket_id).await {
            Ok(ticket) => ticket,
            Err(AppError::NotFound(_)) => {
                tracing::warn!("Ticket {} not found; dropping prediction", job.ticket_id);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let input = PredictionInput::for_ticket(&ticket.ticket_title, &ticket.ticket_description);

        let category_prediction = self.client.predict_category(&input).await?;
        let category_name = category_prediction.predicted_category.ok_or_else(|| {
            AppError::ExternalServiceError("Prediction service returned no category".to_string())
        })?;
        let category = self
            .categories
            .find_by_name(&category_name)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Predicted category '{}' is unknown", category_name))
            })?;

        let priority_prediction = self.client.predict_priority(&input).await?;
        let priority = Priority::from_label(
            priority_prediction.predicted_priority.as_deref().unwrap_or_default(),
        );

        tracing::debug!(
            "Ticket {} predicted as {} ({:?}) with priority {} ({:?})",
            ticket.ticket_id,
            category.category_name,
            category_prediction.scores,
            priority,
            priority_prediction.scores
        );

        let updated = self
            .tickets
            .update_classification(&ticket.ticket_id, Some(category.category_id), priority)
            .await?;
        if !updated {
            tracing::warn!("Ticket {} disappeared before classification", ticket.ticket_id);
            return Ok(());
        }

        if ticket.assigned {
            tracing::debug!("Ticket {} already has an assignee", ticket.ticket_id);
            return Ok(());
        }

        // A technician who files a ticket works it themselves
        if job.role.parse::<Role>().ok() == Some(Role::Technician) {
            match self
                .tickets
                .create_user_ticket_if_unassigned(&ticket.ticket_id, &job.user_id)
                .await
            {
                Ok(_) => {}
                Err(AppError::NotFound(msg)) => {
                    tracing::warn!(
                        "Could not assign ticket {} to its creator: {}",
                        ticket.ticket_id,
                        msg
                    );
                }
                Err(e) => return Err(e),
            }
            return Ok(());
        }

        let outcome = self.tickets.create_user_ticket(&ticket.ticket_id).await?;
        tracing::info!("Ticket {}: {}", ticket.ticket_id, outcome.message());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seed::seed_reference_data;
    use crate::features::predictions::models::{CategoryPrediction, PriorityPrediction};
    use crate::features::tickets::models::CreateTicket;
    use async_trait::async_trait;
    use sqlx::PgPool;

    struct FixedPredictions {
        category: &'static str,
        priority: &'static str,
    }

    #[async_trait]
    impl PredictionClient for FixedPredictions {
        async fn predict_category(&self, _input: &PredictionInput) -> Result<CategoryPrediction> {
            Ok(CategoryPrediction {
                predicted_category: Some(self.category.to_string()),
                scores: None,
            })
        }

        async fn predict_priority(&self, _input: &PredictionInput) -> Result<PriorityPrediction> {
            Ok(PriorityPrediction {
                predicted_priority: Some(self.priority.to_string()),
                scores: None,
            })
        }
    }

    struct Fixture {
        pool: PgPool,
        tickets: Arc<TicketService>,
        queue: Arc<PredictionQueueService>,
    }

    impl Fixture {
        async fn new(pool: PgPool) -> Self {
            seed_reference_data(&pool).await.unwrap();
            Self {
                tickets: Arc::new(TicketService::new(pool.clone())),
                queue: Arc::new(PredictionQueueService::new(
                    pool.clone(),
                    2,
                    Duration::from_secs(300),
                )),
                pool,
            }
        }

        fn processor(&self, category: &'static str, priority: &'static str) -> PredictionProcessor {
            PredictionProcessor::new(
                self.queue.clone(),
                Arc::new(FixedPredictions { category, priority }),
                self.tickets.clone(),
                Arc::new(CategoryService::new(self.pool.clone())),
                Duration::from_secs(1),
                10,
            )
        }

        async fn file_ticket(&self, user_id: &str, role: Role) -> String {
            let ticket = self
                .tickets
                .create_ticket(CreateTicket {
                    user_id: user_id.to_string(),
                    title: "Cannot log in to payroll".to_string(),
                    description: "MFA code rejected".to_string(),
                    product_id: None,
                })
                .await
                .unwrap();
            self.queue.enqueue(&ticket.ticket_id, user_id, role).await.unwrap();
            ticket.ticket_id
        }

        async fn job_status(&self, ticket_id: &str) -> (String, i32) {
            sqlx::query_as("SELECT status::text, retry_count FROM prediction_jobs WHERE ticket_id = $1")
                .bind(ticket_id)
                .fetch_one(&self.pool)
                .await
                .unwrap()
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_classifies_and_auto_assigns(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        sqlx::query("INSERT INTO app_users (user_id, category_id) VALUES ('tech-auth', 2)")
            .execute(&fx.pool)
            .await
            .unwrap();
        let id = fx.file_ticket("u1", Role::EndUser).await;

        let processed = fx
            .processor("authentication", " HIGH ")
            .process_batch()
            .await
            .unwrap();
        assert_eq!(processed, 1);

        let ticket = fx.tickets.get_ticket_edit(&id).await.unwrap();
        assert_eq!(ticket.category_id, Some(2));
        assert_eq!(ticket.priority, Priority::High);
        assert!(ticket.assigned);
        assert_eq!(fx.tickets.get_assignees(&id).await.unwrap()[0].user_id, "tech-auth");
        assert_eq!(fx.job_status(&id).await, ("completed".to_string(), 0));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_technician_creator_works_own_ticket(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        sqlx::query("INSERT INTO app_users (user_id, category_id) VALUES ('tech-net', 1), ('tech-other', 2)")
            .execute(&fx.pool)
            .await
            .unwrap();
        let id = fx.file_ticket("tech-net", Role::Technician).await;

        fx.processor("Authentication", "urgent")
            .process_batch()
            .await
            .unwrap();

        let ticket = fx.tickets.get_ticket_edit(&id).await.unwrap();
        assert_eq!(ticket.priority, Priority::Low);
        let assignees = fx.tickets.get_assignees(&id).await.unwrap();
        assert_eq!(assignees.len(), 1);
        assert_eq!(assignees[0].user_id, "tech-net");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_unknown_category_is_retried_then_failed(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        let id = fx.file_ticket("u1", Role::EndUser).await;
        let processor = fx.processor("Printers", "low");

        processor.process_batch().await.unwrap();
        assert_eq!(fx.job_status(&id).await, ("submitted".to_string(), 1));

        processor.process_batch().await.unwrap();
        assert_eq!(fx.job_status(&id).await, ("failed".to_string(), 2));

        let ticket = fx.tickets.get_ticket_edit(&id).await.unwrap();
        assert!(ticket.category_id.is_none());
        assert!(!ticket.assigned);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_missing_ticket_completes_job(pool: PgPool) {
        let fx = Fixture::new(pool).await;
        fx.queue.enqueue("DEFAULT-404", "u1", Role::EndUser).await.unwrap();

        fx.processor("Authentication", "low")
            .process_batch()
            .await
            .unwrap();

        assert_eq!(fx.job_status("DEFAULT-404").await, ("completed".to_string(), 0));
    }
}
