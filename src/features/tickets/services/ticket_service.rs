use sqlx::{PgConnection, PgPool};

use crate::core::error::{AppError, Result};
use crate::features::assignments::models::AssignmentOutcome;
use crate::features::assignments::services::AssignmentService;
use crate::features::categories::models::HelpDeskCategory;
use crate::features::comments::models::CommentWithAuthor;
use crate::features::comments::services::COMMENT_WITH_AUTHOR_SELECT;
use crate::features::products::models::ProductOption;
use crate::features::products::services::ProductCodeService;
use crate::features::tickets::models::{
    Assignee, CreateTicket, CreateTicketCompletion, Priority, Ticket, TicketCompletion,
    TicketListItem, TicketStatus, UpdateTicket,
};
use crate::shared::constants::DEFAULT_PRODUCT_ID;

pub(crate) const TICKET_COLUMNS: &str = r#"
    ticket_id, user_id, ticket_title, ticket_description, status, priority,
    category_id, product_id, assigned, is_deleted, issue_date, update_date,
    complete_date, update_user_id
"#;

/// Ticket rows with category and product names; callers append WHERE/ORDER BY
pub(crate) const TICKET_LIST_SELECT: &str = r#"
    SELECT t.ticket_id, t.user_id, t.ticket_title, t.ticket_description, t.status,
           t.priority, t.category_id, t.product_id, t.assigned, t.is_deleted,
           t.issue_date, t.update_date, t.complete_date, t.update_user_id,
           c.category_name, p.product_name
    FROM tickets t
    LEFT JOIN help_desk_categories c ON c.category_id = t.category_id
    LEFT JOIN products p ON p.product_id = t.product_id
"#;

/// Ticket with everything its detail page shows
#[derive(Debug, Clone)]
pub struct TicketDetails {
    pub ticket: Ticket,
    pub category: Option<HelpDeskCategory>,
    pub product: Option<ProductOption>,
    pub assignees: Vec<Assignee>,
    pub comments: Vec<CommentWithAuthor>,
}

/// A completed ticket and its resolution
#[derive(Debug, Clone)]
pub struct TicketCompletionDetails {
    pub details: TicketDetails,
    pub completion: TicketCompletion,
}

/// Transactional store for tickets, their assignments and completions.
///
/// Every mutating operation runs in one transaction; an early return through
/// `?` drops the transaction, which rolls it back.
pub struct TicketService {
    pool: PgPool,
}

impl TicketService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn commit(tx: sqlx::Transaction<'static, sqlx::Postgres>, what: &str) -> Result<()> {
        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit {}: {:?}", what, e);
            AppError::Database(e)
        })
    }

    /// Lock a live ticket row until the transaction ends
    pub(crate) async fn lock_ticket(conn: &mut PgConnection, ticket_id: &str) -> Result<Option<Ticket>> {
        sqlx::query_as::<_, Ticket>(&format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM tickets
            WHERE ticket_id = $1 AND is_deleted = FALSE
            FOR UPDATE
            "#
        ))
        .bind(ticket_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to lock ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })
    }

    /// Insert the assignment row and raise the `assigned` flag.
    /// Returns `false` when the user was already assigned to the ticket.
    pub(crate) async fn assign_in(conn: &mut PgConnection, ticket_id: &str, user_id: &str) -> Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_tickets (user_id, ticket_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, ticket_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(ticket_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to assign {} to ticket {}: {:?}", user_id, ticket_id, e);
            AppError::Database(e)
        })?
        .rows_affected()
            > 0;

        sqlx::query(
            r#"
            UPDATE tickets
            SET assigned = TRUE,
                update_date = CASE WHEN assigned THEN update_date ELSE NOW() END
            WHERE ticket_id = $1
            "#,
        )
        .bind(ticket_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to flag ticket {} as assigned: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        Ok(inserted)
    }

    /// Create a ticket with the next id from its product's code.
    ///
    /// The code row stays locked from reading the count until commit, and the
    /// ticket insert and counter increment commit or roll back together.
    pub async fn create_ticket(&self, input: CreateTicket) -> Result<Ticket> {
        if input.user_id.trim().is_empty() {
            return Err(AppError::Validation("Ticket owner is required".to_string()));
        }
        if input.title.trim().is_empty() || input.description.trim().is_empty() {
            return Err(AppError::Validation(
                "Ticket title and description are required".to_string(),
            ));
        }

        let product_id = input
            .product_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PRODUCT_ID)
            .to_string();

        let mut tx = self.begin().await?;

        let code = ProductCodeService::lock_code(&mut tx, &product_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Product code for product {} not found", product_id))
            })?;

        let ticket_id = code.next_ticket_id();

        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            INSERT INTO tickets (ticket_id, user_id, ticket_title, ticket_description, product_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(&ticket_id)
        .bind(&input.user_id)
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(&product_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        if !ProductCodeService::increment_count_in(&mut tx, &product_id).await? {
            tracing::error!(
                "Product code count for {} did not advance; rolling back ticket {}",
                product_id,
                ticket_id
            );
            let _ = tx.rollback().await;
            return Err(AppError::Internal(format!(
                "Failed to advance product code count for {}",
                product_id
            )));
        }

        Self::commit(tx, "ticket").await?;

        tracing::info!(
            "Ticket created: id={}, product={}, owner={}",
            ticket.ticket_id,
            product_id,
            ticket.user_id
        );

        Ok(ticket)
    }

    /// Ticket with category, product, assignees and comments
    pub async fn get_ticket_details(&self, ticket_id: &str) -> Result<TicketDetails> {
        let ticket = self.get_ticket_edit(ticket_id).await?;

        let category = match ticket.category_id {
            Some(category_id) => sqlx::query_as::<_, HelpDeskCategory>(
                "SELECT category_id, category_name FROM help_desk_categories WHERE category_id = $1",
            )
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get category for ticket {}: {:?}", ticket_id, e);
                AppError::Database(e)
            })?,
            None => None,
        };

        let product = sqlx::query_as::<_, ProductOption>(
            "SELECT product_id, product_name FROM products WHERE product_id = $1",
        )
        .bind(&ticket.product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get product for ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        let assignees = self.get_assignees(ticket_id).await?;

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
            tracing::error!("Failed to get comments for ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        Ok(TicketDetails {
            ticket,
            category,
            product,
            assignees,
            comments,
        })
    }

    /// Technicians assigned to a ticket, earliest assignment first
    pub async fn get_assignees(&self, ticket_id: &str) -> Result<Vec<Assignee>> {
        sqlx::query_as::<_, Assignee>(
            r#"
            SELECT u.user_id, u.first_name, u.last_name, u.email, u.category_id, c.category_name
            FROM user_tickets ut
            JOIN app_users u ON u.user_id = ut.user_id
            LEFT JOIN help_desk_categories c ON c.category_id = u.category_id
            WHERE ut.ticket_id = $1
            ORDER BY ut.assigned_at, u.user_id
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get assignees for ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })
    }

    /// Bare ticket row; soft-deleted tickets are not found
    pub async fn get_ticket_edit(&self, ticket_id: &str) -> Result<Ticket> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM tickets
            WHERE ticket_id = $1 AND is_deleted = FALSE
            "#
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        ticket.ok_or_else(|| AppError::NotFound(format!("Ticket {} not found", ticket_id)))
    }

    /// Tickets the user owns, is assigned to, or that nobody is assigned to,
    /// in the open or closed status group, newest first
    pub async fn get_tickets(&self, user_id: &str, completed: bool) -> Result<Vec<TicketListItem>> {
        let [first, second] = TicketStatus::group(completed);

        sqlx::query_as::<_, TicketListItem>(&format!(
            r#"
            {TICKET_LIST_SELECT}
            WHERE t.is_deleted = FALSE
              AND t.status IN ($2, $3)
              AND (
                  t.user_id = $1
                  OR t.assigned = FALSE
                  OR EXISTS (
                      SELECT 1 FROM user_tickets ut
                      WHERE ut.ticket_id = t.ticket_id AND ut.user_id = $1
                  )
              )
            ORDER BY t.issue_date DESC
            "#
        ))
        .bind(user_id)
        .bind(first)
        .bind(second)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list tickets for {}: {:?}", user_id, e);
            AppError::Database(e)
        })
    }

    /// Returns `false` when the ticket is missing or nothing changed
    pub async fn update_ticket(&self, input: UpdateTicket) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET ticket_title = $2,
                ticket_description = $3,
                status = $4,
                priority = $5,
                category_id = $6,
                update_user_id = $7,
                update_date = NOW()
            WHERE ticket_id = $1
              AND is_deleted = FALSE
              AND (ticket_title IS DISTINCT FROM $2
                   OR ticket_description IS DISTINCT FROM $3
                   OR status IS DISTINCT FROM $4
                   OR priority IS DISTINCT FROM $5
                   OR category_id IS DISTINCT FROM $6)
            "#,
        )
        .bind(&input.ticket_id)
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(input.status)
        .bind(input.priority)
        .bind(input.category_id)
        .bind(&input.update_user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update ticket {}: {:?}", input.ticket_id, e);
            AppError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            tracing::warn!("No changes detected during update of ticket {}", input.ticket_id);
            return Ok(false);
        }

        tracing::info!("Ticket updated: id={}, by={}", input.ticket_id, input.update_user_id);
        Ok(true)
    }

    /// Set category and priority. Re-applying the same values leaves the row
    /// untouched, including its update timestamp. Returns `false` when the
    /// ticket does not exist.
    pub async fn update_classification(
        &self,
        ticket_id: &str,
        category_id: Option<i32>,
        priority: Priority,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET category_id = $2,
                priority = $3,
                update_date = CASE
                    WHEN category_id IS DISTINCT FROM $2 OR priority IS DISTINCT FROM $3
                    THEN NOW()
                    ELSE update_date
                END
            WHERE ticket_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(ticket_id)
        .bind(category_id)
        .bind(priority)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to classify ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        let updated = result.rows_affected() > 0;
        if updated {
            tracing::info!(
                "Ticket classified: id={}, category={:?}, priority={}",
                ticket_id,
                category_id,
                priority
            );
        } else {
            tracing::warn!("Ticket {} not found for classification", ticket_id);
        }

        Ok(updated)
    }

    /// Auto-assign the least-loaded technician of the ticket's category.
    ///
    /// The ticket row lock makes this idempotent per ticket: a ticket that is
    /// already assigned is left alone. Unclassified tickets and categories
    /// without technicians are reported as outcomes, not errors.
    pub async fn create_user_ticket(&self, ticket_id: &str) -> Result<AssignmentOutcome> {
        let mut tx = self.begin().await?;

        let ticket = Self::lock_ticket(&mut tx, ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {} not found", ticket_id)))?;

        if ticket.assigned {
            tracing::debug!("Ticket {} is already assigned", ticket_id);
            return Ok(AssignmentOutcome::AlreadyAssigned);
        }

        let Some(category_id) = ticket.category_id else {
            tracing::warn!("Ticket {} has no category; leaving it unassigned", ticket_id);
            return Ok(AssignmentOutcome::Unclassified);
        };

        let Some(user_id) = AssignmentService::least_loaded_technician(&mut tx, category_id).await?
        else {
            tracing::warn!(
                "No technician in category {} for ticket {}; leaving it unassigned",
                category_id,
                ticket_id
            );
            return Ok(AssignmentOutcome::NoEligibleTechnician);
        };

        Self::assign_in(&mut tx, ticket_id, &user_id).await?;
        Self::commit(tx, "assignment").await?;

        tracing::info!(
            "Ticket auto-assigned: id={}, technician={}, category={}",
            ticket_id,
            user_id,
            category_id
        );

        Ok(AssignmentOutcome::Assigned { user_id })
    }

    /// Assign a specific user without policy selection. Returns `false` when
    /// that user was already assigned.
    pub async fn create_user_ticket_for(&self, ticket_id: &str, user_id: &str) -> Result<bool> {
        self.assign_locked(ticket_id, user_id, false).await
    }

    /// Like `create_user_ticket_for`, but only while the ticket has no
    /// assignee. The flag is read under the ticket lock, so an assignment
    /// made in the meantime is respected.
    pub async fn create_user_ticket_if_unassigned(
        &self,
        ticket_id: &str,
        user_id: &str,
    ) -> Result<bool> {
        self.assign_locked(ticket_id, user_id, true).await
    }

    async fn assign_locked(
        &self,
        ticket_id: &str,
        user_id: &str,
        only_if_unassigned: bool,
    ) -> Result<bool> {
        let mut tx = self.begin().await?;

        let ticket = Self::lock_ticket(&mut tx, ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {} not found", ticket_id)))?;

        if only_if_unassigned && ticket.assigned {
            tracing::debug!("Ticket {} already has an assignee", ticket_id);
            return Ok(false);
        }

        let user_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM app_users WHERE user_id = $1 AND is_deleted = FALSE)",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check user {}: {:?}", user_id, e);
            AppError::Database(e)
        })?;

        if !user_exists {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        let inserted = Self::assign_in(&mut tx, ticket_id, user_id).await?;
        Self::commit(tx, "assignment").await?;

        if inserted {
            tracing::info!("Ticket assigned: id={}, user={}", ticket_id, user_id);
        } else {
            tracing::warn!("User {} is already assigned to ticket {}", user_id, ticket_id);
        }

        Ok(inserted)
    }

    /// Soft delete. Returns `false` when the ticket is missing or already deleted.
    pub async fn delete_ticket(&self, ticket_id: &str, deleted_by: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET is_deleted = TRUE, update_user_id = $2, update_date = NOW()
            WHERE ticket_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(ticket_id)
        .bind(deleted_by)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!("Ticket deleted: id={}, by={}", ticket_id, deleted_by);
        }
        Ok(deleted)
    }

    /// Record the resolution and mark the ticket complete in one transaction.
    /// Tickets that are already complete or canceled are a conflict.
    pub async fn create_ticket_completion(
        &self,
        input: CreateTicketCompletion,
    ) -> Result<TicketCompletion> {
        if input.answer.trim().is_empty() {
            return Err(AppError::Validation("Completion answer is required".to_string()));
        }

        let mut tx = self.begin().await?;

        let ticket = Self::lock_ticket(&mut tx, &input.ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {} not found", input.ticket_id)))?;

        if ticket.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Ticket {} is already {}",
                ticket.ticket_id, ticket.status
            )));
        }

        let question = input
            .question
            .clone()
            .or_else(|| Some(ticket.ticket_description.clone()));
        let category_id = input.category_id.or(ticket.category_id);

        let completion = sqlx::query_as::<_, TicketCompletion>(
            r#"
            INSERT INTO ticket_completions (ticket_id, user_id, question, answer, category_id, difficulty)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING completion_id, ticket_id, user_id, question, answer, category_id,
                      difficulty, completion_date
            "#,
        )
        .bind(&input.ticket_id)
        .bind(&input.user_id)
        .bind(question)
        .bind(input.answer.trim())
        .bind(category_id)
        .bind(input.difficulty)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create completion for ticket {}: {:?}", input.ticket_id, e);
            AppError::Database(e)
        })?;

        sqlx::query(
            r#"
            UPDATE tickets
            SET status = $2,
                complete_date = $3,
                update_date = $3,
                update_user_id = $4
            WHERE ticket_id = $1
            "#,
        )
        .bind(&input.ticket_id)
        .bind(TicketStatus::Complete)
        .bind(completion.completion_date)
        .bind(&input.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to complete ticket {}: {:?}", input.ticket_id, e);
            AppError::Database(e)
        })?;

        Self::commit(tx, "ticket completion").await?;

        tracing::info!(
            "Ticket completed: id={}, by={}, difficulty={}",
            input.ticket_id,
            input.user_id,
            input.difficulty
        );

        Ok(completion)
    }

    pub async fn get_ticket_completion_details(
        &self,
        ticket_id: &str,
    ) -> Result<TicketCompletionDetails> {
        let completion = sqlx::query_as::<_, TicketCompletion>(
            r#"
            SELECT completion_id, ticket_id, user_id, question, answer, category_id,
                   difficulty, completion_date
            FROM ticket_completions
            WHERE ticket_id = $1
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get completion for ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })?
        .ok_or_else(|| {
            AppError::NotFound(format!("Completion for ticket {} not found", ticket_id))
        })?;

        let details = self.get_ticket_details(ticket_id).await?;

        Ok(TicketCompletionDetails {
            details,
            completion,
        })
    }

    /// Existence probe; soft-deleted tickets do not count
    pub async fn is_existing_ticket(&self, ticket_id: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM tickets WHERE ticket_id = $1 AND is_deleted = FALSE)",
        )
        .bind(ticket_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check ticket {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seed::seed_reference_data;
    use fake::faker::lorem::en::{Paragraph, Sentence};
    use fake::Fake;

    fn new_ticket(user_id: &str, product_id: Option<&str>) -> CreateTicket {
        CreateTicket {
            user_id: user_id.to_string(),
            title: Sentence(2..5).fake(),
            description: Paragraph(1..2).fake(),
            product_id: product_id.map(str::to_string),
        }
    }

    async fn insert_technician(pool: &PgPool, user_id: &str, category_id: i32) {
        sqlx::query("INSERT INTO app_users (user_id, first_name, category_id) VALUES ($1, 'Tech', $2)")
            .bind(user_id)
            .bind(category_id)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn setup(pool: &PgPool) -> TicketService {
        seed_reference_data(pool).await.unwrap();
        TicketService::new(pool.clone())
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_ticket_ids_follow_product_sequence(pool: PgPool) {
        let service = setup(&pool).await;

        let first = service.create_ticket(new_ticket("u1", None)).await.unwrap();
        let second = service.create_ticket(new_ticket("u1", Some("  "))).await.unwrap();

        assert_eq!(first.ticket_id, "DEFAULT-1");
        assert_eq!(second.ticket_id, "DEFAULT-2");
        assert_eq!(first.status, TicketStatus::Active);
        assert_eq!(first.priority, Priority::Medium);
        assert!(!first.assigned);

        let count: i32 = sqlx::query_scalar("SELECT count FROM product_codes WHERE product_id = 'DEFAULT'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_create_ticket_without_code_fails(pool: PgPool) {
        let service = setup(&pool).await;
        let result = service.create_ticket(new_ticket("u1", Some("no-such-product"))).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_failed_increment_rolls_back_ticket(pool: PgPool) {
        let service = setup(&pool).await;

        sqlx::query(
            r#"
            CREATE FUNCTION reject_code_update() RETURNS trigger AS $$
            BEGIN RAISE EXCEPTION 'counter frozen'; END;
            $$ LANGUAGE plpgsql
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TRIGGER freeze_codes BEFORE UPDATE ON product_codes FOR EACH ROW EXECUTE FUNCTION reject_code_update()",
        )
        .execute(&pool)
        .await
        .unwrap();

        let result = service.create_ticket(new_ticket("u1", None)).await;
        assert!(matches!(result, Err(AppError::Database(_))));

        assert!(!service.is_existing_ticket("DEFAULT-1").await.unwrap());
        let count: i32 = sqlx::query_scalar("SELECT count FROM product_codes WHERE product_id = 'DEFAULT'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_auto_assign_picks_least_loaded(pool: PgPool) {
        let service = setup(&pool).await;
        insert_technician(&pool, "tech-a", 1).await;
        insert_technician(&pool, "tech-b", 1).await;
        insert_technician(&pool, "tech-other", 2).await;

        let busy = service.create_ticket(new_ticket("u1", None)).await.unwrap();
        service.create_user_ticket_for(&busy.ticket_id, "tech-a").await.unwrap();

        let ticket = service.create_ticket(new_ticket("u1", None)).await.unwrap();
        assert!(service
            .update_classification(&ticket.ticket_id, Some(1), Priority::High)
            .await
            .unwrap());

        let outcome = service.create_user_ticket(&ticket.ticket_id).await.unwrap();
        assert_eq!(
            outcome,
            AssignmentOutcome::Assigned {
                user_id: "tech-b".to_string()
            }
        );
        assert!(service.get_ticket_edit(&ticket.ticket_id).await.unwrap().assigned);

        let again = service.create_user_ticket(&ticket.ticket_id).await.unwrap();
        assert_eq!(again, AssignmentOutcome::AlreadyAssigned);
        assert_eq!(service.get_assignees(&ticket.ticket_id).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_creator_assignment_respects_existing_assignee(pool: PgPool) {
        let service = setup(&pool).await;
        insert_technician(&pool, "tech-creator", 1).await;
        insert_technician(&pool, "tech-manual", 1).await;
        let ticket = service
            .create_ticket(new_ticket("tech-creator", None))
            .await
            .unwrap();

        assert!(service
            .create_user_ticket_for(&ticket.ticket_id, "tech-manual")
            .await
            .unwrap());
        assert!(!service
            .create_user_ticket_if_unassigned(&ticket.ticket_id, "tech-creator")
            .await
            .unwrap());

        let assignees = service.get_assignees(&ticket.ticket_id).await.unwrap();
        let ids: Vec<&str> = assignees.iter().map(|a| a.user_id.as_str()).collect();
        assert_eq!(ids, vec!["tech-manual"]);

        let other = service.create_ticket(new_ticket("tech-creator", None)).await.unwrap();
        assert!(service
            .create_user_ticket_if_unassigned(&other.ticket_id, "tech-creator")
            .await
            .unwrap());
        assert!(service.get_ticket_edit(&other.ticket_id).await.unwrap().assigned);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_auto_assign_without_category_or_technician(pool: PgPool) {
        let service = setup(&pool).await;
        let ticket = service.create_ticket(new_ticket("u1", None)).await.unwrap();

        assert_eq!(
            service.create_user_ticket(&ticket.ticket_id).await.unwrap(),
            AssignmentOutcome::Unclassified
        );

        service
            .update_classification(&ticket.ticket_id, Some(3), Priority::Medium)
            .await
            .unwrap();
        assert_eq!(
            service.create_user_ticket(&ticket.ticket_id).await.unwrap(),
            AssignmentOutcome::NoEligibleTechnician
        );
        assert!(!service.get_ticket_edit(&ticket.ticket_id).await.unwrap().assigned);

        assert!(matches!(
            service.create_user_ticket("DEFAULT-99").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_reclassifying_with_same_values_keeps_timestamp(pool: PgPool) {
        let service = setup(&pool).await;
        let ticket = service.create_ticket(new_ticket("u1", None)).await.unwrap();

        service
            .update_classification(&ticket.ticket_id, Some(2), Priority::High)
            .await
            .unwrap();
        let first = service.get_ticket_edit(&ticket.ticket_id).await.unwrap();

        assert!(service
            .update_classification(&ticket.ticket_id, Some(2), Priority::High)
            .await
            .unwrap());
        let second = service.get_ticket_edit(&ticket.ticket_id).await.unwrap();

        assert_eq!(first.update_date, second.update_date);
        assert_eq!(second.category_id, Some(2));
        assert!(!service
            .update_classification("DEFAULT-99", Some(2), Priority::High)
            .await
            .unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_ticket_list_visibility(pool: PgPool) {
        let service = setup(&pool).await;
        insert_technician(&pool, "tech-a", 1).await;
        insert_technician(&pool, "tech-b", 1).await;

        let mine = service.create_ticket(new_ticket("owner", None)).await.unwrap();
        let unassigned = service.create_ticket(new_ticket("someone", None)).await.unwrap();
        let theirs = service.create_ticket(new_ticket("someone", None)).await.unwrap();
        service.create_user_ticket_for(&theirs.ticket_id, "tech-b").await.unwrap();
        let deleted = service.create_ticket(new_ticket("owner", None)).await.unwrap();
        assert!(service.delete_ticket(&deleted.ticket_id, "owner").await.unwrap());

        let ids: Vec<String> = service
            .get_tickets("owner", false)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.ticket.ticket_id)
            .collect();

        assert!(ids.contains(&mine.ticket_id));
        assert!(ids.contains(&unassigned.ticket_id));
        assert!(!ids.contains(&theirs.ticket_id));
        assert!(!ids.contains(&deleted.ticket_id));

        let tech_ids: Vec<String> = service
            .get_tickets("tech-b", false)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.ticket.ticket_id)
            .collect();
        assert!(tech_ids.contains(&theirs.ticket_id));

        assert!(service.get_tickets("owner", true).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_completion_closes_ticket_once(pool: PgPool) {
        let service = setup(&pool).await;
        let ticket = service.create_ticket(new_ticket("u1", None)).await.unwrap();

        let completion = service
            .create_ticket_completion(CreateTicketCompletion {
                ticket_id: ticket.ticket_id.clone(),
                user_id: "tech-a".to_string(),
                question: None,
                answer: "Reset the VPN profile".to_string(),
                category_id: Some(1),
                difficulty: Priority::Medium,
            })
            .await
            .unwrap();
        assert_eq!(completion.question.as_deref(), Some(ticket.ticket_description.as_str()));

        let details = service
            .get_ticket_completion_details(&ticket.ticket_id)
            .await
            .unwrap();
        assert_eq!(details.details.ticket.status, TicketStatus::Complete);
        assert!(details.details.ticket.complete_date.is_some());

        let again = service
            .create_ticket_completion(CreateTicketCompletion {
                ticket_id: ticket.ticket_id.clone(),
                user_id: "tech-a".to_string(),
                question: None,
                answer: "Second answer".to_string(),
                category_id: None,
                difficulty: Priority::Low,
            })
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }
}
