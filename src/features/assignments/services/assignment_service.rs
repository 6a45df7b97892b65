use std::sync::Arc;

use sqlx::{PgConnection, PgPool};

use crate::core::error::{AppError, Result};
use crate::features::assignments::models::{AssignableUser, AssignmentOutcome, TechnicianLoad};
use crate::features::tickets::models::{Assignee, TicketStatus};
use crate::features::tickets::services::TicketService;
use crate::shared::constants::ASSIGNMENT_LOCK_NAMESPACE;

/// Fewest open tickets wins; ties go to the lowest user id
pub fn pick_least_loaded(loads: &[TechnicianLoad]) -> Option<&TechnicianLoad> {
    loads
        .iter()
        .min_by(|a, b| (a.open_tickets, &a.user_id).cmp(&(b.open_tickets, &b.user_id)))
}

/// Chooses and records which technicians work which tickets
pub struct AssignmentService {
    pool: PgPool,
    tickets: Arc<TicketService>,
}

impl AssignmentService {
    pub fn new(pool: PgPool, tickets: Arc<TicketService>) -> Self {
        Self { pool, tickets }
    }

    /// Least-loaded technician of `category_id`, or `None` if the category has
    /// none. Holds the category's advisory lock until the caller's
    /// transaction ends, so concurrent auto-assignments see each other's load.
    pub async fn least_loaded_technician(
        conn: &mut PgConnection,
        category_id: i32,
    ) -> Result<Option<String>> {
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(ASSIGNMENT_LOCK_NAMESPACE)
            .bind(category_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!("Failed to lock category {} for assignment: {:?}", category_id, e);
                AppError::Database(e)
            })?;

        let [open_a, open_b] = TicketStatus::OPEN;
        let loads = sqlx::query_as::<_, TechnicianLoad>(
            r#"
            SELECT u.user_id, COUNT(t.ticket_id) AS open_tickets
            FROM app_users u
            LEFT JOIN user_tickets ut ON ut.user_id = u.user_id
            LEFT JOIN tickets t
                   ON t.ticket_id = ut.ticket_id
                  AND t.is_deleted = FALSE
                  AND t.status IN ($2, $3)
            WHERE u.category_id = $1 AND u.is_deleted = FALSE
            GROUP BY u.user_id
            "#,
        )
        .bind(category_id)
        .bind(open_a)
        .bind(open_b)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load technicians for category {}: {:?}", category_id, e);
            AppError::Database(e)
        })?;

        let chosen = pick_least_loaded(&loads);
        if let Some(load) = chosen {
            tracing::debug!(
                "Least-loaded technician for category {}: {} ({} open)",
                category_id,
                load.user_id,
                load.open_tickets
            );
        }

        Ok(chosen.map(|load| load.user_id.clone()))
    }

    pub async fn auto_assign(&self, ticket_id: &str) -> Result<AssignmentOutcome> {
        self.tickets.create_user_ticket(ticket_id).await
    }

    /// Technicians not yet on the ticket. Those in `category_id` come first,
    /// then by category and user id.
    pub async fn get_assignable_users(
        &self,
        ticket_id: &str,
        category_id: Option<i32>,
    ) -> Result<Vec<AssignableUser>> {
        if !self.tickets.is_existing_ticket(ticket_id).await? {
            return Err(AppError::NotFound(format!("Ticket {} not found", ticket_id)));
        }

        let [open_a, open_b] = TicketStatus::OPEN;
        sqlx::query_as::<_, AssignableUser>(
            r#"
            SELECT u.user_id, u.first_name, u.last_name, u.email, u.category_id,
                   c.category_name,
                   (SELECT COUNT(*)
                      FROM user_tickets ut
                      JOIN tickets t ON t.ticket_id = ut.ticket_id
                     WHERE ut.user_id = u.user_id
                       AND t.is_deleted = FALSE
                       AND t.status IN ($3, $4)) AS open_tickets
            FROM app_users u
            LEFT JOIN help_desk_categories c ON c.category_id = u.category_id
            WHERE u.is_deleted = FALSE
              AND u.category_id IS NOT NULL
              AND NOT EXISTS (
                  SELECT 1 FROM user_tickets ut
                  WHERE ut.ticket_id = $1 AND ut.user_id = u.user_id
              )
            ORDER BY (u.category_id IS NOT DISTINCT FROM $2::int) DESC, u.category_id, u.user_id
            "#,
        )
        .bind(ticket_id)
        .bind(category_id)
        .bind(open_a)
        .bind(open_b)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list assignable users for {}: {:?}", ticket_id, e);
            AppError::Database(e)
        })
    }

    pub async fn get_assignees(&self, ticket_id: &str) -> Result<Vec<Assignee>> {
        if !self.tickets.is_existing_ticket(ticket_id).await? {
            return Err(AppError::NotFound(format!("Ticket {} not found", ticket_id)));
        }
        self.tickets.get_assignees(ticket_id).await
    }

    /// Returns `false` when the user was already assigned
    pub async fn assign_user(&self, ticket_id: &str, user_id: &str) -> Result<bool> {
        self.tickets.create_user_ticket_for(ticket_id, user_id).await
    }

    /// Remove one assignee. The ticket's `assigned` flag drops when its last
    /// assignee is removed. Returns `false` when the user was not assigned.
    pub async fn unassign_user(&self, ticket_id: &str, user_id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            AppError::Database(e)
        })?;

        TicketService::lock_ticket(&mut tx, ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {} not found", ticket_id)))?;

        let removed = sqlx::query("DELETE FROM user_tickets WHERE ticket_id = $1 AND user_id = $2")
            .bind(ticket_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to unassign {} from {}: {:?}", user_id, ticket_id, e);
                AppError::Database(e)
            })?
            .rows_affected();

        if removed == 0 {
            tracing::warn!("User {} is not assigned to ticket {}", user_id, ticket_id);
            return Ok(false);
        }

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_tickets WHERE ticket_id = $1")
                .bind(ticket_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to count assignees of {}: {:?}", ticket_id, e);
                    AppError::Database(e)
                })?;

        if remaining == 0 {
            sqlx::query(
                "UPDATE tickets SET assigned = FALSE, update_date = NOW() WHERE ticket_id = $1",
            )
            .bind(ticket_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to clear assigned flag on {}: {:?}", ticket_id, e);
                AppError::Database(e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit unassignment: {:?}", e);
            AppError::Database(e)
        })?;

        tracing::info!(
            "Ticket unassigned: id={}, user={}, remaining={}",
            ticket_id,
            user_id,
            remaining
        );

        Ok(true)
    }
}
