use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::tickets::models::Assignee;
use crate::features::users::models::{AppUser, SyncAppUser};

const USER_COLUMNS: &str = r#"
    user_id, first_name, last_name, email, category_id, is_deleted, created_at, updated_at
"#;

/// Local user profiles and technician specialties
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the caller's profile from their token claims. The technician
    /// category is never touched here.
    pub async fn sync_user(&self, input: SyncAppUser) -> Result<AppUser> {
        let user = sqlx::query_as::<_, AppUser>(&format!(
            r#"
            INSERT INTO app_users (user_id, first_name, last_name, email)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET first_name = COALESCE(EXCLUDED.first_name, app_users.first_name),
                last_name = COALESCE(EXCLUDED.last_name, app_users.last_name),
                email = COALESCE(EXCLUDED.email, app_users.email),
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&input.user_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to sync user {}: {:?}", input.user_id, e);
            AppError::Database(e)
        })?;

        tracing::debug!("User profile synced: {}", user.user_id);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<AppUser> {
        let user = sqlx::query_as::<_, AppUser>(&format!(
            "SELECT {USER_COLUMNS} FROM app_users WHERE user_id = $1 AND is_deleted = FALSE"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get user {}: {:?}", user_id, e);
            AppError::Database(e)
        })?;

        user.ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn is_existing_user(&self, user_id: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM app_users WHERE user_id = $1 AND is_deleted = FALSE)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check user {}: {:?}", user_id, e);
            AppError::Database(e)
        })
    }

    /// Make a user a technician for `category_id`, or clear their specialty
    /// with `None`
    pub async fn set_category(&self, user_id: &str, category_id: Option<i32>) -> Result<AppUser> {
        if let Some(category_id) = category_id {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM help_desk_categories WHERE category_id = $1)",
            )
            .bind(category_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to check category {}: {:?}", category_id, e);
                AppError::Database(e)
            })?;

            if !exists {
                return Err(AppError::NotFound(format!(
                    "Category {} not found",
                    category_id
                )));
            }
        }

        let user = sqlx::query_as::<_, AppUser>(&format!(
            r#"
            UPDATE app_users
            SET category_id = $2, updated_at = NOW()
            WHERE user_id = $1 AND is_deleted = FALSE
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to set category of {}: {:?}", user_id, e);
            AppError::Database(e)
        })?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        tracing::info!("Technician category set: user={}, category={:?}", user_id, category_id);
        Ok(user)
    }

    /// Users with a specialty category, by category then user id
    pub async fn list_technicians(&self) -> Result<Vec<Assignee>> {
        sqlx::query_as::<_, Assignee>(
            r#"
            SELECT u.user_id, u.first_name, u.last_name, u.email, u.category_id, c.category_name
            FROM app_users u
            JOIN help_desk_categories c ON c.category_id = u.category_id
            WHERE u.is_deleted = FALSE
            ORDER BY u.category_id, u.user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list technicians: {:?}", e);
            AppError::Database(e)
        })
    }
}
