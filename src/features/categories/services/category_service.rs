use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::HelpDeskCategory;

/// Service for help desk category lookups
pub struct CategoryService {
    pool: PgPool,
}

impl CategoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List all categories ordered by id
    pub async fn list(&self) -> Result<Vec<HelpDeskCategory>> {
        sqlx::query_as::<_, HelpDeskCategory>(
            r#"
            SELECT category_id, category_name
            FROM help_desk_categories
            ORDER BY category_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list categories: {:?}", e);
            AppError::Database(e)
        })
    }

    pub async fn get_by_id(&self, category_id: i32) -> Result<HelpDeskCategory> {
        let category = sqlx::query_as::<_, HelpDeskCategory>(
            r#"
            SELECT category_id, category_name
            FROM help_desk_categories
            WHERE category_id = $1
            "#,
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get category {}: {:?}", category_id, e);
            AppError::Database(e)
        })?;

        category.ok_or_else(|| AppError::NotFound(format!("Category {} not found", category_id)))
    }

    /// Case-insensitive lookup by name; `None` when no category matches.
    /// Used to map predicted category labels to ids.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<HelpDeskCategory>> {
        sqlx::query_as::<_, HelpDeskCategory>(
            r#"
            SELECT category_id, category_name
            FROM help_desk_categories
            WHERE LOWER(category_name) = LOWER($1)
            "#,
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to find category '{}': {:?}", name, e);
            AppError::Database(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_find_by_name_is_case_insensitive(pool: PgPool) {
        crate::core::seed::seed_reference_data(&pool).await.unwrap();
        let service = CategoryService::new(pool);

        let found = service.find_by_name("  network security ").await.unwrap();
        assert_eq!(found.map(|c| c.category_name).as_deref(), Some("Network Security"));

        assert!(service.find_by_name("Printers").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_list_and_get(pool: PgPool) {
        crate::core::seed::seed_reference_data(&pool).await.unwrap();
        let service = CategoryService::new(pool);

        let categories = service.list().await.unwrap();
        assert_eq!(categories.len(), 6);

        let first = service.get_by_id(categories[0].category_id).await.unwrap();
        assert_eq!(first, categories[0]);

        assert!(matches!(
            service.get_by_id(9999).await,
            Err(AppError::NotFound(_))
        ));
    }
}
