use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::products::models::{
    CreateProduct, Product, ProductCode, ProductOption, UpdateProduct,
};
use crate::features::products::services::ProductCodeService;
use crate::features::tickets::models::{TicketListItem, TicketStatus};
use crate::features::tickets::services::TICKET_LIST_SELECT;
use crate::shared::constants::PRODUCT_CODE_LENGTH;
use crate::shared::id_generator::generate_id;

const PRODUCT_COLUMNS: &str = r#"
    product_id, product_name, product_description, user_id, release_date,
    update_user_id, update_date, is_displayed, is_deleted
"#;

/// Product with its code and the tickets filed against it
#[derive(Debug, Clone)]
pub struct ProductDetails {
    pub product: Product,
    pub code: Option<ProductCode>,
    pub tickets: Vec<TicketListItem>,
}

/// Service for product catalogue operations
pub struct ProductService {
    pool: PgPool,
    codes: ProductCodeService,
}

impl ProductService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            codes: ProductCodeService::new(pool.clone()),
            pool,
        }
    }

    /// Products that are displayed and not deleted, newest release first
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_displayed = TRUE AND is_deleted = FALSE
            ORDER BY release_date DESC NULLS LAST
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list products: {:?}", e);
            AppError::Database(e)
        })
    }

    /// Product with tickets in the open (`completed = false`) or closed group,
    /// newest first
    pub async fn get_product_details(
        &self,
        product_id: &str,
        completed: bool,
    ) -> Result<ProductDetails> {
        let product = self.get_product_edit(product_id).await?;

        let code = match self.codes.get_code(product_id).await {
            Ok(code) => Some(code),
            Err(AppError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let [first, second] = TicketStatus::group(completed);
        let tickets = sqlx::query_as::<_, TicketListItem>(&format!(
            r#"
            {TICKET_LIST_SELECT}
            WHERE t.product_id = $1
              AND t.is_deleted = FALSE
              AND t.status IN ($2, $3)
            ORDER BY t.issue_date DESC
            "#
        ))
        .bind(product_id)
        .bind(first)
        .bind(second)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list tickets for product {}: {:?}", product_id, e);
            AppError::Database(e)
        })?;

        Ok(ProductDetails {
            product,
            code,
            tickets,
        })
    }

    /// Bare product row
    pub async fn get_product_edit(&self, product_id: &str) -> Result<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE product_id = $1 AND is_deleted = FALSE
            "#
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get product {}: {:?}", product_id, e);
            AppError::Database(e)
        })?;

        product.ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Create a product and its unique code in one transaction
    pub async fn create_product(&self, input: CreateProduct) -> Result<(Product, ProductCode)> {
        let product_id = new_product_id();

        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!("Failed to begin transaction: {:?}", e);
            AppError::Database(e)
        })?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (product_id, product_name, product_description, user_id, release_date)
            VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product_id)
        .bind(&input.product_name)
        .bind(&input.product_description)
        .bind(&input.user_id)
        .bind(input.release_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create product: {:?}", e);
            AppError::Database(e)
        })?;

        let code = ProductCodeService::create_code_in(&mut tx, &product_id, || {
            generate_id(PRODUCT_CODE_LENGTH)
        })
        .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!("Failed to commit product {}: {:?}", product_id, e);
            AppError::Database(e)
        })?;

        tracing::info!(
            "Product created: id={}, code={}, by={}",
            product.product_id,
            code.code,
            input.user_id
        );

        Ok((product, code))
    }

    /// Returns `false` when the product is missing or nothing changed
    pub async fn update_product(&self, input: UpdateProduct) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET product_name = $2,
                product_description = $3,
                release_date = COALESCE($4, release_date),
                update_user_id = $5,
                update_date = NOW()
            WHERE product_id = $1
              AND is_deleted = FALSE
              AND (product_name IS DISTINCT FROM $2
                   OR product_description IS DISTINCT FROM $3
                   OR ($4::timestamptz IS NOT NULL AND release_date IS DISTINCT FROM $4))
            "#,
        )
        .bind(&input.product_id)
        .bind(&input.product_name)
        .bind(&input.product_description)
        .bind(input.release_date)
        .bind(&input.update_user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update product {}: {:?}", input.product_id, e);
            AppError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            tracing::warn!("No changes detected during update of product {}", input.product_id);
            return Ok(false);
        }

        tracing::info!("Product updated: id={}", input.product_id);
        Ok(true)
    }

    /// Id/name pairs of displayed products, oldest release first
    pub async fn list_product_options(&self) -> Result<Vec<ProductOption>> {
        sqlx::query_as::<_, ProductOption>(
            r#"
            SELECT product_id, product_name
            FROM products
            WHERE is_displayed = TRUE AND is_deleted = FALSE
            ORDER BY release_date ASC NULLS LAST
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list product options: {:?}", e);
            AppError::Database(e)
        })
    }
}

/// 18-character product id taken from a random UUID
fn new_product_id() -> String {
    Uuid::new_v4().to_string()[..18].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seed::seed_reference_data;
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;

    #[test]
    fn test_new_product_id_shape() {
        let id = new_product_id();
        assert_eq!(id.len(), 18);
        assert_ne!(id, new_product_id());
    }

    fn create_input(user_id: &str) -> CreateProduct {
        CreateProduct {
            product_name: "Payroll Portal".to_string(),
            product_description: Some(Sentence(3..8).fake()),
            release_date: None,
            user_id: user_id.to_string(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_create_product_mints_code(pool: PgPool) {
        seed_reference_data(&pool).await.unwrap();
        let service = ProductService::new(pool);

        let (product, code) = service.create_product(create_input("admin-1")).await.unwrap();

        assert_eq!(code.product_id, product.product_id);
        assert_eq!(code.code.len(), PRODUCT_CODE_LENGTH);
        assert_eq!(code.count, 1);
        assert!(product.release_date.is_some());

        let listed = service.list_products().await.unwrap();
        assert!(listed.iter().any(|p| p.product_id == product.product_id));
        // The seeded DEFAULT product is hidden
        assert!(listed.iter().all(|p| p.product_id != "DEFAULT"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_update_product_reports_no_change(pool: PgPool) {
        seed_reference_data(&pool).await.unwrap();
        let service = ProductService::new(pool);
        let (product, _) = service.create_product(create_input("admin-1")).await.unwrap();

        let update = UpdateProduct {
            product_id: product.product_id.clone(),
            product_name: "Payroll Portal v2".to_string(),
            product_description: product.product_description.clone(),
            release_date: None,
            update_user_id: "admin-2".to_string(),
        };

        assert!(service.update_product(update.clone()).await.unwrap());
        assert!(!service.update_product(update).await.unwrap());

        let edited = service.get_product_edit(&product.product_id).await.unwrap();
        assert_eq!(edited.product_name, "Payroll Portal v2");
        assert_eq!(edited.update_user_id.as_deref(), Some("admin-2"));
    }
}
