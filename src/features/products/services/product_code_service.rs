use std::time::Duration;

use sqlx::{PgConnection, PgPool};

use crate::core::error::{AppError, Result};
use crate::features::products::models::ProductCode;
use crate::shared::constants::{PRODUCT_CODE_BACKOFF_BASE_MS, PRODUCT_CODE_MAX_RETRIES};

/// Delay before retry number `retry` (1-based): 100ms, 200ms, 400ms, ...
pub fn backoff_delay(retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(16);
    Duration::from_millis(PRODUCT_CODE_BACKOFF_BASE_MS << exponent)
}

/// Owns product codes and their ticket sequence counters.
///
/// The `*_in` functions run on a caller-supplied connection so they can join
/// the caller's transaction.
pub struct ProductCodeService {
    pool: PgPool,
}

impl ProductCodeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a code for `product_id`, drawing a fresh candidate for each attempt.
    ///
    /// A candidate that collides with an existing code is skipped without
    /// aborting the surrounding transaction. After the first attempt up to
    /// `PRODUCT_CODE_MAX_RETRIES` retries follow, with exponential backoff,
    /// before giving up with `AppError::DuplicateCode`.
    pub async fn create_code_in<F>(
        conn: &mut PgConnection,
        product_id: &str,
        mut candidate: F,
    ) -> Result<ProductCode>
    where
        F: FnMut() -> String,
    {
        for attempt in 0..=PRODUCT_CODE_MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    "Duplicate product code generated for {}. Retry {} in {}ms",
                    product_id,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let code = candidate();

            let inserted = sqlx::query_as::<_, ProductCode>(
                r#"
                INSERT INTO product_codes (product_id, code, count)
                VALUES ($1, $2, 1)
                ON CONFLICT (code) DO NOTHING
                RETURNING product_id, code, count
                "#,
            )
            .bind(product_id)
            .bind(&code)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert product code for {}: {:?}", product_id, e);
                AppError::Database(e)
            })?;

            if let Some(product_code) = inserted {
                tracing::info!(
                    "Created product code {} for product {}",
                    product_code.code,
                    product_id
                );
                return Ok(product_code);
            }
        }

        Err(AppError::DuplicateCode(format!(
            "Could not generate a unique code for product {} after {} retries",
            product_id, PRODUCT_CODE_MAX_RETRIES
        )))
    }

    pub async fn get_code(&self, product_id: &str) -> Result<ProductCode> {
        let code = sqlx::query_as::<_, ProductCode>(
            "SELECT product_id, code, count FROM product_codes WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get product code for {}: {:?}", product_id, e);
            AppError::Database(e)
        })?;

        code.ok_or_else(|| {
            AppError::NotFound(format!("Product code for product {} not found", product_id))
        })
    }

    /// Read the code row and hold its lock until the transaction ends, so the
    /// count read here is the one the following increment advances.
    pub async fn lock_code(conn: &mut PgConnection, product_id: &str) -> Result<Option<ProductCode>> {
        sqlx::query_as::<_, ProductCode>(
            r#"
            SELECT product_id, code, count
            FROM product_codes
            WHERE product_id = $1
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to lock product code for {}: {:?}", product_id, e);
            AppError::Database(e)
        })
    }

    /// Atomically advance the counter. `false` when the product has no code;
    /// that is not an error. Ticket creation calls this while holding the
    /// lock from `lock_code`, so the count it read is the one advanced here.
    pub async fn increment_count_in(conn: &mut PgConnection, product_id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE product_codes SET count = count + 1 WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!("Failed to increment product code count for {}: {:?}", product_id, e);
                AppError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            tracing::warn!("Product code for product {} not found", product_id);
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seed::seed_reference_data;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_backoff_doubles_from_base() {
        let delays: Vec<u128> = (1..=PRODUCT_CODE_MAX_RETRIES)
            .map(|retry| backoff_delay(retry).as_millis())
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1600]);
    }

    async fn insert_product(pool: &PgPool, product_id: &str) {
        sqlx::query("INSERT INTO products (product_id, product_name) VALUES ($1, 'Test product')")
            .bind(product_id)
            .execute(pool)
            .await
            .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_create_code_retries_on_collision(pool: PgPool) {
        seed_reference_data(&pool).await.unwrap();
        insert_product(&pool, "p-collide").await;

        let mut candidates = vec!["ABCDEFG", "DEFAULT", "DEFAULT"];
        let mut calls = 0;
        let mut tx = pool.begin().await.unwrap();
        let code = ProductCodeService::create_code_in(&mut tx, "p-collide", || {
            calls += 1;
            candidates.pop().unwrap().to_string()
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(code.code, "ABCDEFG");
        assert_eq!(code.count, 1);
        assert_eq!(calls, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_create_code_gives_up_after_retries(pool: PgPool) {
        seed_reference_data(&pool).await.unwrap();
        insert_product(&pool, "p-exhaust").await;

        let mut calls = 0;
        let mut tx = pool.begin().await.unwrap();
        let result = ProductCodeService::create_code_in(&mut tx, "p-exhaust", || {
            calls += 1;
            "DEFAULT".to_string()
        })
        .await;

        assert!(matches!(result, Err(AppError::DuplicateCode(_))));
        assert_eq!(calls, 1 + PRODUCT_CODE_MAX_RETRIES);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_increment_missing_code_is_noop(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        assert!(!ProductCodeService::increment_count_in(&mut conn, "missing")
            .await
            .unwrap());
        drop(conn);

        let service = ProductCodeService::new(pool);
        assert!(matches!(
            service.get_code("missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_increments_are_not_lost(pool: PgPool) {
        seed_reference_data(&pool).await.unwrap();
        let pool = Arc::new(pool);
        let callers = 20;

        let handles: Vec<_> = (0..callers)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    let mut tx = pool.begin().await.unwrap();
                    let seen = ProductCodeService::lock_code(&mut tx, "DEFAULT")
                        .await
                        .unwrap()
                        .unwrap()
                        .count;
                    assert!(ProductCodeService::increment_count_in(&mut tx, "DEFAULT")
                        .await
                        .unwrap());
                    tx.commit().await.unwrap();
                    seen
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()), "duplicate pre-increment value");
        }

        let service = ProductCodeService::new((*pool).clone());
        let code = service.get_code("DEFAULT").await.unwrap();
        assert_eq!(code.count, 1 + callers);
        assert_eq!(seen, (1..=callers).collect::<HashSet<i32>>());
    }
}
