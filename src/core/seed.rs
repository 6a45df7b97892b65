use sqlx::PgPool;

use crate::shared::constants::DEFAULT_PRODUCT_ID;

const DEFAULT_CATEGORIES: &[&str] = &[
    "Network Security",
    "Authentication",
    "Data Backup and Recovery",
    "Incident Response",
    "Malware Protection",
    "Mobile Security",
];

/// Insert the reference rows the application needs. Safe to run on every start.
pub async fn seed_reference_data(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let (category_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM help_desk_categories")
        .fetch_one(&mut *tx)
        .await?;

    if category_count == 0 {
        for name in DEFAULT_CATEGORIES {
            sqlx::query(
                "INSERT INTO help_desk_categories (category_name) VALUES ($1) ON CONFLICT (category_name) DO NOTHING",
            )
            .bind(name)
            .execute(&mut *tx)
            .await?;
        }
        tracing::info!("Seeded {} help desk categories", DEFAULT_CATEGORIES.len());
    }

    let product = sqlx::query(
        r#"
        INSERT INTO products (product_id, product_name, product_description, release_date, is_displayed)
        VALUES ($1, 'Default product', 'Tickets filed without a product', NOW(), FALSE)
        ON CONFLICT (product_id) DO NOTHING
        "#,
    )
    .bind(DEFAULT_PRODUCT_ID)
    .execute(&mut *tx)
    .await?;

    let code = sqlx::query(
        r#"
        INSERT INTO product_codes (product_id, code, count)
        VALUES ($1, $1, 1)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(DEFAULT_PRODUCT_ID)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    if product.rows_affected() > 0 || code.rows_affected() > 0 {
        tracing::info!("Seeded {} product and product code", DEFAULT_PRODUCT_ID);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_seeding_is_idempotent(pool: PgPool) {
        seed_reference_data(&pool).await.unwrap();
        seed_reference_data(&pool).await.unwrap();

        let (categories,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM help_desk_categories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(categories, DEFAULT_CATEGORIES.len() as i64);

        let (code, count): (String, i32) =
            sqlx::query_as("SELECT code, count FROM product_codes WHERE product_id = $1")
                .bind(DEFAULT_PRODUCT_ID)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(code, "DEFAULT");
        assert_eq!(count, 1);
    }
}
