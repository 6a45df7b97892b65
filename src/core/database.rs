use crate::core::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Connect the shared pool. The help-desk services hold row locks only for
/// the length of one transaction, so acquisition waits stay short.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!(
        "Connecting to {} (max_connections={}, min_connections={})",
        redact_url(&config.url),
        config.max_connections,
        config.min_connections
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(&config.url)
        .await
}

/// Host and database part of a connection URL, without credentials
fn redact_url(url: &str) -> &str {
    url.rsplit_once('@').map(|(_, host)| host).unwrap_or("database")
}
