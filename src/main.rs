mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware, seed};
use crate::features::assignments::{routes as assignments_routes, AssignmentService};
use crate::features::auth;
use crate::features::categories::{routes as categories_routes, CategoryService};
use crate::features::comments::{routes as comments_routes, CommentService};
use crate::features::predictions::{
    HttpPredictionClient, PredictionClient, PredictionProcessor, PredictionQueueService,
};
use crate::features::products::{routes as products_routes, ProductService};
use crate::features::tickets::{routes as tickets_routes, TicketService, TicketState};
use crate::features::users::{routes as users_routes, UserService};
use crate::modules::storage::{BlobStorage, MinIOClient};
use axum::{extract::DefaultBodyLimit, middleware::from_fn, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Log system info
    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    // Run migrations automatically
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    seed::seed_reference_data(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Seeding reference data failed: {}", e))?;
    tracing::info!("Reference data seeded");

    // Initialize auth
    let jwks_client = Arc::new(auth::JwksClient::new(
        &config.auth.jwks_url,
        config.auth.jwks_cache_ttl,
    ));
    let jwt_validator = Arc::new(auth::JwtValidator::new(
        jwks_client,
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        config.auth.jwt_leeway,
        config.auth.roles_claim.clone(),
    ));
    tracing::info!("Auth configuration initialized");

    // Initialize MinIO client for attachments
    let storage: Arc<dyn BlobStorage> = Arc::new(
        MinIOClient::new(config.minio.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO client: {}", e))?,
    );
    tracing::info!("MinIO client initialized for bucket: {}", config.minio.bucket);

    let category_service = Arc::new(CategoryService::new(pool.clone()));
    let product_service = Arc::new(ProductService::new(pool.clone()));
    let user_service = Arc::new(UserService::new(pool.clone()));
    let ticket_service = Arc::new(TicketService::new(pool.clone()));
    let assignment_service = Arc::new(AssignmentService::new(
        pool.clone(),
        Arc::clone(&ticket_service),
    ));
    let comment_service = Arc::new(CommentService::new(pool.clone(), Arc::clone(&storage)));
    let queue_service = Arc::new(PredictionQueueService::new(
        pool.clone(),
        config.prediction.max_retries,
        config.prediction.lease,
    ));
    tracing::info!("Help-desk services initialized");

    // Spawn the classification worker when a prediction service is configured
    match config.prediction.service_url.clone() {
        Some(url) => {
            let client: Arc<dyn PredictionClient> = Arc::new(
                HttpPredictionClient::new(url.clone(), config.prediction.timeout)
                    .map_err(|e| anyhow::anyhow!("Failed to create prediction client: {}", e))?,
            );
            let processor = PredictionProcessor::new(
                Arc::clone(&queue_service),
                client,
                Arc::clone(&ticket_service),
                Arc::clone(&category_service),
                config.prediction.poll_interval,
                config.prediction.batch_size,
            );
            tokio::spawn(async move {
                processor.run().await;
            });
            tracing::info!("Prediction processor worker spawned ({})", url);
        }
        None => {
            tracing::warn!(
                "PREDICTION_SERVICE_URL not set. Tickets will be queued but not classified."
            );
        }
    }

    let ticket_state = TicketState {
        ticket_service: Arc::clone(&ticket_service),
        comment_service: Arc::clone(&comment_service),
        queue_service: Arc::clone(&queue_service),
    };

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    // Build swagger router
    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(users_routes::routes(user_service))
        .merge(categories_routes::routes(category_service))
        .merge(products_routes::routes(product_service))
        .merge(tickets_routes::routes(ticket_state))
        .merge(assignments_routes::routes(assignment_service))
        .merge(comments_routes::routes(comment_service))
        .route_layer(axum::middleware::from_fn_with_state(
            jwt_validator.clone(),
            middleware::auth_middleware,
        ));

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(health_route)
        .layer(DefaultBodyLimit::max(config.app.max_request_body_size))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
