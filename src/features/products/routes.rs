use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::products::handlers;
use crate::features::products::services::ProductService;

pub fn routes(service: Arc<ProductService>) -> Router {
    Router::new()
        .route(
            "/api/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/api/products/options",
            get(handlers::list_product_options),
        )
        .route(
            "/api/products/{id}",
            get(handlers::get_product).put(handlers::update_product),
        )
        .with_state(service)
}
