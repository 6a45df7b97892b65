mod product_code_service;
mod product_service;

pub use product_code_service::ProductCodeService;
pub use product_service::{ProductDetails, ProductService};
