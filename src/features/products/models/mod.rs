mod product;
mod product_code;

pub use product::{CreateProduct, Product, ProductOption, UpdateProduct};
pub use product_code::ProductCode;
