//! Local user profiles.
//!
//! Identities live in the external identity provider; `app_users` keeps the
//! names shown on tickets and each technician's specialty category.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::UserService;
