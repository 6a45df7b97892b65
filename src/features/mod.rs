pub mod assignments;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod predictions;
pub mod products;
pub mod tickets;
pub mod users;
