//! Ticket classification pipeline.
//!
//! Creating a ticket enqueues a job; `PredictionProcessor` claims jobs,
//! asks the prediction service for a category and priority, stores them, and
//! assigns the ticket.

pub mod clients;
pub mod models;
pub mod services;
pub mod workers;

pub use clients::{HttpPredictionClient, PredictionClient};
pub use services::PredictionQueueService;
pub use workers::PredictionProcessor;
