pub mod prediction_queue_service;

pub use prediction_queue_service::*;
