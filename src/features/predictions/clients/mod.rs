mod prediction_client;

pub use prediction_client::{HttpPredictionClient, PredictionClient};
