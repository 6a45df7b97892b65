mod prediction;
mod prediction_job;

pub use prediction::{CategoryPrediction, PredictionInput, PriorityPrediction};
pub use prediction_job::{PredictionJob, PredictionJobStatus};
