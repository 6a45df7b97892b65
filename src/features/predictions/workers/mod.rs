mod prediction_processor;

pub use prediction_processor::PredictionProcessor;
