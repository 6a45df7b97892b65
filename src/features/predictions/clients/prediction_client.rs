use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::core::error::{AppError, Result};
use crate::features::predictions::models::{
    CategoryPrediction, PredictionInput, PriorityPrediction,
};

/// Text classifier for new tickets
#[async_trait]
pub trait PredictionClient: Send + Sync {
    async fn predict_category(&self, input: &PredictionInput) -> Result<CategoryPrediction>;
    async fn predict_priority(&self, input: &PredictionInput) -> Result<PriorityPrediction>;
}

/// Client for the HTTP prediction service
/// (`POST {base}/predict/category`, `POST {base}/predict/priority`)
pub struct HttpPredictionClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpPredictionClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, input: &PredictionInput) -> Result<T> {
        let url = format!("{}/predict/{}", self.base_url, path);

        tracing::debug!("Requesting {} prediction: {}", path, url);

        let response = self
            .http_client
            .post(&url)
            .json(input)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach prediction service: {}", e);
                AppError::ExternalServiceError(format!("Prediction request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Prediction service error: HTTP {} - {}", status, body);
            return Err(AppError::ExternalServiceError(format!(
                "Prediction service error: HTTP {} - {}",
                status, body
            )));
        }

        response.json::<T>().await.map_err(|e| {
            tracing::error!("Failed to parse {} prediction: {}", path, e);
            AppError::ExternalServiceError(format!("Failed to parse prediction: {}", e))
        })
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn predict_category(&self, input: &PredictionInput) -> Result<CategoryPrediction> {
        self.post("category", input).await
    }

    async fn predict_priority(&self, input: &PredictionInput) -> Result<PriorityPrediction> {
        self.post("priority", input).await
    }
}
