use serde::{Deserialize, Serialize};

/// Request body for both prediction endpoints
#[derive(Debug, Clone, Serialize)]
pub struct PredictionInput {
    pub text: String,
}

impl PredictionInput {
    /// Title and description joined by a comma, the format the models were
    /// trained on
    pub fn for_ticket(title: &str, description: &str) -> Self {
        Self {
            text: format!("{},{}", title, description),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPrediction {
    #[serde(alias = "predictedCategory")]
    pub predicted_category: Option<String>,
    #[serde(default)]
    pub scores: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriorityPrediction {
    #[serde(alias = "predictedPriority")]
    pub predicted_priority: Option<String>,
    #[serde(default)]
    pub scores: Option<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_joins_title_and_description() {
        let input = PredictionInput::for_ticket("VPN down", "Cannot connect, error 809");
        assert_eq!(input.text, "VPN down,Cannot connect, error 809");
    }

    #[test]
    fn test_prediction_accepts_camel_case() {
        let p: CategoryPrediction =
            serde_json::from_str(r#"{"predictedCategory":"Authentication","scores":[0.9,0.1]}"#)
                .unwrap();
        assert_eq!(p.predicted_category.as_deref(), Some("Authentication"));

        let p: PriorityPrediction = serde_json::from_str(r#"{"predicted_priority":"HIGH"}"#).unwrap();
        assert_eq!(p.predicted_priority.as_deref(), Some("HIGH"));
        assert!(p.scores.is_none());
    }
}
