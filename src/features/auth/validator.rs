use super::model::{AuthenticatedUser, Role};
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::jwks::JwksClient;

pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    issuer: String,
    audience: String,
    leeway: u64,
    roles_claim: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,

    // Roles live under a provider-specific claim name, looked up at runtime
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

/// Roles may be a single string or an array of strings
fn role_strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

impl JwtValidator {
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: String,
        leeway: Duration,
        roles_claim: String,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            audience,
            leeway: leeway.as_secs(),
            roles_claim,
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token).map_err(|e| AppError::Auth(e.to_string()))?;

        let kid = header
            .kid
            .ok_or_else(|| AppError::Auth("Missing kid in token header".to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(AppError::Auth(format!(
                "Unsupported algorithm: {:?}. Only RS256 is allowed",
                header.alg
            )));
        }

        let decoding_key = self
            .jwks_client
            .get_key(&kid)
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let claims = token_data.claims;
        let role = Role::from_claims(&role_strings(claims.extra.get(&self.roles_claim)));

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            role,
            email: claims.email,
            first_name: claims.given_name,
            last_name: claims.family_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_strings_accepts_string_or_array() {
        assert_eq!(role_strings(Some(&json!("Admin"))), vec!["Admin"]);
        assert_eq!(
            role_strings(Some(&json!(["EndUser", 3, "Technician"]))),
            vec!["EndUser", "Technician"]
        );
        assert!(role_strings(Some(&json!({"role": "Admin"}))).is_empty());
        assert!(role_strings(None).is_empty());
    }

    #[test]
    fn test_claims_keep_custom_role_claim() {
        let claims: Claims = serde_json::from_value(json!({
            "sub": "user-1",
            "iss": "https://id.example.com",
            "aud": "helpdesk",
            "exp": 0,
            "https://helpdesk/roles": ["Technician"],
        }))
        .unwrap();

        let roles = role_strings(claims.extra.get("https://helpdesk/roles"));
        assert_eq!(Role::from_claims(&roles), Role::Technician);
        assert!(claims.email.is_none());
    }
}
