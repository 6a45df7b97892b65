use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Help desk role carried in the access token.
///
/// Ordered from least to most privileged so that `max()` over the token's
/// role list yields the effective role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    EndUser,
    Technician,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::EndUser => "EndUser",
            Role::Technician => "Technician",
            Role::Admin => "Admin",
        }
    }

    /// Resolve the effective role from the raw role strings of a token.
    /// Unknown strings are ignored; no recognised role means `EndUser`.
    pub fn from_claims<S: AsRef<str>>(roles: &[S]) -> Self {
        roles
            .iter()
            .filter_map(|r| r.as_ref().parse::<Role>().ok())
            .max()
            .unwrap_or(Role::EndUser)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
            "admin" => Ok(Role::Admin),
            "technician" => Ok(Role::Technician),
            "enduser" | "user" => Ok(Role::EndUser),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Subject of the access token; used as the user id everywhere
    pub user_id: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Technicians and admins may work tickets
    pub fn has_technician_access(&self) -> bool {
        self.role >= Role::Technician
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_lenient() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("technician".parse::<Role>().unwrap(), Role::Technician);
        assert_eq!("End_User".parse::<Role>().unwrap(), Role::EndUser);
        assert_eq!("EndUser".parse::<Role>().unwrap(), Role::EndUser);
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn test_effective_role_is_most_privileged() {
        assert_eq!(Role::from_claims(&["EndUser", "Technician"]), Role::Technician);
        assert_eq!(Role::from_claims(&["Technician", "Admin"]), Role::Admin);
        assert_eq!(Role::from_claims(&["unknown"]), Role::EndUser);
        assert_eq!(Role::from_claims::<&str>(&[]), Role::EndUser);
    }

    #[test]
    fn test_role_display_round_trips() {
        for role in [Role::EndUser, Role::Technician, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }
}
