//! User profile payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use prepbox_core::{UserId, UserRole};

/// The authenticated customer's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub two_factor_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Initials shown in the account avatar (e.g., "JD").
    #[must_use]
    pub fn initials(&self) -> String {
        let first = self.first_name.chars().next();
        let last = self.last_name.chars().next();
        first
            .into_iter()
            .chain(last)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "id": "cku1",
            "email": "amine@example.tn",
            "firstName": "Amine",
            "lastName": "Ben Salah",
            "role": "CUSTOMER"
        }))
        .expect("profile json")
    }

    #[test]
    fn test_camel_case_wire_format() {
        let user = profile();
        assert_eq!(user.first_name, "Amine");
        assert!(!user.two_factor_enabled);
        assert!(user.phone.is_none());
    }

    #[test]
    fn test_initials() {
        assert_eq!(profile().initials(), "AB");
    }
}
