//! User directory model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    /// Profile name, falling back to the username.
    pub fn display_name(&self) -> &str {
        match self.profile_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Request body for registering a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = User {
            id: "u1".to_string(),
            username: "jdoe".to_string(),
            profile_name: Some("Jane Doe".to_string()),
            email: None,
        };
        assert_eq!(user.display_name(), "Jane Doe");

        user.profile_name = Some("   ".to_string());
        assert_eq!(user.display_name(), "jdoe");

        user.profile_name = None;
        assert_eq!(user.display_name(), "jdoe");
    }
}
