//! Types for authentication and user management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User data as returned by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: String,

    /// The user's email address
    #[serde(default)]
    pub email: Option<String>,

    /// The user metadata
    #[serde(default)]
    pub user_metadata: HashMap<String, serde_json::Value>,

    /// The creation time
    #[serde(default)]
    pub created_at: Option<String>,
}

impl User {
    pub fn new(id: &str, email: &str) -> Self {
        Self {
            id: id.to_string(),
            email: Some(email.to_string()),
            user_metadata: HashMap::new(),
            created_at: None,
        }
    }

    /// `full_name` from the user metadata, falling back to the email
    pub fn display_name(&self) -> Option<String> {
        self.user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.email.clone())
    }
}

/// Response of the password grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}
