//! User profile model

use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE: &str = "en";

/// A PassPorter user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default = "default_language")]
    pub preferred_language: String,
    #[serde(default = "default_notifications")]
    pub notifications_enabled: bool,
    /// Account creation (Unix ms)
    #[serde(default)]
    pub created_at: i64,
    /// Most recent sign-in (Unix ms)
    #[serde(default)]
    pub last_login_at: i64,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

const fn default_notifications() -> bool {
    true
}

impl User {
    /// A fresh profile for a just-authenticated account
    #[must_use]
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            email,
            display_name: None,
            phone_number: None,
            preferred_language: default_language(),
            notifications_enabled: default_notifications(),
            created_at: now,
            last_login_at: now,
        }
    }

    /// Name to show for this user in reports
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}
