use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{Role, UserProfile};

/// A stored user account, including credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub birthdate: NaiveDate,
    pub job_title: String,
    pub role: Role,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_code_expiry: Option<DateTime<Utc>>,
}

impl Account {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            birthdate: self.birthdate,
            job_title: self.job_title.clone(),
            role: self.role,
        }
    }

    pub fn clear_recovery_code(&mut self) {
        self.recovery_code = None;
        self.recovery_code_expiry = None;
    }
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
