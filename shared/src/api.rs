use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::access::Role;

/// JSON wrapper used by every API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub sucesso: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mensagem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dados: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl<T> Envelope<T> {
    pub fn ok(dados: T) -> Self {
        Envelope {
            sucesso: true,
            mensagem: None,
            dados: Some(dados),
            total: None,
        }
    }

    pub fn with_message(mut self, mensagem: impl Into<String>) -> Self {
        self.mensagem = Some(mensagem.into());
        self
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }
}

impl Envelope<()> {
    pub fn message(mensagem: impl Into<String>) -> Self {
        Envelope {
            sucesso: true,
            mensagem: Some(mensagem.into()),
            dados: None,
            total: None,
        }
    }

    pub fn failure(mensagem: impl Into<String>) -> Self {
        Envelope {
            sucesso: false,
            mensagem: Some(mensagem.into()),
            dados: None,
            total: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub birthdate: NaiveDate,
    pub job_title: String,
    pub role: Role,
}

/// Registration form. Fields default to empty so that missing values are
/// reported as form errors rather than as malformed JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub birthdate: String,
    pub job_title: String,
    pub role: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPayload {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCode {
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PasswordResetRequest {
    pub email: String,
    pub code: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub job_title: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}
