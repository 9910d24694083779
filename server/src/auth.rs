//! Bearer tokens and password hashing.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::{Caller, Role};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::account::Account;
use crate::error::ApiError;
use crate::state::AppState;

const SALT_LEN: usize = 16;

/// Token payload: who the caller is and what they may do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub role: Role,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(secret: &str, account: &Account, ttl: Duration) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        id: account.id.clone(),
        role: account.role,
        email: account.email.clone(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

/// Salted SHA-256, stored as `hex(salt)$hex(digest)`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!("{}${}", hex::encode(salt), digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, expected)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    digest(&salt, password)
        .as_bytes()
        .ct_eq(expected.as_bytes())
        .into()
}

fn digest(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Token from an `Authorization` value. The scheme name is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim_start().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extractor for routes that require a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Caller);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::unauthorized("Access denied: missing bearer token"))?;

        let claims = verify_token(&state.config.auth.jwt_secret, token).map_err(|err| {
            warn!("Rejected token: {}", err);
            ApiError::unauthorized("Invalid or expired token")
        })?;

        Ok(AuthUser(Caller {
            user_id: claims.id,
            role: claims.role,
        }))
    }
}
