//! Password recovery codes.
//!
//! A code is six characters from `A-Z0-9`, valid for a configurable window
//! (15 minutes by default) and cleared once used.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::account::Account;

pub const CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Why a recovery code was refused. All causes share one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecoveryError {
    #[error("No recovery code was requested")]
    NotRequested,
    #[error("Recovery code expired. Request a new code.")]
    Expired,
    #[error("Incorrect recovery code")]
    Mismatch,
}

pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Store a fresh code on the account and return it.
pub fn issue(account: &mut Account, ttl: Duration, now: DateTime<Utc>) -> String {
    let code = generate_code();
    account.recovery_code = Some(code.clone());
    account.recovery_code_expiry = Some(now + ttl);
    code
}

/// Check `candidate` against the account's pending code. Comparison ignores
/// case.
pub fn check(account: &Account, candidate: &str, now: DateTime<Utc>) -> Result<(), RecoveryError> {
    let code = account
        .recovery_code
        .as_deref()
        .ok_or(RecoveryError::NotRequested)?;
    if account.recovery_code_expiry.is_some_and(|expiry| now > expiry) {
        return Err(RecoveryError::Expired);
    }
    let candidate = candidate.trim().to_uppercase();
    if !bool::from(code.as_bytes().ct_eq(candidate.as_bytes())) {
        return Err(RecoveryError::Mismatch);
    }
    Ok(())
}

pub fn email_text(username: &str, code: &str, app_name: &str, ttl: Duration) -> String {
    format!(
        "Hello {username},\n\nYour {app_name} password recovery code is: {code}\n\nThis code expires in {} minutes. If you did not request it, ignore this email.",
        ttl.num_minutes()
    )
}

pub fn email_html(username: &str, code: &str, app_name: &str, ttl: Duration) -> String {
    use shared::render::escape;
    format!(
        r##"<!DOCTYPE html><html lang="en"><head><meta charset="UTF-8"><title>{app} - Password recovery</title></head>
<body style="font-family: Arial, sans-serif; background-color: #f4f4f4;">
<div style="max-width: 600px; margin: 0 auto; padding: 20px; background-color: #ffffff;">
<h1>{app}</h1><h2>Password recovery</h2>
<p>Hello, <strong>{user}</strong></p>
<p>We received a request to recover the password for your account. If you did not make it, ignore this email.</p>
<p>Use the code below to reset your password:</p>
<div style="font-size: 32px; font-weight: bold; letter-spacing: 5px; text-align: center; border: 2px dashed #93c5fd; padding: 20px;">{code}</div>
<p>This code expires in <strong>{minutes} minutes</strong>.</p>
</div></body></html>"##,
        app = escape(app_name),
        user = escape(username),
        minutes = ttl.num_minutes()
    )
}
