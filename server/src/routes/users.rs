use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::{NaiveDate, Utc};
use shared::access::{authorize_account, require_admin, AccessDenied};
use shared::{
    Caller, Envelope, LoginPayload, LoginRequest, PasswordResetRequest, RegisterRequest, Role,
    UserProfile, UserUpdateRequest, VerifiedCode,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::ApiJson;
use crate::account::{normalize_email, Account};
use crate::auth::{self, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::mailer::MailMessage;
use crate::recovery;
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/auth/register", post(register))
        .route("/api/users/auth/login", post(login))
        .route("/api/users/auth/recover/{email}", get(send_recovery_code))
        .route(
            "/api/users/auth/verify-code/{email}/{code}",
            get(verify_recovery_code),
        )
        .route(
            "/api/users/auth/update-password-recovery",
            put(reset_password),
        )
        .route("/api/users", get(list_users))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn denied(caller: &Caller, what: &str, err: AccessDenied) -> ApiError {
    warn!("{} ({}) denied {}: {}", caller.user_id, caller.role, what, err);
    ApiError::from(err)
}

fn user_missing() -> ApiError {
    ApiError::not_found("User not found")
}

async fn account_by_email(state: &AppState, email: &str) -> ApiResult<Account> {
    state
        .users
        .find_by_email(&normalize_email(email))
        .await?
        .ok_or_else(|| ApiError::not_found("Email not found"))
}

async fn save(state: &AppState, account: Account) -> ApiResult<Account> {
    state.users.update(account).await?.ok_or_else(user_missing)
}

async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Envelope<UserProfile>>)> {
    info!("POST /api/users/auth/register {}", form.email);
    if form.password != form.password_confirmation {
        return Err(ApiError::unprocessable("Passwords do not match"));
    }
    let required = [
        &form.username,
        &form.email,
        &form.phone,
        &form.birthdate,
        &form.job_title,
        &form.role,
        &form.password,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(ApiError::unprocessable("All fields are required"));
    }
    let role: Role = form.role.parse().map_err(|_| {
        ApiError::unprocessable("Invalid role. Use: admin, technician or viewer")
    })?;
    let birthdate = NaiveDate::parse_from_str(form.birthdate.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::unprocessable("Birthdate must be formatted as YYYY-MM-DD"))?;

    let account = Account {
        id: Uuid::new_v4().to_string(),
        username: form.username.trim().to_string(),
        email: normalize_email(&form.email),
        phone: form.phone.trim().to_string(),
        birthdate,
        job_title: form.job_title.trim().to_string(),
        role,
        password_hash: auth::hash_password(&form.password),
        recovery_code: None,
        recovery_code_expiry: None,
    };
    let account = state.users.insert(account).await?;
    info!("Registered user {} as {}", account.id, account.role);
    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok(account.profile()).with_message("User created successfully")),
    ))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginRequest>,
) -> ApiResult<Json<Envelope<LoginPayload>>> {
    info!("POST /api/users/auth/login {}", form.email);
    if form.email.trim().is_empty() || form.password.is_empty() {
        return Err(ApiError::unprocessable("Email and password are required"));
    }
    let account = state
        .users
        .find_by_email(&normalize_email(&form.email))
        .await?
        .ok_or_else(|| ApiError::not_found("User not registered"))?;
    if !auth::verify_password(&form.password, &account.password_hash) {
        warn!("Wrong password for {}", account.email);
        return Err(ApiError::unprocessable("Invalid password"));
    }

    let token = auth::issue_token(&state.config.auth.jwt_secret, &account, state.config.token_ttl())
        .map_err(|err| ApiError::internal("Failed to issue token", err))?;
    Ok(Json(
        Envelope::ok(LoginPayload {
            token,
            user: account.profile(),
        })
        .with_message("Authentication successful"),
    ))
}

async fn send_recovery_code(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Envelope<()>>> {
    info!("GET /api/users/auth/recover/{}", email);
    if email.trim().is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    let mut account = account_by_email(&state, &email).await?;
    let ttl = state.config.recovery_ttl();
    let code = recovery::issue(&mut account, ttl, Utc::now());
    let account = save(&state, account).await?;

    let app_name = &state.config.mail.app_name;
    state
        .mailer
        .send(MailMessage {
            from: state.config.mail.from.clone(),
            to: account.email.clone(),
            subject: format!("{app_name} - Password recovery code"),
            html: recovery::email_html(&account.username, &code, app_name, ttl),
            text: recovery::email_text(&account.username, &code, app_name, ttl),
        })
        .await?;
    Ok(Json(Envelope::message("Recovery code sent to your email")))
}

async fn verify_recovery_code(
    State(state): State<AppState>,
    Path((email, code)): Path<(String, String)>,
) -> ApiResult<Json<Envelope<VerifiedCode>>> {
    info!("GET /api/users/auth/verify-code/{}", email);
    let account = account_by_email(&state, &email).await?;
    recovery::check(&account, &code, Utc::now()).inspect_err(|err| {
        warn!("Recovery code for {} refused: {:?}", account.email, err);
    })?;
    Ok(Json(
        Envelope::ok(VerifiedCode {
            user_id: account.id,
        })
        .with_message("Code verified successfully"),
    ))
}

async fn reset_password(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<PasswordResetRequest>,
) -> ApiResult<Json<Envelope<()>>> {
    info!("PUT /api/users/auth/update-password-recovery {}", form.email);
    let required = [
        &form.email,
        &form.code,
        &form.password,
        &form.password_confirmation,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(ApiError::unprocessable("All fields are required"));
    }
    if form.password != form.password_confirmation {
        return Err(ApiError::unprocessable("Passwords do not match"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::unprocessable(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let mut account = state
        .users
        .find_by_email(&normalize_email(&form.email))
        .await?
        .ok_or_else(user_missing)?;
    recovery::check(&account, &form.code, Utc::now())?;

    account.password_hash = auth::hash_password(&form.password);
    account.clear_recovery_code();
    save(&state, account).await?;
    Ok(Json(Envelope::message("Password updated successfully")))
}

async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<Envelope<Vec<UserProfile>>>> {
    info!("GET /api/users");
    require_admin(&caller).map_err(|err| denied(&caller, "user listing", err))?;
    let profiles: Vec<UserProfile> = state
        .users
        .list()
        .await?
        .iter()
        .map(Account::profile)
        .collect();
    let total = profiles.len();
    Ok(Json(Envelope::ok(profiles).with_total(total)))
}

async fn get_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<UserProfile>>> {
    info!("GET /api/users/{}", id);
    authorize_account(&caller, &id).map_err(|err| denied(&caller, "account read", err))?;
    let account = state.users.get(&id).await?.ok_or_else(user_missing)?;
    Ok(Json(Envelope::ok(account.profile())))
}

async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<UserUpdateRequest>,
) -> ApiResult<Json<Envelope<UserProfile>>> {
    info!("PUT /api/users/{}", id);
    authorize_account(&caller, &id).map_err(|err| denied(&caller, "account update", err))?;
    let mut account = state.users.get(&id).await?.ok_or_else(user_missing)?;

    if let Some(role) = changes.role {
        if role != account.role {
            require_admin(&caller).map_err(|err| denied(&caller, "role change", err))?;
            account.role = role;
        }
    }
    if let Some(username) = changes.username {
        account.username = non_empty(username, "username")?;
    }
    if let Some(email) = changes.email {
        account.email = normalize_email(&non_empty(email, "email")?);
    }
    if let Some(phone) = changes.phone {
        account.phone = non_empty(phone, "phone")?;
    }
    if let Some(job_title) = changes.job_title {
        account.job_title = non_empty(job_title, "jobTitle")?;
    }
    if let Some(birthdate) = changes.birthdate {
        account.birthdate = birthdate;
    }
    if let Some(password) = changes.password {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::unprocessable(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        account.password_hash = auth::hash_password(&password);
    }

    let account = save(&state, account).await?;
    Ok(Json(
        Envelope::ok(account.profile()).with_message("User updated successfully"),
    ))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Envelope<UserProfile>>> {
    info!("DELETE /api/users/{}", id);
    authorize_account(&caller, &id).map_err(|err| denied(&caller, "account deletion", err))?;
    let removed = state.users.delete(&id).await?.ok_or_else(user_missing)?;
    Ok(Json(
        Envelope::ok(removed.profile()).with_message("User deleted successfully"),
    ))
}

fn non_empty(value: String, field: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::unprocessable(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
