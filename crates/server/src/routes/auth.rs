use axum::{Extension, Json, extract::State, http::StatusCode, response::Json as ResponseJson};
use db::models::user::{User, UserError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, password};

/// Deliberately loose: one `@`, something on both sides, a dot in the domain.
/// The mail server is the real validator.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Request body must be a JSON object")]
    PayloadNotObject,
    #[error("Email is required")]
    EmailRequired,
    #[error("Invalid email address")]
    EmailInvalid,
    #[error("Password is required")]
    PasswordRequired,
    #[error(
        "Password must be at least 8 characters and include a lowercase letter, an uppercase letter, a digit, and a symbol"
    )]
    PasswordTooWeak,
}

#[derive(Debug, Serialize, TS)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

fn payload_object(payload: &Value) -> Result<&serde_json::Map<String, Value>, CredentialError> {
    payload.as_object().ok_or(CredentialError::PayloadNotObject)
}

/// Trimmed and lowercased so lookups are case-insensitive.
fn read_email(payload: &serde_json::Map<String, Value>) -> Result<String, CredentialError> {
    let email = payload
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(CredentialError::EmailRequired)?;
    Ok(email.to_lowercase())
}

/// Passwords are taken verbatim, whitespace included.
fn read_password(payload: &serde_json::Map<String, Value>) -> Result<String, CredentialError> {
    payload
        .get("password")
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(CredentialError::PasswordRequired)
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<AuthResponse>>), ApiError> {
    let body = payload_object(&payload)?;
    let email = read_email(body)?;
    if !EMAIL_RE.is_match(&email) {
        return Err(CredentialError::EmailInvalid.into());
    }
    let password = read_password(body)?;
    if !password::meets_policy(&password) {
        return Err(CredentialError::PasswordTooWeak.into());
    }

    let db = &state.db().db;
    if User::find_by_email(db, &email).await?.is_some() {
        return Err(UserError::EmailTaken.into());
    }

    let password_hash = password::hash_password(&password)
        .map_err(|err| ApiError::Internal(format!("Failed to hash password: {err}")))?;
    let user = User::create(db, Uuid::new_v4(), &email, &password_hash).await?;
    let token = state.tokens().mint(user.id)?;

    tracing::info!(user_id = %user.id, "Registered new user");
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(AuthResponse { token, user })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<ResponseJson<ApiResponse<AuthResponse>>, ApiError> {
    let body = payload_object(&payload)?;
    let email = read_email(body)?;
    let password = read_password(body)?;

    // Unknown email and wrong password take the same exit so the response
    // never reveals which one it was.
    let Some(credentials) = User::find_credentials_by_email(&state.db().db, &email).await? else {
        return Err(ApiError::InvalidCredentials);
    };

    let verified = password::verify_password(&credentials.password_hash, &password)
        .map_err(|err| ApiError::Internal(format!("Failed to verify password: {err}")))?;
    if !verified {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens().mint(credentials.user.id)?;
    Ok(ResponseJson(ApiResponse::success(AuthResponse {
        token,
        user: credentials.user,
    })))
}

pub async fn me(
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(user)))
}
