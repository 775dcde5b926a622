//! `/login` and `/register` with json-server-auth's messages, plus the
//! bearer check used by course mutations.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::{HeaderMap, StatusCode, header};
use axum::{Json, extract::State};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, User};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 4;

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            warn!("password hashing failed: {}", e);
            AppError::InternalServerError
        })
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the caller from the bearer token. Passes everyone through when
/// the server does not require auth.
pub async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, AppError> {
    let token = bearer_token(headers);
    if !state.require_auth {
        return match token {
            Some(token) => Ok(repository::find_session_user(&state.db, token).await?),
            None => Ok(None),
        };
    }
    let token = token.ok_or(AppError::Unauthorized)?;
    repository::find_session_user(&state.db, token)
        .await?
        .map(Some)
        .ok_or(AppError::Unauthorized)
}

async fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let token = Uuid::new_v4().to_string();
    repository::insert_session(&state.db, &token, user.id).await?;
    Ok(token)
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".to_string()));
    }

    let (user, hash) = repository::find_user_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| AppError::BadRequest("Cannot find user".to_string()))?;
    if !verify_password(&req.password, &hash) {
        return Err(AppError::BadRequest("Incorrect password".to_string()));
    }

    let access_token = issue_token(&state, &user).await?;
    info!("user {} logged in", user.email);
    Ok(Json(LoginResponse { access_token, user }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".to_string()));
    }
    if !req.email.contains('@') {
        return Err(AppError::BadRequest("Email format is invalid".to_string()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password is too short".to_string()));
    }
    if repository::find_user_by_email(&state.db, &req.email).await?.is_some() {
        return Err(AppError::BadRequest("Email already exists".to_string()));
    }

    let hash = hash_password(&req.password)?;
    let user = repository::insert_user(&state.db, &req.username, &req.email, &hash).await?;
    info!("registered user {}", user.email);
    Ok((StatusCode::CREATED, Json(user)))
}
