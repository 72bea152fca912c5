//! Login and staff management handlers.
//!
//! The owner account is created by the `seed_owner` bin; everything here
//! manages STAFF records and sessions. An OWNER record can never be deleted
//! or password-reset through these endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::{create_token, hash_password, verify_password, Identity};
use crate::error::ApiError;
use crate::models::{Role, User, UserView};
use crate::rest::{parse_id, AppState};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub must_change_password: bool,
}

#[derive(Deserialize)]
pub struct CreateStaffRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn check_password_length(password: &str) -> Result<(), ApiError> {
    if password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

/// `POST /api/auth/login`
///
/// Unknown email and wrong password produce the same response so the two
/// cases cannot be told apart.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = state
        .storage
        .find_user_by_email(&payload.email)?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = create_token(&user, &state.config.jwt_secret)
        .map_err(|e| ApiError::Internal(format!("jwt: {e}")))?;

    info!(email = %user.email, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        token,
        role: user.role,
        must_change_password: user.must_change_password,
    }))
}

/// `POST /api/auth/staff` (OWNER). New staff must change their password on
/// first login.
pub async fn create_staff(
    State(state): State<AppState>,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required".to_string()));
    }
    check_password_length(&payload.password)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email,
        password_hash: hash_password(&payload.password)?,
        role: Role::Staff,
        must_change_password: true,
        created_at: now,
        updated_at: now,
    };
    state.storage.insert_user(&user)?;

    info!(email = %user.email, "Staff account created");
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

/// `PATCH /api/auth/change-password` (any authenticated user).
pub async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.new_password.len() < 6 {
        return Err(ApiError::Validation(
            "New password must be at least 6 characters".to_string(),
        ));
    }

    let mut user = state
        .storage
        .get_user(identity.id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(&payload.old_password, &user.password_hash)? {
        return Err(ApiError::Validation("Wrong password".to_string()));
    }

    user.password_hash = hash_password(&payload.new_password)?;
    user.must_change_password = false;
    user.updated_at = Utc::now();
    state.storage.update_user(&user)?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}

/// `PATCH /api/auth/reset-password/:id` (OWNER). The owner's own record is
/// off limits.
pub async fn reset_staff_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, "user")?;
    check_password_length(&payload.new_password)?;

    let mut user = state
        .storage
        .get_user(id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.role == Role::Owner {
        return Err(ApiError::Forbidden(
            "Cannot reset owner password".to_string(),
        ));
    }

    user.password_hash = hash_password(&payload.new_password)?;
    user.must_change_password = true;
    user.updated_at = Utc::now();
    state.storage.update_user(&user)?;

    info!(email = %user.email, "Staff password reset");
    Ok(Json(MessageResponse {
        message: "Staff password reset".to_string(),
    }))
}

/// `GET /api/auth/users` (OWNER).
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = state.storage.list_users()?;
    Ok(Json(users.iter().map(UserView::from).collect()))
}

/// `GET /api/auth/staff` (OWNER).
pub async fn list_staff(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = state.storage.list_users()?;
    Ok(Json(
        users
            .iter()
            .filter(|u| u.role == Role::Staff)
            .map(UserView::from)
            .collect(),
    ))
}

/// `GET /api/auth/me`
pub async fn current_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserView>, ApiError> {
    let user = state
        .storage
        .get_user(identity.id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(UserView::from(&user)))
}

/// `DELETE /api/auth/staff/:id` (OWNER).
pub async fn delete_staff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id, "user")?;

    let user = state
        .storage
        .get_user(id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.role == Role::Owner {
        return Err(ApiError::Forbidden("Cannot delete owner".to_string()));
    }

    state.storage.delete_user(id)?;
    info!(email = %user.email, "Staff account deleted");
    Ok(Json(MessageResponse {
        message: "Staff deleted successfully".to_string(),
    }))
}
