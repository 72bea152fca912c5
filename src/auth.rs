//! Password hashing and signed session tokens.
//!
//! bcrypt for storage, HS256 JWTs for sessions. The signing secret lives in
//! [`AppConfig`](crate::config::AppConfig) rather than in code. Tokens carry
//! the user id, role, and email and expire 24 hours after issuance.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use bcrypt::{hash, verify, DEFAULT_COST};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Role, User};
use crate::rest::AppState;

const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub role: Role,
    pub email: String,
    pub exp: usize,
}

/// Verified caller identity, inserted as a request extension by
/// [`require_auth`] and read by handlers that stamp audit info.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hashed)
}

pub fn create_token(user: &User, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
        + TOKEN_TTL.as_secs() as usize;

    let claims = Claims {
        sub: user.id,
        role: user.role,
        email: user.email.clone(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(token_data.claims)
}

/// Bearer-token middleware for every protected route. Rejects missing,
/// malformed, expired, and forged tokens with the same 401 shape.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Not authorized".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Not authorized".to_string()))?;

    let claims = validate_token(token, &state.config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Not authorized".to_string()))?;

    req.extensions_mut().insert(Identity {
        id: claims.sub,
        role: claims.role,
        email: claims.email,
    });
    Ok(next.run(req).await)
}

/// Role gate layered after [`require_auth`] on OWNER-only route groups.
pub async fn require_owner(
    Extension(identity): Extension<Identity>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if identity.role != Role::Owner {
        return Err(ApiError::Forbidden("Owner access required".to_string()));
    }
    Ok(next.run(req).await)
}
