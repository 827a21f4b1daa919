use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use turf_core::Role;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| AppError::AuthenticationError(e.to_string()))
}

async fn require_role(state: &AppState, role: Role, mut req: Request, next: Next) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::AuthenticationError("missing bearer token".to_string()))?;
    let claims = decode_claims(token, &state.auth.secret)?;

    if claims.role != role {
        return Err(AppError::AuthorizationError(format!("{} access required", role.as_str())));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

// ============================================================================
// Role guards
// ============================================================================

pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&state, Role::Customer, req, next).await
}

pub async fn owner_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&state, Role::Owner, req, next).await
}

/// Identity of an optional caller on public routes. A bad token is ignored,
/// not rejected: the caller simply browses anonymously.
pub fn optional_viewer(token: Option<&str>, secret: &str) -> Option<Uuid> {
    token
        .and_then(|token| decode_claims(token, secret).ok())
        .map(|claims| claims.sub)
}
