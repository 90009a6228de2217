//! Middleware de autenticación
//!
//! Exige `Authorization: Bearer <jwt>` y deja los `JwtClaims` en las
//! extensiones del request para que los handlers sepan quién actúa.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{
    state::AppState,
    utils::{
        errors::{AppError, AppResult},
        jwt::{extract_token_from_header, verify_token, JwtClaims},
    },
};

pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> AppResult<Response> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Token requerido".to_string()))?;

    let token = extract_token_from_header(header)?;
    let claims = verify_token(token, &state.jwt_config)?;
    debug!("🔑 Request autenticado: {}", claims.email);

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Rechaza con 403 a quien no sea administrador
pub fn require_admin(claims: &JwtClaims) -> AppResult<()> {
    if claims.role == crate::models::Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("Solo un administrador puede hacer esto".to_string()))
    }
}
