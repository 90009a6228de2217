use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use tracing::info;
use validator::Validate;

use crate::dto::{NewUserRequest, UserDto, UserQuery};
use crate::middleware::require_admin;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};
use crate::utils::jwt::JwtClaims;

pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/", get(find_user).post(create_user))
        .route("/mecanicos", get(list_mechanics))
}

async fn find_user(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<UserDto>, AppError> {
    let user = state
        .repository
        .find_user_by_email(&query.email)
        .await?
        .ok_or_else(|| not_found_error("Usuario", &query.email))?;
    Ok(Json(user.into()))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<JwtClaims>,
    Json(request): Json<NewUserRequest>,
) -> Result<Json<UserDto>, AppError> {
    require_admin(&claims)?;
    request.validate()?;
    let user = state
        .repository
        .create_user(&request.nombre, &request.email, &request.password, request.rol)
        .await?;
    info!("👤 Usuario {} creado por {}", user.email, claims.email);
    Ok(Json(user.into()))
}

async fn list_mechanics(State(state): State<AppState>) -> Result<Json<Vec<UserDto>>, AppError> {
    let mechanics = state.repository.list_mechanics().await?;
    Ok(Json(mechanics.into_iter().map(UserDto::from).collect()))
}
