use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use validator::Validate;

use crate::dto::{ClientDto, VehicleDto};
use crate::models::Client;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, validation_error, AppError};
use crate::utils::rut::{is_rut_valid, normalize_rut};

pub fn create_client_router() -> Router<AppState> {
    Router::new()
        .route("/:rut", get(get_client).put(save_client))
        .route("/:rut/vehiculos", get(list_vehicles))
}

async fn get_client(
    State(state): State<AppState>,
    Path(rut): Path<String>,
) -> Result<Json<ClientDto>, AppError> {
    let client = state
        .repository
        .find_client(&rut)
        .await?
        .ok_or_else(|| not_found_error("Cliente", &rut))?;
    Ok(Json(client.into()))
}

async fn save_client(
    State(state): State<AppState>,
    Path(rut): Path<String>,
    Json(request): Json<ClientDto>,
) -> Result<Json<ClientDto>, AppError> {
    request.validate()?;
    if normalize_rut(&request.rut) != normalize_rut(&rut) {
        return Err(AppError::BadRequest("El RUT del cuerpo no coincide con la ruta".to_string()));
    }
    if !is_rut_valid(&request.rut) {
        return Err(validation_error("rut", "Dígito verificador inválido"));
    }
    let saved = state.repository.save_client(Client::from(request)).await?;
    Ok(Json(saved.into()))
}

async fn list_vehicles(
    State(state): State<AppState>,
    Path(rut): Path<String>,
) -> Result<Json<Vec<VehicleDto>>, AppError> {
    let vehicles = state.repository.vehicles_by_client(&rut).await?;
    Ok(Json(vehicles.into_iter().map(VehicleDto::from).collect()))
}
