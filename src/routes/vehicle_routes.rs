use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use validator::Validate;

use crate::dto::{OkResponse, ReassignVehicleRequest, VehicleDto};
use crate::models::Vehicle;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};
use crate::utils::validation::normalize_plate;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/:patente", get(get_vehicle).put(save_vehicle))
        .route("/:patente/cliente", axum::routing::put(reassign_vehicle).delete(detach_vehicle))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(patente): Path<String>,
) -> Result<Json<VehicleDto>, AppError> {
    let vehicle = state
        .repository
        .find_vehicle(&patente)
        .await?
        .ok_or_else(|| not_found_error("Vehículo", &patente))?;
    Ok(Json(vehicle.into()))
}

async fn save_vehicle(
    State(state): State<AppState>,
    Path(patente): Path<String>,
    Json(request): Json<VehicleDto>,
) -> Result<Json<VehicleDto>, AppError> {
    request.validate()?;
    if normalize_plate(&request.patente) != normalize_plate(&patente) {
        return Err(AppError::BadRequest("La patente del cuerpo no coincide con la ruta".to_string()));
    }
    let saved = state.repository.save_vehicle(Vehicle::from(request)).await?;
    Ok(Json(saved.into()))
}

async fn reassign_vehicle(
    State(state): State<AppState>,
    Path(patente): Path<String>,
    Json(request): Json<ReassignVehicleRequest>,
) -> Result<Json<VehicleDto>, AppError> {
    let vehicle = state
        .repository
        .reassign_vehicle(&patente, &request.cliente_rut)
        .await?
        .ok_or_else(|| not_found_error("Vehículo o cliente", &patente))?;
    Ok(Json(vehicle.into()))
}

async fn detach_vehicle(
    State(state): State<AppState>,
    Path(patente): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    let ok = state.repository.detach_vehicle(&patente).await?;
    Ok(Json(OkResponse { ok }))
}
