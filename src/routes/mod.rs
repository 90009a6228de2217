//! Rutas HTTP
//!
//! Todo cuelga de `/api`. Solo `auth/login` es público; el resto pasa por
//! `require_auth`.

pub mod auth_routes;
pub mod client_routes;
pub mod user_routes;
pub mod vehicle_routes;
pub mod work_order_routes;

use axum::{middleware::from_fn_with_state, routing::get, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{middleware::cors_middleware, middleware::require_auth, state::AppState};

pub fn create_api_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/ots", work_order_routes::create_work_order_router())
        .nest("/clientes", client_routes::create_client_router())
        .nest("/vehiculos", vehicle_routes::create_vehicle_router())
        .nest("/usuarios", user_routes::create_user_router())
        .route_layer(from_fn_with_state(state, require_auth));

    Router::new()
        .nest("/auth", auth_routes::create_auth_router())
        .merge(protected)
}

/// Aplicación completa lista para servir
pub fn create_app(state: AppState) -> Router {
    let cors = cors_middleware(&state.config.cors_origins);
    Router::new()
        .route("/health", get(health))
        .nest("/api", create_api_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "servicio": "gesticar",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
