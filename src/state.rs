//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::{
    config::environment::EnvironmentConfig,
    repositories::WorkOrderRepository,
    services::AuthService,
    utils::jwt::JwtConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn WorkOrderRepository>,
    pub auth: Arc<AuthService>,
    pub jwt_config: JwtConfig,
    pub config: EnvironmentConfig,
}

impl AppState {
    pub fn new(repository: Arc<dyn WorkOrderRepository>, config: EnvironmentConfig) -> Self {
        let jwt_config = JwtConfig::from(&config);
        Self {
            auth: Arc::new(AuthService::new(repository.clone(), jwt_config.clone())),
            repository,
            jwt_config,
            config,
        }
    }
}
