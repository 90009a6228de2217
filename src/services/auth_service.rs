//! Servicio de autenticación
//!
//! Verifica credenciales contra el repositorio activo y emite el JWT que
//! el resto de la API exige como Bearer.

use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dto::{LoginRequest, LoginResponse},
    repositories::WorkOrderRepository,
    utils::{
        errors::{AppError, AppResult},
        jwt::{generate_token, verify_token, JwtClaims, JwtConfig},
    },
};

pub const INVALID_CREDENTIALS: &str = "Credenciales inválidas";

pub struct AuthService {
    repository: Arc<dyn WorkOrderRepository>,
    jwt_config: JwtConfig,
}

impl AuthService {
    pub fn new(repository: Arc<dyn WorkOrderRepository>, jwt_config: JwtConfig) -> Self {
        Self { repository, jwt_config }
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;

        let Some(user) = self.repository.authenticate(&request.email, &request.password).await? else {
            warn!("🔒 Login rechazado para {}", request.email);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let token = generate_token(&user, &self.jwt_config)?;
        info!("🔐 Login exitoso: {} ({})", user.email, user.role);
        Ok(LoginResponse {
            token,
            usuario: user.into(),
        })
    }

    pub fn claims(&self, token: &str) -> AppResult<JwtClaims> {
        verify_token(token, &self.jwt_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{database::seed, models::Role, repositories::FakeRepository};

    fn service() -> AuthService {
        let repository = Arc::new(FakeRepository::seeded().unwrap());
        AuthService::new(
            repository,
            JwtConfig {
                secret: "secreto".to_string(),
                expiration: 600,
            },
        )
    }

    #[tokio::test]
    async fn test_login_issues_token_with_role() {
        let service = service();
        let response = service
            .login(LoginRequest {
                email: seed::MECHANIC_EMAIL.to_uppercase(),
                password: "mecanico".to_string(),
            })
            .await
            .unwrap();

        let claims = service.claims(&response.token).unwrap();
        assert_eq!(claims.role, Role::Mechanic);
        assert_eq!(claims.email, seed::MECHANIC_EMAIL);
        assert_eq!(response.usuario.rol, Role::Mechanic);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let result = service()
            .login(LoginRequest {
                email: seed::ADMIN_EMAIL.to_string(),
                password: "otra".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
